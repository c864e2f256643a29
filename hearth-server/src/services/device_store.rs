use std::collections::BTreeMap;

use hearth_api::models::*;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::errors::DeviceError;

/// Countdown that switches a device off once it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTimer {
    pub expires_at: OffsetDateTime,
    pub minutes: u32,
}

/// Everything the store guards. Only reachable through [`DeviceStore::update`].
#[derive(Debug, Clone)]
pub struct HomeState {
    devices: DeviceMap,
    sensors: SensorMap,
    timers: BTreeMap<(DeviceKind, Room), DeviceTimer>,
}

impl HomeState {
    pub fn new(now: OffsetDateTime) -> Self {
        let mut devices = DeviceMap::new();
        for room in Room::ALL {
            for &kind in room.devices() {
                devices
                    .entry(kind)
                    .or_default()
                    .insert(room, initial_device_state(kind, room));
            }
        }

        let sensors = Room::ALL
            .into_iter()
            .map(|room| (room, initial_reading(room, now)))
            .collect();

        Self {
            devices,
            sensors,
            timers: BTreeMap::new(),
        }
    }

    pub fn devices(&self) -> &DeviceMap {
        &self.devices
    }

    pub fn sensors(&self) -> &SensorMap {
        &self.sensors
    }

    pub fn device(&self, kind: DeviceKind, room: Room) -> Option<&DeviceState> {
        self.devices.get(&kind).and_then(|rooms| rooms.get(&room))
    }

    /// Replace the state of an installed device. Devices are never created here.
    pub fn set(
        &mut self,
        kind: DeviceKind,
        room: Room,
        state: DeviceState,
    ) -> Result<(), DeviceError> {
        let slot = self
            .devices
            .get_mut(&kind)
            .and_then(|rooms| rooms.get_mut(&room))
            .ok_or(DeviceError::NotInstalled {
                device: kind,
                location: room,
            })?;

        *slot = state;
        Ok(())
    }

    pub fn sensor(&self, room: Room) -> Option<&SensorReading> {
        self.sensors.get(&room)
    }

    pub fn sensor_mut(&mut self, room: Room) -> &mut SensorReading {
        self.sensors
            .entry(room)
            .or_insert_with(|| initial_reading(room, OffsetDateTime::now_utc()))
    }

    pub fn sensors_mut(&mut self) -> impl Iterator<Item = (&Room, &mut SensorReading)> {
        self.sensors.iter_mut()
    }

    pub fn set_timer(&mut self, kind: DeviceKind, room: Room, timer: DeviceTimer) {
        self.timers.insert((kind, room), timer);
    }

    pub fn cancel_timer(&mut self, kind: DeviceKind, room: Room) -> Option<DeviceTimer> {
        self.timers.remove(&(kind, room))
    }

    pub fn timers(&self) -> &BTreeMap<(DeviceKind, Room), DeviceTimer> {
        &self.timers
    }

    pub fn clear_timers(&mut self) {
        self.timers.clear();
    }
}

/// Single owner of device and sensor state.
///
/// Reads hand out clones. Writes go through [`DeviceStore::update`], which holds
/// the write lock for the whole closure so a transition is never observed half
/// applied.
pub struct DeviceStore {
    state: RwLock<HomeState>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::with_state(HomeState::new(OffsetDateTime::now_utc()))
    }

    pub fn with_state(state: HomeState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn get(&self, kind: DeviceKind, room: Room) -> Result<DeviceState, DeviceError> {
        self.state
            .read()
            .await
            .device(kind, room)
            .cloned()
            .ok_or(DeviceError::NotInstalled {
                device: kind,
                location: room,
            })
    }

    pub async fn sensor(&self, room: Room) -> Option<SensorReading> {
        self.state.read().await.sensor(room).cloned()
    }

    pub async fn devices(&self) -> DeviceMap {
        self.state.read().await.devices.clone()
    }

    pub async fn sensors(&self) -> SensorMap {
        self.state.read().await.sensors.clone()
    }

    pub async fn snapshot(&self) -> (DeviceMap, SensorMap) {
        let state = self.state.read().await;
        (state.devices.clone(), state.sensors.clone())
    }

    pub async fn update<R>(&self, mutate: impl FnOnce(&mut HomeState) -> R) -> R {
        let mut state = self.state.write().await;
        mutate(&mut state)
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn initial_device_state(kind: DeviceKind, room: Room) -> DeviceState {
    let off = PowerStatus::Off;

    match kind {
        DeviceKind::CeilingLight => {
            let (brightness, color_temp) = match room {
                Room::LivingRoom => (100, 4000),
                Room::Bedroom => (80, 3000),
                Room::Kitchen => (80, 5000),
                Room::Study => (90, 4500),
                Room::Bathroom => (70, 4000),
            };
            DeviceState::Light(LightState {
                status: off,
                brightness,
                color_temp,
            })
        }
        DeviceKind::DeskLamp => {
            let (brightness, color_temp) = match room {
                Room::Bedroom => (90, 2700),
                _ => (80, 4000),
            };
            DeviceState::Light(LightState {
                status: off,
                brightness,
                color_temp,
            })
        }
        DeviceKind::Fan => DeviceState::Fan(FanState {
            status: off,
            speed: 1,
            oscillation: false,
        }),
        DeviceKind::ExhaustFan => DeviceState::ExhaustFan(ExhaustFanState {
            status: off,
            speed: 2,
            timer: 0,
        }),
        DeviceKind::Ac => DeviceState::Ac(AcState {
            status: off,
            temperature: if room == Room::LivingRoom { 26 } else { 25 },
            mode: AcMode::Cool,
            fan_speed: AcFanSpeed::Auto,
        }),
        DeviceKind::Curtain => DeviceState::Curtain(CurtainState {
            status: CurtainStatus::Closed,
            position: 0,
        }),
    }
}

fn initial_reading(room: Room, now: OffsetDateTime) -> SensorReading {
    match room {
        Room::LivingRoom => SensorReading::new(23.5, 55.0, 420, 15, 300, now),
        Room::Bedroom => SensorReading::new(22.8, 58.0, 450, 12, 150, now),
        Room::Kitchen => SensorReading::new(24.2, 62.0, 480, 25, 400, now),
        Room::Study => SensorReading::new(23.1, 52.0, 430, 18, 350, now),
        Room::Bathroom => SensorReading::new(24.8, 70.0, 400, 20, 200, now),
    }
}
