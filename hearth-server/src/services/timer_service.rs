use std::sync::Arc;

use hearth_api::message::ServerEvent;
use hearth_api::models::{DeviceKind, DeviceState, PowerStatus, Room, SensorReading};
use time::{Duration, OffsetDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::services::device_store::{DeviceStore, HomeState};
use crate::services::{BroadcastService, environment};

/// Expires device timers and clears simulated motion.
pub struct TimerService {
    store: Arc<DeviceStore>,
    broadcast: Arc<BroadcastService>,
    motion_hold: Duration,
    freshness: Duration,
}

impl TimerService {
    pub fn new(
        store: Arc<DeviceStore>,
        broadcast: Arc<BroadcastService>,
        motion_hold: Duration,
        freshness: Duration,
    ) -> Self {
        Self {
            store,
            broadcast,
            motion_hold,
            freshness,
        }
    }

    pub fn spawn(self: Arc<Self>, period: std::time::Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::info!("Stopping timer sweep");
                        break;
                    },
                    _ = interval.tick() => {
                        self.sweep_at(OffsetDateTime::now_utc()).await;
                    }
                }
            }
        })
    }

    pub async fn sweep_at(&self, now: OffsetDateTime) {
        let motion_hold = self.motion_hold;
        let freshness = self.freshness;

        let (changed, cleared) = self
            .store
            .update(|home| {
                let changed = tick_timers(home, now);

                let cleared: Vec<(Room, SensorReading)> = home
                    .sensors_mut()
                    .filter(|(_, reading)| !reading.is_real_and_fresh(now, freshness))
                    .filter_map(|(room, reading)| {
                        environment::expire_motion(reading, motion_hold, now)
                            .then(|| (*room, reading.clone()))
                    })
                    .collect();

                (changed, cleared)
            })
            .await;

        for (kind, room, state) in changed {
            if !state.is_active() {
                tracing::info!("Timer expired: {} at {} turned off", kind, room);
            }
            self.broadcast
                .publish(ServerEvent::DeviceUpdate {
                    device: kind,
                    location: room,
                    state,
                    timestamp: now,
                })
                .await;
        }

        for (room, reading) in cleared {
            self.broadcast
                .publish(ServerEvent::SensorUpdate {
                    location: room,
                    data: reading,
                    timestamp: now,
                })
                .await;
        }
    }
}

/// Count every running timer down and switch off the expired ones. Returns the
/// devices whose visible state changed.
fn tick_timers(home: &mut HomeState, now: OffsetDateTime) -> Vec<(DeviceKind, Room, DeviceState)> {
    let timers: Vec<_> = home.timers().iter().map(|(key, timer)| (*key, *timer)).collect();
    let mut changed = Vec::new();

    for ((kind, room), timer) in timers {
        let Some(DeviceState::ExhaustFan(mut fan)) = home.device(kind, room).cloned() else {
            home.cancel_timer(kind, room);
            continue;
        };
        let before = fan.clone();

        if now >= timer.expires_at {
            home.cancel_timer(kind, room);
            fan.status = PowerStatus::Off;
            fan.timer = 0;
        } else {
            let seconds_left = (timer.expires_at - now).whole_seconds();
            fan.timer = ((seconds_left + 59) / 60) as u32;
        }

        if fan == before {
            continue;
        }

        let state = DeviceState::ExhaustFan(fan);
        if home.set(kind, room, state.clone()).is_ok() {
            changed.push((kind, room, state));
        }
    }

    changed
}
