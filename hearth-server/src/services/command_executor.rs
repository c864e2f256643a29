use std::sync::Arc;

use hearth_api::message::ServerEvent;
use hearth_api::models::*;
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::errors::{DeviceError, SensorError};
use crate::services::device_store::{DeviceStore, DeviceTimer, HomeState};
use crate::services::{BroadcastService, command_validator, environment};

const SENSOR_DEVICE: &str = "sensors";
const SENSOR_ACTION: &str = "data_update";

/// Applies commands to the store and announces the results.
pub struct CommandExecutor {
    store: Arc<DeviceStore>,
    broadcast: Arc<BroadcastService>,
    freshness: Duration,
}

impl CommandExecutor {
    pub fn new(store: Arc<DeviceStore>, broadcast: Arc<BroadcastService>, freshness: Duration) -> Self {
        Self {
            store,
            broadcast,
            freshness,
        }
    }

    pub async fn execute(&self, command: &ValidatedCommand) -> ExecutionResult {
        self.execute_at(command, OffsetDateTime::now_utc()).await
    }

    pub async fn execute_at(&self, command: &ValidatedCommand, now: OffsetDateTime) -> ExecutionResult {
        let kind = command.kind();
        let room = command.location;
        let freshness = self.freshness;

        let outcome = self
            .store
            .update(|home| {
                let current = home.device(kind, room).cloned().ok_or(DeviceError::NotInstalled {
                    device: kind,
                    location: room,
                })?;
                let next = transition(&current, &command.command);
                home.set(kind, room, next.clone())?;
                sync_timer(home, command, &next, now);

                let reading = home.sensor_mut(room);
                let impacted = if reading.is_real_and_fresh(now, freshness) {
                    None
                } else {
                    environment::apply_device_impact(reading, &next, now);
                    Some(reading.clone())
                };

                Ok::<_, DeviceError>((next, impacted))
            })
            .await;

        match outcome {
            Ok((state, impacted)) => {
                tracing::debug!(
                    "Executed {} {} in {}",
                    kind,
                    command.command.action_name(),
                    room
                );

                self.broadcast
                    .publish(ServerEvent::DeviceUpdate {
                        device: kind,
                        location: room,
                        state: state.clone(),
                        timestamp: now,
                    })
                    .await;

                if let Some(reading) = impacted {
                    self.broadcast
                        .publish(ServerEvent::SensorUpdate {
                            location: room,
                            data: reading,
                            timestamp: now,
                        })
                        .await;
                }

                ExecutionResult::Success {
                    device: kind.as_str().to_string(),
                    location: room.as_str().to_string(),
                    action: command.command.action_name().to_string(),
                    parameters: command.command.parameters(),
                    current_state: CurrentState::Device(state),
                }
            }
            Err(e) => ExecutionResult::Error {
                message: e.to_string(),
                device: Some(kind.as_str().to_string()),
                location: Some(room.as_str().to_string()),
                action: Some(command.command.action_name().to_string()),
                command: None,
            },
        }
    }

    /// Run a loosely-typed command as received by the control endpoints.
    pub async fn execute_raw(&self, raw: &RawCommand) -> ExecutionResult {
        self.execute_raw_at(raw, OffsetDateTime::now_utc()).await
    }

    pub async fn execute_raw_at(&self, raw: &RawCommand, now: OffsetDateTime) -> ExecutionResult {
        if raw.device.trim().eq_ignore_ascii_case(SENSOR_DEVICE) {
            return self.report_sensors_at(raw, now).await;
        }

        match command_validator::validate(raw, None) {
            Ok(command) => self.execute_at(&command, now).await,
            Err(e) => {
                tracing::warn!("Rejected command {:?}: {}", raw, e);
                ExecutionResult::rejected(e.to_string(), raw)
            }
        }
    }

    /// Run a batch in submission order. A failing entry never stops the rest.
    pub async fn execute_batch(&self, commands: Vec<Value>) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(commands.len());

        for value in commands {
            let result = match serde_json::from_value::<RawCommand>(value.clone()) {
                Ok(raw) => self.execute_raw(&raw).await,
                Err(e) => {
                    tracing::warn!("Malformed command {}: {}", value, e);
                    ExecutionResult::Error {
                        message: format!("Invalid command format: {e}"),
                        device: None,
                        location: None,
                        action: None,
                        command: Some(value),
                    }
                }
            };
            results.push(result);
        }

        results
    }

    async fn report_sensors_at(&self, raw: &RawCommand, now: OffsetDateTime) -> ExecutionResult {
        let action = raw.action.trim().to_lowercase();
        if action != SENSOR_ACTION {
            return ExecutionResult::rejected(SensorError::UnsupportedAction(action).to_string(), raw);
        }

        let requested = raw.location.clone().unwrap_or_default();
        let Ok(room) = requested.parse::<Room>() else {
            return ExecutionResult::rejected(
                SensorError::UnknownLocation(requested).to_string(),
                raw,
            );
        };

        let parameters = raw.parameters();
        let update = SensorUpdate::from_parameters(&parameters);
        let reading = self
            .store
            .update(|home| {
                let reading = home.sensor_mut(room);
                reading.apply_update(&update, now);
                reading.clone()
            })
            .await;

        tracing::info!(
            "Updated real sensor data for {} from {} ({})",
            room,
            update.source,
            update.device_id
        );

        self.broadcast
            .publish(ServerEvent::SensorUpdate {
                location: room,
                data: reading.clone(),
                timestamp: now,
            })
            .await;

        ExecutionResult::Success {
            device: SENSOR_DEVICE.to_string(),
            location: room.as_str().to_string(),
            action: SENSOR_ACTION.to_string(),
            parameters,
            current_state: CurrentState::Sensor(reading),
        }
    }
}

fn sync_timer(home: &mut HomeState, command: &ValidatedCommand, next: &DeviceState, now: OffsetDateTime) {
    let kind = command.kind();
    let room = command.location;

    match (&command.command, next) {
        (DeviceCommand::ExhaustFan(ExhaustFanAction::SetTimer(minutes)), _) => {
            home.set_timer(
                kind,
                room,
                DeviceTimer {
                    expires_at: now + Duration::minutes(i64::from(*minutes)),
                    minutes: *minutes,
                },
            );
        }
        (_, DeviceState::ExhaustFan(state)) if !state.status.is_on() || state.timer == 0 => {
            home.cancel_timer(kind, room);
        }
        _ => {}
    }
}

/// Next device state for a command. Deterministic in its inputs.
pub fn transition(state: &DeviceState, command: &DeviceCommand) -> DeviceState {
    match (state, command) {
        (DeviceState::Light(light), DeviceCommand::CeilingLight(action) | DeviceCommand::DeskLamp(action)) => {
            let mut light = light.clone();
            match *action {
                LightAction::On => light.status = PowerStatus::On,
                LightAction::Off => light.status = PowerStatus::Off,
                LightAction::Toggle => light.status = light.status.toggled(),
                LightAction::Brighten => {
                    light.brightness = light.brightness.saturating_add(20).min(100);
                    light.status = PowerStatus::On;
                }
                LightAction::Dim => {
                    light.brightness = light.brightness.saturating_sub(20);
                    light.status = PowerStatus::from_on(light.brightness > 0);
                }
                LightAction::SetBrightness(brightness) => {
                    light.brightness = brightness;
                    light.status = PowerStatus::from_on(brightness > 0);
                }
                LightAction::SetColorTemp(color_temp) => {
                    light.color_temp = color_temp;
                    light.status = PowerStatus::On;
                }
            }
            DeviceState::Light(light)
        }
        (DeviceState::Fan(fan), DeviceCommand::Fan(action)) => {
            let mut fan = fan.clone();
            match *action {
                FanAction::On => fan.status = PowerStatus::On,
                FanAction::Off => fan.status = PowerStatus::Off,
                FanAction::Toggle => fan.status = fan.status.toggled(),
                FanAction::SetSpeed(speed) => {
                    fan.speed = speed;
                    fan.status = PowerStatus::On;
                }
                FanAction::ToggleOscillation => fan.oscillation = !fan.oscillation,
            }
            DeviceState::Fan(fan)
        }
        (DeviceState::ExhaustFan(fan), DeviceCommand::ExhaustFan(action)) => {
            let mut fan = fan.clone();
            match *action {
                ExhaustFanAction::On => fan.status = PowerStatus::On,
                ExhaustFanAction::Off => fan.status = PowerStatus::Off,
                ExhaustFanAction::Toggle => fan.status = fan.status.toggled(),
                ExhaustFanAction::SetSpeed(speed) => {
                    fan.speed = speed;
                    fan.status = PowerStatus::On;
                }
                ExhaustFanAction::SetTimer(minutes) => {
                    fan.timer = minutes;
                    fan.status = PowerStatus::On;
                }
                ExhaustFanAction::CancelTimer => fan.timer = 0,
            }
            if !fan.status.is_on() {
                fan.timer = 0;
            }
            DeviceState::ExhaustFan(fan)
        }
        (DeviceState::Ac(ac), DeviceCommand::Ac(action)) => {
            let mut ac = ac.clone();
            match *action {
                AcAction::On => ac.status = PowerStatus::On,
                AcAction::Off => ac.status = PowerStatus::Off,
                AcAction::Toggle => ac.status = ac.status.toggled(),
                AcAction::SetTemperature(temperature) => {
                    ac.temperature = temperature;
                    ac.status = PowerStatus::On;
                }
                AcAction::SetMode(mode) => ac.mode = mode,
                AcAction::SetFanSpeed(fan_speed) => ac.fan_speed = fan_speed,
            }
            DeviceState::Ac(ac)
        }
        (DeviceState::Curtain(curtain), DeviceCommand::Curtain(action)) => {
            let mut curtain = curtain.clone();
            match *action {
                CurtainAction::Open => {
                    curtain.status = CurtainStatus::Open;
                    curtain.position = 100;
                }
                CurtainAction::Close => {
                    curtain.status = CurtainStatus::Closed;
                    curtain.position = 0;
                }
                CurtainAction::SetPosition(position) => {
                    curtain.position = position;
                    curtain.status = if position > 0 {
                        CurtainStatus::Open
                    } else {
                        CurtainStatus::Closed
                    };
                }
            }
            DeviceState::Curtain(curtain)
        }
        (state, command) => {
            tracing::warn!("Command {:?} does not fit state {:?}", command, state);
            state.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn setup() -> (CommandExecutor, Arc<DeviceStore>, Arc<BroadcastService>) {
        let store = Arc::new(DeviceStore::with_state(HomeState::new(datetime!(2024-05-01 9:00 UTC))));
        let broadcast = Arc::new(BroadcastService::new());
        let executor = CommandExecutor::new(store.clone(), broadcast.clone(), Duration::minutes(5));
        (executor, store, broadcast)
    }

    fn light(status: PowerStatus, brightness: u8) -> DeviceState {
        DeviceState::Light(LightState {
            status,
            brightness,
            color_temp: 4000,
        })
    }

    #[test]
    fn test_dim_to_off_in_one_step() {
        let next = transition(
            &light(PowerStatus::On, 10),
            &DeviceCommand::CeilingLight(LightAction::Dim),
        );
        assert_eq!(next, light(PowerStatus::Off, 0));

        let next = transition(
            &light(PowerStatus::Off, 50),
            &DeviceCommand::DeskLamp(LightAction::Dim),
        );
        assert_eq!(next, light(PowerStatus::On, 30));
    }

    #[test]
    fn test_brighten_caps_and_turns_on() {
        let next = transition(
            &light(PowerStatus::Off, 90),
            &DeviceCommand::CeilingLight(LightAction::Brighten),
        );
        assert_eq!(next, light(PowerStatus::On, 100));
    }

    #[test]
    fn test_set_brightness_zero_turns_off() {
        let next = transition(
            &light(PowerStatus::On, 60),
            &DeviceCommand::CeilingLight(LightAction::SetBrightness(0)),
        );
        assert_eq!(next, light(PowerStatus::Off, 0));
    }

    #[test]
    fn test_curtain_position_sets_status() {
        let closed = DeviceState::Curtain(CurtainState {
            status: CurtainStatus::Closed,
            position: 0,
        });

        let next = transition(&closed, &DeviceCommand::Curtain(CurtainAction::SetPosition(40)));
        assert_eq!(
            next,
            DeviceState::Curtain(CurtainState {
                status: CurtainStatus::Open,
                position: 40
            })
        );
    }

    #[test]
    fn test_fan_oscillation_keeps_power() {
        let fan = DeviceState::Fan(FanState {
            status: PowerStatus::Off,
            speed: 1,
            oscillation: false,
        });

        let next = transition(&fan, &DeviceCommand::Fan(FanAction::ToggleOscillation));
        assert_eq!(
            next,
            DeviceState::Fan(FanState {
                status: PowerStatus::Off,
                speed: 1,
                oscillation: true
            })
        );
    }

    #[tokio::test]
    async fn test_idempotent_on() {
        let (executor, store, _) = setup();
        let raw = RawCommand::new("ceiling_light", "on", "bedroom");

        for _ in 0..2 {
            let result = executor.execute_raw(&raw).await;
            assert!(result.is_success());
        }

        let state = store.get(DeviceKind::CeilingLight, Room::Bedroom).await.unwrap();
        assert!(state.is_active());
    }

    #[tokio::test]
    async fn test_broadcasts_device_then_sensor() {
        let (executor, _, broadcast) = setup();
        let (_, mut events) = broadcast.subscribe().await;

        let result = executor
            .execute_raw(&RawCommand::new("fan", "on", "study"))
            .await;
        assert!(result.is_success());

        assert!(matches!(events.recv().await, Some(ServerEvent::DeviceUpdate { .. })));
        assert!(matches!(events.recv().await, Some(ServerEvent::SensorUpdate { .. })));
    }

    #[tokio::test]
    async fn test_fresh_real_data_blocks_impact() {
        let (executor, store, _) = setup();
        let now = datetime!(2024-05-01 12:00 UTC);

        let report = RawCommand::new("sensors", "data_update", "kitchen").with_parameters(json!({
            "light_level": 120, "source": "esp8266", "device_id": "d1"
        }));
        assert!(executor.execute_raw_at(&report, now).await.is_success());

        let light_on = RawCommand::new("ceiling_light", "on", "kitchen");
        executor
            .execute_raw_at(&light_on, now + Duration::minutes(1))
            .await;
        assert_eq!(store.sensor(Room::Kitchen).await.unwrap().light_level, 120);

        executor
            .execute_raw_at(&light_on, now + Duration::minutes(6))
            .await;
        assert_eq!(store.sensor(Room::Kitchen).await.unwrap().light_level, 520);
    }

    #[tokio::test]
    async fn test_huge_reported_light_level_is_capped() {
        let (executor, store, _) = setup();
        let now = datetime!(2024-05-01 12:00 UTC);

        let report = RawCommand::new("sensors", "data_update", "kitchen").with_parameters(json!({
            "light_level": 1e12, "source": "esp8266", "device_id": "d1"
        }));
        assert!(executor.execute_raw_at(&report, now).await.is_success());
        assert_eq!(store.sensor(Room::Kitchen).await.unwrap().light_level, MAX_LIGHT_LEVEL);

        let result = executor
            .execute_raw_at(&RawCommand::new("ceiling_light", "on", "kitchen"), now + Duration::minutes(6))
            .await;
        assert!(result.is_success());
        assert_eq!(store.sensor(Room::Kitchen).await.unwrap().light_level, 1000);
    }

    #[tokio::test]
    async fn test_timer_registration() {
        let (executor, store, _) = setup();
        let now = datetime!(2024-05-01 12:00 UTC);

        let set = RawCommand::new("exhaust_fan", "set_timer", "bathroom")
            .with_parameters(json!({"timer": 15}));
        executor.execute_raw_at(&set, now).await;

        let timers = store.update(|home| home.timers().clone()).await;
        assert_eq!(
            timers.get(&(DeviceKind::ExhaustFan, Room::Bathroom)).map(|timer| timer.expires_at),
            Some(now + Duration::minutes(15))
        );

        executor
            .execute_raw_at(&RawCommand::new("exhaust_fan", "off", "bathroom"), now)
            .await;
        assert!(store.update(|home| home.timers().is_empty()).await);
    }

    #[tokio::test]
    async fn test_unknown_action_is_error_entry() {
        let (executor, _, _) = setup();

        let result = executor
            .execute_raw(&RawCommand::new("ac", "dance", "bedroom"))
            .await;

        match result {
            ExecutionResult::Error { message, device, .. } => {
                assert!(message.contains("dance"));
                assert_eq!(device.as_deref(), Some("ac"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
