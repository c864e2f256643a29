use std::sync::Arc;

use hearth_api::message::ServerEvent;
use hearth_api::models::*;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::errors::SceneError;
use crate::services::{BroadcastService, CommandExecutor};

/// Which devices of a room a scene step addresses.
#[derive(Debug, Clone, Copy)]
enum Target {
    Device(DeviceKind),
    /// Every light-like device in the room
    Lights,
}

/// Which rooms a scene step addresses.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Room(Room),
    All,
    /// The room given with the request, or the fallback
    Requested(Room),
}

struct Step {
    target: Target,
    scope: Scope,
    action: &'static str,
    parameter: Option<(&'static str, i64)>,
}

struct Scene {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    steps: &'static [Step],
}

const fn step(target: Target, scope: Scope, action: &'static str) -> Step {
    Step {
        target,
        scope,
        action,
        parameter: None,
    }
}

const fn step_with(
    target: Target,
    scope: Scope,
    action: &'static str,
    key: &'static str,
    value: i64,
) -> Step {
    Step {
        target,
        scope,
        action,
        parameter: Some((key, value)),
    }
}

use Scope::{All, Requested};
use Target::{Device, Lights};

static SCENES: &[Scene] = &[
    Scene {
        name: "home_mode",
        display_name: "Home Mode",
        description: "Welcome home lighting and comfort settings",
        steps: &[
            step_with(Lights, Requested(Room::LivingRoom), "set_brightness", "brightness", 70),
            step_with(Device(DeviceKind::Ac), Requested(Room::LivingRoom), "set_temperature", "temperature", 25),
        ],
    },
    Scene {
        name: "sleep_mode",
        display_name: "Sleep Mode",
        description: "Optimal settings for sleep",
        steps: &[
            step(Lights, All, "off"),
            step_with(Device(DeviceKind::Ac), Scope::Room(Room::Bedroom), "set_temperature", "temperature", 23),
            step(Device(DeviceKind::Curtain), Scope::Room(Room::Bedroom), "close"),
        ],
    },
    Scene {
        name: "work_mode",
        display_name: "Work Mode",
        description: "Focused work environment",
        steps: &[
            step_with(Device(DeviceKind::CeilingLight), Requested(Room::Study), "set_brightness", "brightness", 90),
            step_with(Device(DeviceKind::DeskLamp), Requested(Room::Study), "set_brightness", "brightness", 80),
            step_with(Device(DeviceKind::Ac), Requested(Room::Study), "set_temperature", "temperature", 24),
            step_with(Device(DeviceKind::Fan), Requested(Room::Study), "set_speed", "speed", 2),
        ],
    },
    Scene {
        name: "movie_mode",
        display_name: "Movie Mode",
        description: "Theater-like experience",
        steps: &[
            step_with(Lights, Requested(Room::LivingRoom), "set_brightness", "brightness", 20),
            step(Device(DeviceKind::Curtain), Requested(Room::LivingRoom), "close"),
            step_with(Device(DeviceKind::Ac), Requested(Room::LivingRoom), "set_temperature", "temperature", 22),
        ],
    },
    Scene {
        name: "cooking_mode",
        display_name: "Cooking Mode",
        description: "Kitchen optimized for cooking",
        steps: &[
            step_with(Lights, Scope::Room(Room::Kitchen), "set_brightness", "brightness", 100),
            step(Device(DeviceKind::ExhaustFan), Scope::Room(Room::Kitchen), "on"),
            step_with(Device(DeviceKind::Fan), Scope::Room(Room::Kitchen), "set_speed", "speed", 3),
        ],
    },
    Scene {
        name: "away_mode",
        display_name: "Away Mode",
        description: "Energy saving and security",
        steps: &[
            step(Lights, All, "off"),
            step(Device(DeviceKind::Ac), All, "off"),
            step(Device(DeviceKind::Curtain), All, "close"),
        ],
    },
];

/// Expands named scenes against the topology and runs them in order.
pub struct SceneService {
    executor: Arc<CommandExecutor>,
    broadcast: Arc<BroadcastService>,
}

impl SceneService {
    pub fn new(executor: Arc<CommandExecutor>, broadcast: Arc<BroadcastService>) -> Self {
        Self { executor, broadcast }
    }

    pub fn catalogue(&self) -> Vec<SceneInfo> {
        SCENES
            .iter()
            .map(|scene| SceneInfo {
                name: scene.name.to_string(),
                display_name: scene.display_name.to_string(),
                description: scene.description.to_string(),
            })
            .collect()
    }

    /// The ordered commands a scene stands for. Steps naming a device that is
    /// absent from a room are skipped.
    pub fn expand(&self, name: &str, location: Option<Room>) -> Result<Vec<ValidatedCommand>, SceneError> {
        let normalized = name.trim().to_lowercase();
        let scene = SCENES
            .iter()
            .find(|scene| scene.name == normalized)
            .ok_or_else(|| SceneError::SceneNotFound(name.to_string()))?;

        let mut commands = Vec::new();
        for step in scene.steps {
            let rooms: Vec<Room> = match step.scope {
                Scope::Room(room) => vec![room],
                Scope::All => Room::ALL.to_vec(),
                Scope::Requested(fallback) => vec![location.unwrap_or(fallback)],
            };

            let parameters: serde_json::Map<String, Value> = step
                .parameter
                .iter()
                .map(|(key, value)| (key.to_string(), json!(value)))
                .collect();

            for room in rooms {
                let kinds: Vec<DeviceKind> = match step.target {
                    Target::Device(kind) => vec![kind],
                    Target::Lights => DeviceKind::ALL.into_iter().filter(DeviceKind::is_light).collect(),
                };

                for kind in kinds.into_iter().filter(|kind| room.has_device(*kind)) {
                    match DeviceCommand::parse(kind, step.action, &parameters) {
                        Ok(command) => commands.push(ValidatedCommand {
                            location: room,
                            command,
                        }),
                        Err(e) => tracing::warn!("Skipping scene step {} {}: {}", kind, step.action, e),
                    }
                }
            }
        }

        Ok(commands)
    }

    pub async fn execute(&self, name: &str, location: Option<String>) -> Result<Vec<ExecutionResult>, SceneError> {
        let room = location.as_deref().and_then(|location| location.parse::<Room>().ok());
        let commands = self.expand(name, room)?;

        tracing::info!("Executing scene {} with {} commands", name, commands.len());

        let mut results = Vec::with_capacity(commands.len());
        for command in &commands {
            results.push(self.executor.execute(command).await);
        }

        self.broadcast
            .publish(ServerEvent::SceneExecuted {
                scene: name.to_string(),
                location,
                results: results.clone(),
                timestamp: OffsetDateTime::now_utc(),
            })
            .await;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::services::device_store::DeviceStore;

    fn service() -> (SceneService, Arc<DeviceStore>) {
        let store = Arc::new(DeviceStore::new());
        let broadcast = Arc::new(BroadcastService::new());
        let executor = Arc::new(CommandExecutor::new(store.clone(), broadcast.clone(), Duration::minutes(5)));
        (SceneService::new(executor, broadcast), store)
    }

    #[test]
    fn test_sleep_mode_expansion_is_fixed() {
        let (scenes, _) = service();

        let first = scenes.expand("sleep_mode", None).unwrap();
        let second = scenes.expand("sleep_mode", None).unwrap();
        assert_eq!(first, second);

        let summary: Vec<(DeviceKind, Room, &str)> = first
            .iter()
            .map(|command| (command.kind(), command.location, command.command.action_name()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (DeviceKind::CeilingLight, Room::LivingRoom, "off"),
                (DeviceKind::CeilingLight, Room::Bedroom, "off"),
                (DeviceKind::DeskLamp, Room::Bedroom, "off"),
                (DeviceKind::CeilingLight, Room::Kitchen, "off"),
                (DeviceKind::CeilingLight, Room::Study, "off"),
                (DeviceKind::DeskLamp, Room::Study, "off"),
                (DeviceKind::CeilingLight, Room::Bathroom, "off"),
                (DeviceKind::Ac, Room::Bedroom, "set_temperature"),
                (DeviceKind::Curtain, Room::Bedroom, "close"),
            ]
        );
    }

    #[test]
    fn test_missing_devices_are_skipped() {
        let (scenes, _) = service();

        let commands = scenes.expand("work_mode", Some(Room::Kitchen)).unwrap();

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].kind(), DeviceKind::CeilingLight);
        assert_eq!(commands[0].location, Room::Kitchen);
    }

    #[test]
    fn test_unknown_scene() {
        let (scenes, _) = service();

        assert_eq!(
            scenes.expand("party_mode", None),
            Err(SceneError::SceneNotFound("party_mode".to_string()))
        );
    }

    #[tokio::test]
    async fn test_same_start_same_end() {
        let (first, first_store) = service();
        let (second, second_store) = service();

        first.execute("sleep_mode", None).await.unwrap();
        second.execute("sleep_mode", None).await.unwrap();

        assert_eq!(first_store.devices().await, second_store.devices().await);
        let curtain = first_store.get(DeviceKind::Curtain, Room::Bedroom).await.unwrap();
        assert!(!curtain.is_active());
    }
}
