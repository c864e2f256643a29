use std::env;

use config::{Config, ConfigError, Environment, File};
use hearth_api::models::Room;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Home {
    pub default_location: Room,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensors {
    /// Seconds a hardware report shadows the simulator
    pub freshness_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub enabled: bool,
    pub tick_secs: u64,
    pub timer_sweep_secs: u64,
    pub motion_hold_secs: u64,
    /// Offset applied to UTC when picking day or night behaviour
    pub utc_offset_hours: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// Ollama compatible `/api/generate`
    Local,
    /// OpenAI compatible chat completions
    Api,
}

impl LlmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmMode::Local => "local",
            LlmMode::Api => "api",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Llm {
    pub mode: LlmMode,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub extraction_temperature: f32,
    pub response_temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iot {
    /// Base URL of a remote device service; commands run in-process when unset
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub home: Home,
    pub sensors: Sensors,
    pub simulation: Simulation,
    pub llm: Llm,
    pub iot: Iot,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("HEARTH").separator("__"))
            .build()?
            .try_deserialize()?;

        if settings.llm.mode == LlmMode::Api && settings.llm.api_key.is_none() {
            return Err(ConfigError::Message(
                "llm.api_key is required when llm.mode is \"api\"".into(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn test_default_file_deserializes() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                include_str!("../../configs/default.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.home.default_location, Room::LivingRoom);
        assert_eq!(settings.sensors.freshness_secs, 300);
        assert_eq!(settings.llm.mode, LlmMode::Local);
        assert!(settings.iot.endpoint.is_none());
    }

    #[test]
    fn test_unknown_room_is_rejected() {
        let result = Config::builder()
            .add_source(File::from_str(
                include_str!("../../configs/default.toml"),
                FileFormat::Toml,
            ))
            .set_override("home.default_location", "garage")
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize::<Settings>());

        assert!(result.is_err());
    }
}
