use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use super::{DeviceKind, DeviceMap, DeviceState, RawCommand, Room, SensorMap, SensorReading};

/// State reported back after a command ran.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurrentState {
    Device(DeviceState),
    Sensor(SensorReading),
}

/// Outcome of a single command.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    Success {
        device: String,
        location: String,
        action: String,
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        parameters: Map<String, Value>,
        current_state: CurrentState,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[cfg_attr(feature = "docs", schema(value_type = Option<Object>))]
        command: Option<Value>,
    },
}

impl ExecutionResult {
    pub fn error(message: impl Into<String>) -> Self {
        ExecutionResult::Error {
            message: message.into(),
            device: None,
            location: None,
            action: None,
            command: None,
        }
    }

    /// Error entry that echoes the offending command.
    pub fn rejected(message: impl Into<String>, command: &RawCommand) -> Self {
        ExecutionResult::Error {
            message: message.into(),
            device: Some(command.device.clone()).filter(|device| !device.is_empty()),
            location: command.location.clone(),
            action: Some(command.action.clone()).filter(|action| !action.is_empty()),
            command: serde_json::to_value(command).ok(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Commands executed in order; malformed entries yield error results
    #[cfg_attr(feature = "docs", schema(value_type = Vec<RawCommand>))]
    pub commands: Vec<Value>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub results: Vec<ExecutionResult>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    /// Scene identifier, e.g. `sleep_mode`
    pub scene_name: String,
    /// Room the scene applies to when the scene is room-relative
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    Success,
    NotFound,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneResponse {
    pub scene: String,
    pub location: Option<String>,
    pub results: Vec<ExecutionResult>,
    pub status: SceneStatus,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenesResponse {
    pub scenes: Vec<SceneInfo>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesResponse {
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub devices: DeviceMap,
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub sensors: SensorMap,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStateResponse {
    pub device: DeviceKind,
    pub location: Room,
    pub state: DeviceState,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorsResponse {
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub sensors: SensorMap,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSensorsResponse {
    pub location: Room,
    pub sensors: SensorReading,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Real,
    Simulated,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfoResponse {
    pub location: Room,
    /// Whether the current reading comes from hardware
    pub data_source: DataSource,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_real_update: Option<OffsetDateTime>,
    /// Seconds elapsed since the last hardware report
    pub seconds_since_real_update: Option<f64>,
    pub source_device: Option<String>,
    pub device_id: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetSimulationResponse {
    pub location: Room,
    pub message: String,
    pub sensors: SensorReading,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTextRequest {
    /// Transcribed user utterance
    pub text: String,
    /// Room the user is in
    #[serde(default)]
    pub location: Option<String>,
    /// Identifier of the client device that captured the utterance
    #[serde(default)]
    pub device_id: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Happy,
    Sad,
    Thinking,
    Neutral,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTextResponse {
    pub input_text: String,
    pub ai_response: String,
    pub expression: Expression,
    pub iot_commands: Vec<RawCommand>,
    pub iot_results: Vec<ExecutionResult>,
    pub location: Room,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// Number of connected real-time clients
    pub connections: usize,
    /// `local` or `api` language model transport
    pub llm_mode: String,
    /// Whether device commands are relayed to a remote service
    pub relay: bool,
}
