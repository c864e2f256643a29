use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::{
    DeviceKind, DeviceMap, DeviceState, ExecutionResult, Room, SensorMap, SensorReading,
};

/// Events pushed to real-time clients.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full snapshot sent once after connecting
    Init {
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        devices: DeviceMap,
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        sensors: SensorMap,
    },
    DeviceUpdate {
        device: DeviceKind,
        location: Room,
        state: DeviceState,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    SensorUpdate {
        location: Room,
        data: SensorReading,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    SceneExecuted {
        scene: String,
        location: Option<String>,
        results: Vec<ExecutionResult>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    /// Reply to a `control` request
    ControlResults { results: Vec<ExecutionResult> },
    /// Reply to `get_sensors` for one room
    SensorData { location: Room, data: SensorReading },
    /// Reply to `get_sensors` without a room
    AllSensors {
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        data: SensorMap,
    },
    StatusResponse {
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        devices: DeviceMap,
        #[cfg_attr(feature = "docs", schema(value_type = Object))]
        sensors: SensorMap,
        connected_clients: usize,
    },
    Pong {
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
