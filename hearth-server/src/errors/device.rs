use axum::http::StatusCode;
use hearth_api::models::{CommandError, DeviceKind, Room};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("Missing required parameters")]
    MissingFields,

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Device does not exist: {device} at {location}")]
    NotInstalled { device: DeviceKind, location: Room },

    #[error("Unsupported action for {device}: {action}")]
    UnsupportedAction { device: DeviceKind, action: String },

    #[error("Action {action} requires parameter {parameter}")]
    MissingParameter {
        action: String,
        parameter: &'static str,
    },
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::MissingFields => StatusCode::BAD_REQUEST,
            DeviceError::UnknownDevice(_) => StatusCode::NOT_FOUND,
            DeviceError::UnknownLocation(_) => StatusCode::NOT_FOUND,
            DeviceError::NotInstalled { .. } => StatusCode::NOT_FOUND,
            DeviceError::UnsupportedAction { .. } => StatusCode::BAD_REQUEST,
            DeviceError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<CommandError> for DeviceError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::UnsupportedAction { device, action } => {
                DeviceError::UnsupportedAction { device, action }
            }
            CommandError::MissingParameter { action, parameter } => {
                DeviceError::MissingParameter { action, parameter }
            }
        }
    }
}
