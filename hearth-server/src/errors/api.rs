use axum::extract::rejection::JsonRejection;

use super::{DeviceError, SensorError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
