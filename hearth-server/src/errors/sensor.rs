use axum::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor location not found: {0}")]
    UnknownLocation(String),

    #[error("Unsupported sensor action: {0}")]
    UnsupportedAction(String),
}

impl SensorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SensorError::UnknownLocation(_) => StatusCode::NOT_FOUND,
            SensorError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
        }
    }
}
