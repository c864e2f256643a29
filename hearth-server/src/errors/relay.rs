#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("IoT service error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IoT service did not answer within {0} seconds")]
    Timeout(u64),

    #[error("IoT command failed with status {0}")]
    Status(reqwest::StatusCode),
}
