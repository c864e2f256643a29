#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Language model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Language model did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Language model returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Language model returned an unexpected body: {0}")]
    MalformedBody(String),
}
