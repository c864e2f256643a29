#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Scene not found: {0}")]
    SceneNotFound(String),
}
