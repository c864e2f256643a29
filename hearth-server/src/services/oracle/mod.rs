mod chat_api;
mod ollama;

pub use chat_api::ChatApiOracle;
pub use ollama::OllamaOracle;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::configs::{Llm, LlmMode};
use crate::errors::OracleError;

/// One text-completion request.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Opaque language model: text in, text out.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, request: Completion<'_>) -> Result<String, OracleError>;

    fn model(&self) -> &str;
}

pub fn from_settings(settings: &Llm) -> Result<Arc<dyn Oracle>, OracleError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let oracle: Arc<dyn Oracle> = match settings.mode {
        LlmMode::Local => Arc::new(OllamaOracle::new(
            client,
            &settings.endpoint,
            &settings.model,
            timeout,
        )),
        LlmMode::Api => Arc::new(ChatApiOracle::new(
            client,
            &settings.endpoint,
            &settings.model,
            settings.api_key.clone().unwrap_or_default(),
            timeout,
        )),
    };

    Ok(oracle)
}

/// Bound a request future by `timeout` on top of the client timeout.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    request: impl std::future::Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| OracleError::Timeout(timeout.as_secs()))?
}

/// Serve `router` on an ephemeral loopback port and return its base url.
#[cfg(test)]
pub(crate) async fn serve_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    format!("http://{addr}")
}

#[cfg(test)]
pub(crate) fn stub_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
