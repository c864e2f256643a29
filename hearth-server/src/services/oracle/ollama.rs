use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Completion, Oracle, with_timeout};
use crate::errors::OracleError;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` transport.
pub struct OllamaOracle {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaOracle {
    pub fn new(client: reqwest::Client, endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: format!("{}/api/generate", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn complete(&self, request: Completion<'_>) -> Result<String, OracleError> {
        let prompt = match request.system {
            Some(system) => format!("{system}\n\nUser: {}\n\nAssistant:", request.prompt),
            None => request.prompt.to_string(),
        };

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        with_timeout(self.timeout, async {
            let response = self.client.post(&self.url).json(&body).send().await?;
            if !response.status().is_success() {
                return Err(OracleError::Status(response.status()));
            }

            let generated: GenerateResponse = response
                .json()
                .await
                .map_err(|e| OracleError::MalformedBody(e.to_string()))?;

            Ok(generated.response)
        })
        .await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
