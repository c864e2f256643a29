use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Completion, Oracle, with_timeout};
use crate::errors::OracleError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: String,
}

/// OpenAI compatible chat completions transport.
pub struct ChatApiOracle {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl ChatApiOracle {
    pub fn new(
        client: reqwest::Client,
        url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.to_string(),
            model: model.to_string(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl Oracle for ChatApiOracle {
    async fn complete(&self, request: Completion<'_>) -> Result<String, OracleError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        with_timeout(self.timeout, async {
            let response = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(OracleError::Status(response.status()));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| OracleError::MalformedBody(e.to_string()))?;

            chat.choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| OracleError::MalformedBody("no choices".to_string()))
        })
        .await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::services::oracle::{serve_stub, stub_client};

    const PATH: &str = "/v1/chat/completions";

    fn oracle(base: &str, timeout: Duration) -> ChatApiOracle {
        ChatApiOracle::new(
            stub_client(),
            &format!("{base}{PATH}"),
            "deepseek-chat",
            "sk-test".to_string(),
            timeout,
        )
    }

    fn request<'a>(system: Option<&'a str>, prompt: &'a str) -> Completion<'a> {
        Completion {
            system,
            prompt,
            temperature: 0.25,
            max_tokens: 128,
        }
    }

    #[tokio::test]
    async fn test_chat_request_and_reply() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let router = Router::new().route(
            PATH,
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    *captured.lock().unwrap() = Some((auth, body));
                    Json(json!({
                        "id": "chatcmpl-1",
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Done."}}]
                    }))
                }
            }),
        );
        let base = serve_stub(router).await;

        let reply = oracle(&base, Duration::from_secs(5))
            .complete(request(Some("You control a home."), "close the curtains"))
            .await
            .unwrap();

        assert_eq!(reply, "Done.");
        let (auth, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], json!("deepseek-chat"));
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "You control a home."},
                {"role": "user", "content": "close the curtains"}
            ])
        );
        assert_eq!(body["temperature"], json!(0.25));
        assert_eq!(body["max_tokens"], json!(128));
        assert_eq!(body["stream"], json!(false));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let router = Router::new().route(PATH, post(|| async { Json(json!({"choices": []})) }));
        let base = serve_stub(router).await;

        match oracle(&base, Duration::from_secs(5)).complete(request(None, "hi")).await {
            Err(OracleError::MalformedBody(reason)) => assert_eq!(reason, "no choices"),
            other => panic!("expected a malformed body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_key_is_status_error() {
        let router = Router::new().route(PATH, post(|| async { StatusCode::UNAUTHORIZED }));
        let base = serve_stub(router).await;

        match oracle(&base, Duration::from_secs(5)).complete(request(None, "hi")).await {
            Err(OracleError::Status(status)) => assert_eq!(status.as_u16(), 401),
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_answer_times_out() {
        let router = Router::new().route(
            PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"choices": []}))
            }),
        );
        let base = serve_stub(router).await;

        assert!(matches!(
            oracle(&base, Duration::from_millis(100)).complete(request(None, "hi")).await,
            Err(OracleError::Timeout(_))
        ));
    }
}
