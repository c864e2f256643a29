use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use config::{Config, File, FileFormat};
use hearth_server::app::{AppContext, create_app};
use hearth_server::configs::Settings;
use hearth_server::errors::OracleError;
use hearth_server::services::oracle::{Completion, Oracle};
use serde_json::Value;
use tower::ServiceExt;

/// Oracle that replays a fixed list of replies in call order and fails once
/// the list runs dry.
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _: Completion<'_>) -> Result<String, OracleError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(OracleError::Timeout(1))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub struct MockApp {
    pub context: AppContext,
    pub router: Router,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with_replies(&[])
    }

    pub fn with_replies(replies: &[&str]) -> Self {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                include_str!("../../configs/default.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let context =
            AppContext::with_oracle(&Arc::new(settings), Arc::new(ScriptedOracle::new(replies)))
                .unwrap();
        let router = create_app(&context);

        Self { context, router }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri).method(method);
        let body = match body {
            Some(body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    serde_json::from_slice(&body).unwrap()
}
