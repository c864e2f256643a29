use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use hearth_api::models::HealthResponse;
use serde_json::{Value, json};

use crate::configs::Settings;
use crate::services::BroadcastService;

#[derive(Clone)]
pub struct SystemState {
    pub broadcast: Arc<BroadcastService>,
    pub settings: Arc<Settings>,
}

pub fn system_router(system_state: SystemState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(system_state)
}

pub async fn root(State(state): State<SystemState>) -> Json<Value> {
    Json(json!({
        "message": "Hearth home control service is running",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.settings.llm.mode.as_str(),
        "model": state.settings.llm.model,
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<SystemState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        connections: state.broadcast.subscriber_count().await,
        llm_mode: state.settings.llm.mode.as_str().to_string(),
        relay: state.settings.iot.endpoint.is_some(),
    })
}
