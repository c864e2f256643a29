use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use hearth_api::models::*;

use crate::errors::ApiError;
use crate::services::CoordinatorService;

#[derive(Clone)]
pub struct ProcessState {
    pub coordinator: Arc<CoordinatorService>,
}

pub fn process_router(process_state: ProcessState) -> Router {
    Router::new()
        .route("/process_text", post(process_text))
        .with_state(process_state)
}

/// Runs one utterance through intent extraction, device control and reply
/// generation. Oracle or relay failures never surface as HTTP errors; they
/// degrade to a fallback reply and error entries.
#[utoipa::path(
    post,
    path = "/process_text",
    tag = "assistant",
    request_body = ProcessTextRequest,
    responses(
        (status = 200, description = "Reply with the commands that were run", body = ProcessTextResponse),
        (status = 400, description = "Malformed request body")
    )
)]
pub async fn process_text(
    State(state): State<ProcessState>,
    body: Result<Json<ProcessTextRequest>, JsonRejection>,
) -> Result<Json<ProcessTextResponse>, ApiError> {
    let Json(body) = body?;

    Ok(Json(state.coordinator.process(body).await))
}
