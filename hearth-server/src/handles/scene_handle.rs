use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_api::models::*;

use crate::errors::{ApiError, SceneError};
use crate::services::SceneService;

#[derive(Clone)]
pub struct SceneState {
    pub scenes: Arc<SceneService>,
}

pub fn scene_router(scene_state: SceneState) -> Router {
    Router::new()
        .route("/execute_scene", post(execute_scene))
        .route("/scenes", get(get_scenes))
        .with_state(scene_state)
}

#[utoipa::path(
    post,
    path = "/execute_scene",
    tag = "scene",
    request_body = SceneRequest,
    responses(
        (status = 200, description = "Scene executed, or reported as not_found", body = SceneResponse),
        (status = 400, description = "Malformed request body")
    )
)]
pub async fn execute_scene(
    State(state): State<SceneState>,
    body: Result<Json<SceneRequest>, JsonRejection>,
) -> Result<Json<SceneResponse>, ApiError> {
    let Json(body) = body?;

    let (results, status) = match state
        .scenes
        .execute(&body.scene_name, body.location.clone())
        .await
    {
        Ok(results) => (results, SceneStatus::Success),
        Err(SceneError::SceneNotFound(name)) => {
            tracing::warn!("Requested unknown scene {}", name);
            (Vec::new(), SceneStatus::NotFound)
        }
    };

    Ok(Json(SceneResponse {
        scene: body.scene_name,
        location: body.location,
        results,
        status,
    }))
}

#[utoipa::path(
    get,
    path = "/scenes",
    tag = "scene",
    responses(
        (status = 200, description = "Available scenes", body = ScenesResponse)
    )
)]
pub async fn get_scenes(State(state): State<SceneState>) -> Json<ScenesResponse> {
    Json(ScenesResponse {
        scenes: state.scenes.catalogue(),
    })
}
