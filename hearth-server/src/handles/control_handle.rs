use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_api::models::*;

use crate::errors::{ApiError, DeviceError};
use crate::services::{CommandExecutor, DeviceStore};

#[derive(Clone)]
pub struct ControlState {
    pub executor: Arc<CommandExecutor>,
    pub store: Arc<DeviceStore>,
}

pub fn control_router(control_state: ControlState) -> Router {
    Router::new()
        .route("/control", post(control_devices))
        .route("/devices", get(get_devices))
        .route("/device/:device/:location", get(get_device_state))
        .with_state(control_state)
}

#[utoipa::path(
    post,
    path = "/control",
    tag = "device",
    request_body = ControlRequest,
    responses(
        (status = 200, description = "Commands executed, per-command failures are embedded in the results", body = ControlResponse),
        (status = 400, description = "Malformed request body")
    )
)]
pub async fn control_devices(
    State(state): State<ControlState>,
    body: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    let Json(body) = body?;

    tracing::debug!("Executing {} device commands", body.commands.len());

    let results = state.executor.execute_batch(body.commands).await;

    Ok(Json(ControlResponse { results }))
}

#[utoipa::path(
    get,
    path = "/devices",
    tag = "device",
    responses(
        (status = 200, description = "Snapshot of every device and sensor", body = DevicesResponse)
    )
)]
pub async fn get_devices(State(state): State<ControlState>) -> Json<DevicesResponse> {
    let (devices, sensors) = state.store.snapshot().await;

    Json(DevicesResponse { devices, sensors })
}

#[utoipa::path(
    get,
    path = "/device/{device}/{location}",
    tag = "device",
    params(
        ("device" = String, Path, description = "Device kind, e.g. ceiling_light"),
        ("location" = String, Path, description = "Room, e.g. living_room")
    ),
    responses(
        (status = 200, description = "Current device state", body = DeviceStateResponse),
        (status = 404, description = "Device not installed in that room")
    )
)]
pub async fn get_device_state(
    State(state): State<ControlState>,
    Path((device, location)): Path<(String, String)>,
) -> Result<Json<DeviceStateResponse>, ApiError> {
    let kind = device
        .parse::<DeviceKind>()
        .map_err(|_| DeviceError::UnknownDevice(device))?;
    let room = location
        .parse::<Room>()
        .map_err(|_| DeviceError::UnknownLocation(location))?;

    let device_state = state.store.get(kind, room).await?;

    Ok(Json(DeviceStateResponse {
        device: kind,
        location: room,
        state: device_state,
    }))
}
