use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_api::message::ServerEvent;
use hearth_api::models::*;
use time::{Duration, OffsetDateTime};

use crate::errors::{ApiError, SensorError};
use crate::services::{BroadcastService, DeviceStore};

#[derive(Clone)]
pub struct SensorState {
    pub store: Arc<DeviceStore>,
    pub broadcast: Arc<BroadcastService>,
    pub freshness_secs: u64,
}

pub fn sensor_router(sensor_state: SensorState) -> Router {
    Router::new()
        .route("/sensors", get(get_sensors))
        .route("/sensors/:location", get(get_location_sensors))
        .route("/sensors/:location/info", get(get_sensor_info))
        .route("/sensors/:location/reset_simulation", post(reset_simulation))
        .with_state(sensor_state)
}

fn parse_room(location: String) -> Result<Room, SensorError> {
    location
        .parse::<Room>()
        .map_err(|_| SensorError::UnknownLocation(location))
}

#[utoipa::path(
    get,
    path = "/sensors",
    tag = "sensor",
    responses(
        (status = 200, description = "Readings of every room", body = SensorsResponse)
    )
)]
pub async fn get_sensors(State(state): State<SensorState>) -> Json<SensorsResponse> {
    Json(SensorsResponse {
        sensors: state.store.sensors().await,
    })
}

#[utoipa::path(
    get,
    path = "/sensors/{location}",
    tag = "sensor",
    params(
        ("location" = String, Path, description = "Room, e.g. kitchen")
    ),
    responses(
        (status = 200, description = "Reading of one room", body = LocationSensorsResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_location_sensors(
    State(state): State<SensorState>,
    Path(location): Path<String>,
) -> Result<Json<LocationSensorsResponse>, ApiError> {
    let room = parse_room(location)?;
    let sensors = state
        .store
        .sensor(room)
        .await
        .ok_or_else(|| SensorError::UnknownLocation(room.to_string()))?;

    Ok(Json(LocationSensorsResponse {
        location: room,
        sensors,
    }))
}

#[utoipa::path(
    get,
    path = "/sensors/{location}/info",
    tag = "sensor",
    params(
        ("location" = String, Path, description = "Room, e.g. kitchen")
    ),
    responses(
        (status = 200, description = "Provenance of the room's reading", body = SensorInfoResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_sensor_info(
    State(state): State<SensorState>,
    Path(location): Path<String>,
) -> Result<Json<SensorInfoResponse>, ApiError> {
    let room = parse_room(location)?;
    let reading = state
        .store
        .sensor(room)
        .await
        .ok_or_else(|| SensorError::UnknownLocation(room.to_string()))?;

    let now = OffsetDateTime::now_utc();
    let freshness = Duration::seconds(state.freshness_secs as i64);

    let data_source = if reading.is_real_and_fresh(now, freshness) {
        DataSource::Real
    } else {
        DataSource::Simulated
    };

    Ok(Json(SensorInfoResponse {
        location: room,
        data_source,
        last_real_update: reading.last_real_update,
        seconds_since_real_update: reading
            .last_real_update
            .map(|at| (now - at).as_seconds_f64()),
        source_device: reading.source,
        device_id: reading.device_id,
    }))
}

#[utoipa::path(
    post,
    path = "/sensors/{location}/reset_simulation",
    tag = "sensor",
    params(
        ("location" = String, Path, description = "Room, e.g. kitchen")
    ),
    responses(
        (status = 200, description = "Room handed back to the simulator", body = ResetSimulationResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn reset_simulation(
    State(state): State<SensorState>,
    Path(location): Path<String>,
) -> Result<Json<ResetSimulationResponse>, ApiError> {
    let room = parse_room(location)?;

    let sensors = state
        .store
        .update(|home| {
            let reading = home.sensor_mut(room);
            reading.clear_provenance();
            reading.clone()
        })
        .await;

    tracing::info!("Sensor simulation reset for {}", room);

    state
        .broadcast
        .publish(ServerEvent::SensorUpdate {
            location: room,
            data: sensors.clone(),
            timestamp: OffsetDateTime::now_utc(),
        })
        .await;

    Ok(Json(ResetSimulationResponse {
        location: room,
        message: format!("Sensor simulation reset for {}", room),
        sensors,
    }))
}
