pub mod api;
pub mod device;
pub mod oracle;
pub mod relay;
pub mod scene;
pub mod sensor;

pub use api::ApiError;
pub use device::DeviceError;
pub use oracle::OracleError;
pub use relay::RelayError;
pub use scene::SceneError;
pub use sensor::SensorError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::DeviceError(e) => (e.status_code(), e.to_string(), None),
            ApiError::SensorError(e) => (e.status_code(), e.to_string(), None),
            ApiError::InvalidBody(e) => (StatusCode::BAD_REQUEST, e.body_text(), None),
            ApiError::InternalError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use hearth_api::models::{DeviceKind, Room};

    use super::*;

    async fn render(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_device_error_body() {
        let (status, body) = render(
            DeviceError::NotInstalled {
                device: DeviceKind::Ac,
                location: Room::Bathroom,
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], json!(404));
        assert_eq!(body["error"]["message"], json!("Device does not exist: ac at bathroom"));
        assert!(body["error"].get("error_id").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) = render(anyhow::anyhow!("disk on fire").into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], json!("Internal server error"));
        assert!(body["error"]["error_id"].is_string());
    }

    #[test]
    fn test_sensor_error_status() {
        assert_eq!(
            SensorError::UnsupportedAction("calibrate".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
