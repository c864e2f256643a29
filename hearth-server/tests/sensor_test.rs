use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::mock_app::{MockApp, read_json};

#[tokio::test]
async fn test_hardware_report_marks_reading_real() {
    let app = MockApp::new();

    let response = app
        .request(
            Method::POST,
            "/control",
            Some(json!({
                "commands": [{
                    "device": "sensors",
                    "action": "data_update",
                    "location": "bedroom",
                    "parameters": {"temperature": 21.46, "humidity": 48.04, "source": "esp8266", "device_id": "node-7"}
                }]
            })),
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(body["results"][0]["status"], json!("success"));

    let response = app.request(Method::GET, "/sensors/bedroom", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["sensors"]["temperature"], json!(21.5));
    assert_eq!(body["sensors"]["humidity"], json!(48.0));
    assert_eq!(body["sensors"]["real_data"], json!(true));

    let response = app.request(Method::GET, "/sensors/bedroom/info", None).await;
    let body = read_json(response).await;
    assert_eq!(body["data_source"], json!("real"));
    assert_eq!(body["source_device"], json!("esp8266"));
    assert_eq!(body["device_id"], json!("node-7"));
    assert!(body["seconds_since_real_update"].as_f64().unwrap() < 60.0);
}

#[tokio::test]
async fn test_reset_simulation_clears_provenance() {
    let app = MockApp::new();

    app.request(
        Method::POST,
        "/control",
        Some(json!({
            "commands": [{
                "device": "sensors",
                "action": "data_update",
                "location": "kitchen",
                "parameters": {"temperature": 27.0}
            }]
        })),
    )
    .await;

    let response = app
        .request(Method::POST, "/sensors/kitchen/reset_simulation", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["sensors"]["real_data"], json!(false));
    assert!(body["sensors"]["source"].is_null());

    let response = app.request(Method::GET, "/sensors/kitchen/info", None).await;
    let body = read_json(response).await;
    assert_eq!(body["data_source"], json!("simulated"));
    assert!(body["last_real_update"].is_null());
}

#[tokio::test]
async fn test_unknown_sensor_location() {
    let app = MockApp::new();

    for uri in ["/sensors/garage", "/sensors/garage/info"] {
        let response = app.request(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = app
        .request(Method::POST, "/sensors/garage/reset_simulation", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_json(response).await;
    assert_eq!(body["error"]["message"], json!("Sensor location not found: garage"));
}

#[tokio::test]
async fn test_all_sensors() {
    let app = MockApp::new();

    let response = app.request(Method::GET, "/sensors", None).await;
    let body = read_json(response).await;

    for room in ["living_room", "bedroom", "kitchen", "study", "bathroom"] {
        assert!(body["sensors"][room]["co2"].is_u64());
    }
}
