use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::mock_app::{MockApp, read_json};

#[tokio::test]
async fn test_control_mixed_batch() {
    let app = MockApp::new();

    let response = app
        .request(
            Method::POST,
            "/control",
            Some(json!({
                "commands": [
                    {"device": "ceiling_light", "action": "on", "location": "living_room"},
                    {"device": "ac", "action": "set_temperature", "location": "bedroom", "parameters": {"temperature": 40}},
                    {"device": "ac", "action": "on", "location": "kitchen"},
                    {"device": "fan", "action": "spin", "location": "study"},
                    "not a command"
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);

    assert_eq!(results[0]["status"], json!("success"));
    assert_eq!(results[0]["current_state"]["status"], json!("on"));

    assert_eq!(results[1]["status"], json!("success"));
    assert_eq!(results[1]["current_state"]["temperature"], json!(32));

    assert_eq!(results[2]["status"], json!("error"));
    assert_eq!(results[2]["message"], json!("Device does not exist: ac at kitchen"));

    assert_eq!(results[3]["status"], json!("error"));
    assert_eq!(results[4]["status"], json!("error"));
}

#[tokio::test]
async fn test_control_rejects_malformed_body() {
    let app = MockApp::new();

    let request = Request::builder()
        .uri("/control")
        .method(Method::POST)
        .header("Content-Type", "application/json")
        .body(Body::from("{\"commands\": ["))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], json!(400));
}

#[tokio::test]
async fn test_control_then_read_back() {
    let app = MockApp::new();

    app.request(
        Method::POST,
        "/control",
        Some(json!({
            "commands": [
                {"device": "desk_lamp", "action": "set_brightness", "location": "study", "parameters": {"brightness": 35}}
            ]
        })),
    )
    .await;

    let response = app.request(Method::GET, "/device/desk_lamp/study", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["device"], json!("desk_lamp"));
    assert_eq!(body["location"], json!("study"));
    assert_eq!(body["state"]["brightness"], json!(35));
    assert_eq!(body["state"]["status"], json!("on"));
}

#[tokio::test]
async fn test_device_lookup_not_found() {
    let app = MockApp::new();

    let response = app.request(Method::GET, "/device/ac/kitchen", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::GET, "/device/toaster/kitchen", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_devices_snapshot() {
    let app = MockApp::new();

    let response = app.request(Method::GET, "/devices", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["devices"]["exhaust_fan"].as_object().unwrap().len(), 2);
    assert!(body["devices"]["ac"].get("kitchen").is_none());
    assert_eq!(body["sensors"].as_object().unwrap().len(), 5);
}
