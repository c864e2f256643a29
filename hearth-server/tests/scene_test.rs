use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::mock_app::{MockApp, read_json};

#[tokio::test]
async fn test_sleep_mode_scene() {
    let app = MockApp::new();

    app.request(
        Method::POST,
        "/control",
        Some(json!({
            "commands": [
                {"device": "ceiling_light", "action": "on", "location": "kitchen"},
                {"device": "desk_lamp", "action": "on", "location": "study"}
            ]
        })),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/execute_scene",
            Some(json!({"scene_name": "sleep_mode"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], json!("success"));
    assert!(
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|result| result["status"] == json!("success"))
    );

    let response = app.request(Method::GET, "/devices", None).await;
    let body = read_json(response).await;
    assert_eq!(body["devices"]["ceiling_light"]["kitchen"]["status"], json!("off"));
    assert_eq!(body["devices"]["desk_lamp"]["study"]["status"], json!("off"));
    assert_eq!(body["devices"]["ac"]["bedroom"]["temperature"], json!(23));
    assert_eq!(body["devices"]["curtain"]["bedroom"]["status"], json!("closed"));
}

#[tokio::test]
async fn test_unknown_scene() {
    let app = MockApp::new();

    let response = app
        .request(
            Method::POST,
            "/execute_scene",
            Some(json!({"scene_name": "party_mode", "location": "kitchen"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], json!("not_found"));
    assert_eq!(body["location"], json!("kitchen"));
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_scene_catalogue() {
    let app = MockApp::new();

    let response = app.request(Method::GET, "/scenes", None).await;
    let body = read_json(response).await;

    let names: Vec<&str> = body["scenes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|scene| scene["name"].as_str().unwrap())
        .collect();

    for name in ["home_mode", "sleep_mode", "work_mode", "movie_mode", "cooking_mode", "away_mode"] {
        assert!(names.contains(&name), "missing {name}");
    }
}
