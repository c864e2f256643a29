use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use hearth_api::message::{ClientMessage, ServerEvent};
use hearth_api::models::Room;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::services::{BroadcastService, CommandExecutor, DeviceStore};

#[derive(Clone)]
pub struct WsState {
    pub store: Arc<DeviceStore>,
    pub executor: Arc<CommandExecutor>,
    pub broadcast: Arc<BroadcastService>,
}

pub fn ws_router(ws_state: WsState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(ws_state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

fn encode(event: &ServerEvent) -> Option<WsMessage> {
    match serde_json::to_string(event) {
        Ok(text) => Some(WsMessage::Text(text)),
        Err(e) => {
            tracing::warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

async fn handle_websocket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<WsMessage>();

    let (client_id, events) = state.broadcast.subscribe().await;

    tracing::info!("WebSocket client {} connected", client_id);

    let (devices, sensors) = state.store.snapshot().await;
    if let Some(init) = encode(&ServerEvent::Init { devices, sensors }) {
        let _ = client_tx.send(init);
    }

    let client_id_send = client_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = client_rx.recv().await {
            let closing = matches!(msg, WsMessage::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
        tracing::debug!("WebSocket client {} send task ended", client_id_send);
    });

    let forward_tx = client_tx.clone();
    let forward_task = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(events);
        while let Some(event) = events.next().await {
            if let Some(msg) = encode(&event) {
                if forward_tx.send(msg).is_err() {
                    return;
                }
            }
        }
        // Subscription dropped by the server, which only happens on shutdown.
        let _ = forward_tx.send(WsMessage::Close(None));
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(WsMessage::Text(text)) => {
                let reply = handle_client_message(&state, &text).await;
                if let Some(msg) = encode(&reply) {
                    if client_tx.send(msg).is_err() {
                        break;
                    }
                }
            }
            Ok(WsMessage::Close(_)) => {
                tracing::info!("WebSocket client {} closed", client_id);
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    forward_task.abort();
    state.broadcast.unsubscribe(&client_id).await;

    tracing::info!("WebSocket client {} disconnected", client_id);
}

/// Answers one inbound frame. Every frame gets exactly one reply, an error
/// event when the frame cannot be understood.
pub async fn handle_client_message(state: &WsState, text: &str) -> ServerEvent {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => return ServerEvent::error("Invalid JSON format"),
    };

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let message = match serde_json::from_value::<ClientMessage>(value) {
        Ok(message) => message,
        Err(_) => return ServerEvent::error(format!("Unknown command type: {}", kind)),
    };

    tracing::debug!("Received WebSocket command {}", kind);

    match message {
        ClientMessage::Control { commands } => ServerEvent::ControlResults {
            results: state.executor.execute_batch(commands).await,
        },
        ClientMessage::GetSensors {
            location: Some(location),
        } => {
            let reading = match location.parse::<Room>() {
                Ok(room) => state.store.sensor(room).await.map(|data| (room, data)),
                Err(_) => None,
            };

            match reading {
                Some((location, data)) => ServerEvent::SensorData { location, data },
                None => ServerEvent::error(format!("Sensor location not found: {}", location)),
            }
        }
        ClientMessage::GetSensors { location: None } => ServerEvent::AllSensors {
            data: state.store.sensors().await,
        },
        ClientMessage::GetStatus => {
            let (devices, sensors) = state.store.snapshot().await;
            ServerEvent::StatusResponse {
                devices,
                sensors,
                connected_clients: state.broadcast.subscriber_count().await,
            }
        }
        ClientMessage::Ping => ServerEvent::Pong {
            timestamp: OffsetDateTime::now_utc(),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::Duration;

    use super::*;

    fn setup() -> WsState {
        let store = Arc::new(DeviceStore::new());
        let broadcast = Arc::new(BroadcastService::new());
        let executor = Arc::new(CommandExecutor::new(
            store.clone(),
            broadcast.clone(),
            Duration::minutes(5),
        ));

        WsState {
            store,
            executor,
            broadcast,
        }
    }

    #[tokio::test]
    async fn test_rejects_garbage_frames() {
        let state = setup();

        assert_eq!(
            handle_client_message(&state, "{not json").await,
            ServerEvent::error("Invalid JSON format")
        );
        assert_eq!(
            handle_client_message(&state, r#"{"type":"dance"}"#).await,
            ServerEvent::error("Unknown command type: dance")
        );
    }

    #[tokio::test]
    async fn test_control_frame_runs_commands() {
        let state = setup();
        let frame = json!({
            "type": "control",
            "commands": [
                {"device": "ceiling_light", "action": "on", "location": "kitchen"},
                {"device": "curtain", "action": "open", "location": "kitchen"}
            ]
        });

        let reply = handle_client_message(&state, &frame.to_string()).await;
        let ServerEvent::ControlResults { results } = reply else {
            panic!("expected control results");
        };

        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
    }

    #[tokio::test]
    async fn test_sensor_queries() {
        let state = setup();

        let reply = handle_client_message(&state, r#"{"type":"get_sensors","location":"study"}"#).await;
        assert!(matches!(reply, ServerEvent::SensorData { location: Room::Study, .. }));

        let reply = handle_client_message(&state, r#"{"type":"get_sensors","location":"garage"}"#).await;
        assert_eq!(reply, ServerEvent::error("Sensor location not found: garage"));

        let reply = handle_client_message(&state, r#"{"type":"get_sensors"}"#).await;
        let ServerEvent::AllSensors { data } = reply else {
            panic!("expected all sensors");
        };
        assert_eq!(data.len(), Room::ALL.len());
    }

    #[tokio::test]
    async fn test_status_counts_clients() {
        let state = setup();
        let (_id, _rx) = state.broadcast.subscribe().await;

        let reply = handle_client_message(&state, r#"{"type":"get_status"}"#).await;
        assert!(matches!(
            reply,
            ServerEvent::StatusResponse {
                connected_clients: 1,
                ..
            }
        ));
        assert!(matches!(
            handle_client_message(&state, r#"{"type":"ping"}"#).await,
            ServerEvent::Pong { .. }
        ));
    }
}
