use std::collections::HashMap;

use hearth_api::message::ServerEvent;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Registry of real-time subscribers, one outbound queue each.
pub struct BroadcastService {
    subscribers: RwLock<HashMap<String, mpsc::UnboundedSender<ServerEvent>>>,
}

impl BroadcastService {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self) -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers.write().await.insert(id.clone(), tx);
        (id, rx)
    }

    pub async fn unsubscribe(&self, subscription_id: &str) {
        self.subscribers.write().await.remove(subscription_id);
    }

    /// Best-effort fan-out. Subscribers whose queue is gone are dropped and
    /// never affect delivery to the rest.
    pub async fn publish(&self, event: ServerEvent) {
        let snapshot: Vec<(String, mpsc::UnboundedSender<ServerEvent>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, sender)| (id.clone(), sender.clone()))
            .collect();

        let mut failed = Vec::new();
        for (id, sender) in snapshot {
            if sender.send(event.clone()).is_err() {
                tracing::warn!("Failed to send event to subscriber: {}", id);
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in failed {
                subscribers.remove(&id);
            }
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Drop every queue so connection tasks see the end of their stream.
    pub async fn close_all(&self) {
        let mut subscribers = self.subscribers.write().await;
        tracing::info!("Closing {} real-time subscribers", subscribers.len());
        subscribers.clear();
    }
}

impl Default for BroadcastService {
    fn default() -> Self {
        Self::new()
    }
}
