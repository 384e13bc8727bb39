use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::{SinkExt, stream::SplitSink};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Write half of one client socket.
pub type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Open sockets per user. A user may hold several (tabs, devices).
#[derive(Default)]
pub struct ConnectionRegistry {
    sockets: DashMap<ObjectId, Vec<(Uuid, WsSink)>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: ObjectId, connection_id: Uuid, sink: WsSink) {
        self.sockets
            .entry(user_id)
            .or_default()
            .push((connection_id, sink));
    }

    pub fn unregister(&self, user_id: ObjectId, connection_id: Uuid) {
        if let Some(mut sockets) = self.sockets.get_mut(&user_id) {
            sockets.retain(|(id, _)| *id != connection_id);
        }
        self.sockets.remove_if(&user_id, |_, sockets| sockets.is_empty());
    }

    pub fn open_sockets(&self) -> usize {
        self.sockets.iter().map(|entry| entry.value().len()).sum()
    }

    /// Sends `frame` to every socket of `recipients` and returns how many
    /// took it. A socket that rejects the write is dropped.
    pub async fn deliver(&self, recipients: &[ObjectId], frame: &Value) -> usize {
        let text = frame.to_string();
        let mut reached = 0;

        for user_id in recipients {
            let sockets = self
                .sockets
                .get(user_id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default();
            for (connection_id, sink) in sockets {
                let sent = sink.lock().await.send(Message::text(text.clone())).await;
                match sent {
                    Ok(()) => reached += 1,
                    Err(e) => {
                        warn!(?user_id, %connection_id, %e, "Dropping dead socket");
                        self.unregister(*user_id, connection_id);
                    }
                }
            }
        }

        debug!(recipients = recipients.len(), reached, "Frame delivered");
        reached
    }
}
