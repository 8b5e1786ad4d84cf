use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::BroadcastStream;

pub mod reconcile;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on one table. Deletes carry only `{"id": ..}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub record: Value,
}

impl ChangeEvent {
    pub fn insert<T: Serialize>(table: &str, record: &T) -> Self {
        Self::new(table, ChangeKind::Insert, record)
    }

    pub fn update<T: Serialize>(table: &str, record: &T) -> Self {
        Self::new(table, ChangeKind::Update, record)
    }

    pub fn delete(table: &str, id: i32) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Delete,
            record: serde_json::json!({ "id": id }),
        }
    }

    /// A record that fails to serialize is still announced with a `null`
    /// record; reconcilers skip events without an id.
    fn new<T: Serialize>(table: &str, kind: ChangeKind, record: &T) -> Self {
        let record = serde_json::to_value(record).unwrap_or_else(|e| {
            tracing::warn!(table, kind = ?kind, error = %e, "change record could not be serialized");
            Value::Null
        });
        Self {
            table: table.to_string(),
            kind,
            record,
        }
    }
}

#[derive(Clone)]
pub struct NotificationHub {
    sender: Sender<ChangeEvent>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn sender(&self) -> Sender<ChangeEvent> {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> BroadcastStream<ChangeEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Fire and forget; having no listeners is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(table = %event.table, kind = ?event.kind, "publishing change");
        let _ = self.sender.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub async fn handle_socket(
        socket: WebSocket,
        sender: Sender<ChangeEvent>,
        table: Option<String>,
    ) {
        let (mut sender_ws, mut receiver) = socket.split();
        let mut receiver_stream = BroadcastStream::new(sender.subscribe());

        let mut send_task = tokio::spawn(async move {
            while let Some(next) = receiver_stream.next().await {
                let event = match next {
                    Ok(event) => event,
                    Err(lagged) => {
                        tracing::warn!(error = %lagged, "realtime subscriber lagged");
                        continue;
                    }
                };
                if table.as_deref().is_some_and(|t| t != event.table) {
                    continue;
                }
                if let Ok(json) = serde_json::to_string(&event) {
                    if sender_ws.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = receiver.next().await {
                if let Message::Close(_) = message {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
