use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use super::ApiQuery;
use crate::notifications::NotificationHub;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/realtime", get(subscribe))
}

#[derive(Debug, Default, Deserialize)]
struct Subscription {
    table: Option<String>,
}

/// Streams change events as JSON text frames, optionally for one table.
async fn subscribe(
    State(state): State<AppState>,
    ApiQuery(subscription): ApiQuery<Subscription>,
    ws: WebSocketUpgrade,
) -> Response {
    let sender = state.hub.sender();
    let table = subscription.table.filter(|t| !t.trim().is_empty());
    tracing::info!(table = ?table, "realtime subscriber connected");
    ws.on_upgrade(move |socket| NotificationHub::handle_socket(socket, sender, table))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_plain_get_is_not_an_upgrade() {
        let (app, _) = app().await;
        let (status, _) = send(&app, Method::GET, "/api/realtime?table=inventory_items", None).await;
        assert!(status.is_client_error(), "got {status}");
    }
}
