//! WebSocket event bridge: forwards one session's event stream to a client
//!
//! Each run's events are self-describing (backend identity plus the full
//! record), so clients reconstruct state by merging; nothing here depends on
//! cross-record ordering.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

use super::ServerAppState;

/// WebSocket upgrade handler for `/ws/events/:session_id`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<ServerAppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, session_id))
}

/// Handle a WebSocket connection subscribed to one session
async fn handle_websocket(socket: WebSocket, state: ServerAppState, session_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // Attaching creates the session if needed, so an observer can subscribe
    // before the first start request references the id
    let session = state.registry.create_or_attach(&session_id);
    let mut event_rx = session.subscribe();

    log::info!("WebSocket client attached to session '{}'", session_id);

    // Forward session events to this client
    let send_task = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to serialize event: {}", e);
                }
            }
        }
    });

    // Drain incoming messages until the client goes away
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client left session '{}'", session_id);
                break;
            }
            Ok(Message::Ping(data)) => {
                log::trace!("Received ping: {:?}", data);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("WebSocket error on session '{}': {}", session_id, e);
                break;
            }
        }
    }

    send_task.abort();
    log::debug!("WebSocket connection for session '{}' closed", session_id);
}
