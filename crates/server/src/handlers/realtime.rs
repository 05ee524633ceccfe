//! Push channel
//!
//! `GET /ws` upgrades to a WebSocket that receives every `ChatEvent` as a
//! JSON text frame. The channel is one-way; anything the client sends other
//! than a close frame is ignored.

use crate::config::AppState;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chat_common::ChatEvent;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// GET /ws
pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade completes so nothing published after the
    // handshake can be missed.
    let rx = state.subscribe();
    debug!("Push subscribers: {}", state.subscriber_count());
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<ChatEvent>) {
    let connection = NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed);
    info!("New WebSocket connection: {}", connection);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!("WebSocket {} lagged, dropped {} events", connection, missed);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };

            debug!("WebSocket {} <- {}", connection, event.name());
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let WsMessage::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket disconnected: {}", connection);
}
