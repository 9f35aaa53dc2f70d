//! `WebSocket` endpoint streaming reading batches.
//!
//! Each connection to `GET /ws` registers a [`ChannelObserver`] with the
//! broadcast hub. The hub immediately queues a catch-up batch, then one
//! batch per tick. A forwarding task writes each message as a JSON text
//! frame. Frames from the client are read and ignored, except that a ping
//! is answered and a close ends the session.
//!
//! The session ends when the client goes away or when the hub drops the
//! observer (its channel closes). Either way the observer is unregistered.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use moisture_core::hub::{ChannelObserver, OBSERVER_CHANNEL_CAPACITY};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming reading batches.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_readings(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (observer, mut rx) = ChannelObserver::channel(OBSERVER_CHANNEL_CAPACITY);
    let observer_id = match state.hub.register(Box::new(observer)).await {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "WebSocket observer rejected at registration");
            return;
        }
    };
    debug!(%observer_id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            // Next batch from the hub.
            message = rx.recv() => {
                let Some(message) = message else {
                    debug!(%observer_id, "Observer dropped by hub, closing socket");
                    break;
                };
                let json = match serde_json::to_string(&*message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize readings batch: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    debug!(%observer_id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Client frames: only close and ping matter.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%observer_id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%observer_id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unregister(observer_id).await;
    let _ = sink.close().await;
}
