//! WebSocket endpoint for live-reload clients.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::registry::ClientSession;
use crate::state::AppState;

/// Handle a WebSocket upgrade on the live-reload listener.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drive one established connection.
///
/// The session channel is the only way frames reach this socket. When the
/// session disappears from the registry (shutdown, or removal after a send
/// failure) the channel closes and the connection winds down with a Close
/// frame.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (session, mut frames) = ClientSession::channel();
    let id = session.id();
    state.registry.register(session);
    tracing::debug!(
        client = %id,
        clients = state.registry.len(),
        "live-reload client connected"
    );

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // Session dropped out of the registry.
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            incoming = socket.recv() => {
                // Clients never need to talk; drop the connection on close
                // or error, ignore anything else.
                match incoming {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    state.registry.unregister(id);
    tracing::debug!(client = %id, "live-reload client disconnected");
}
