//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use gate_realtime::{parse_client_message, ServerMessage};

use crate::state::AppState;

/// GET /ws — WebSocket upgrade into the gate hub.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.hub.register();
    let conn_id = handle.id;
    debug!(conn_id = %conn_id, "WebSocket connection established");

    // New connections get a snapshot immediately instead of waiting
    // for the next broadcast.
    if let Ok(snap) = state.occupancy.snapshot(Utc::now()).await {
        state.hub.send_to(
            &handle,
            ServerMessage::Occupancy {
                active_count: snap.active_count,
                capacity: snap.capacity,
                queue_length: snap.queue_length,
            },
        );
    }

    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else {
                continue;
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(msg) = parse_client_message(&text) {
                    state.hub.handle_inbound(&handle, msg).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.hub.unregister(conn_id);
    debug!(conn_id = %conn_id, "WebSocket connection closed");
}
