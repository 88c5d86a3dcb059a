//! Push channel: full-snapshot WebSocket fanout.
//!
//! Each connection is its own task holding a store revision watcher.
//! A revision change (or the heartbeat interval) sends the current full
//! snapshot; a failed send drops only that connection. Slow clients see
//! the latest revision rather than every intermediate one, which is
//! safe because every frame carries the whole state.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use tracing::{debug, warn};

use srtwatch_core::WireEntry;

use crate::AppState;

/// GET /ws - upgrade to the push channel.
pub async fn push_channel(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

fn snapshot_frame(state: &AppState) -> Result<String, serde_json::Error> {
    let entries: Vec<WireEntry> = state
        .store
        .get_all(state.config.snapshot_limit)
        .iter()
        .map(|r| WireEntry::from(r.as_ref()))
        .collect();
    serde_json::to_string(&entries)
}

async fn send_snapshot(socket: &mut WebSocket, state: &AppState) -> bool {
    let frame = match snapshot_frame(state) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot frame");
            return false;
        }
    };
    socket.send(Message::Text(frame.into())).await.is_ok()
}

/// One subscriber's lifetime: initial snapshot, then resend on revision
/// change or heartbeat until the client goes away.
async fn handle_connection(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("push subscriber connected");

    let mut revision = state.store.subscribe();
    revision.mark_unchanged();

    let mut heartbeat = tokio::time::interval(state.config.heartbeat);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await; // consume the immediate first tick

    // Initial full snapshot so a fresh subscriber starts in sync
    if !send_snapshot(&mut socket, &state).await {
        debug!("push subscriber dropped during initial snapshot");
        return;
    }

    loop {
        tokio::select! {
            changed = revision.changed() => {
                if changed.is_err() {
                    debug!("store revision channel closed");
                    break;
                }
                if !send_snapshot(&mut socket, &state).await {
                    debug!("push subscriber disconnected");
                    break;
                }
                heartbeat.reset();
            }
            _ = heartbeat.tick() => {
                // Resend even without change so a stalled channel is
                // detectable on the client side
                if !send_snapshot(&mut socket, &state).await {
                    debug!("push subscriber disconnected");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("push subscriber closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Push-only channel; ignore client payloads
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "push subscriber errored");
                        break;
                    }
                }
            }
        }
    }
}
