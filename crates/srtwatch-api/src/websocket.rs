//! WebSocket push channel with auto-reconnect.
//!
//! Connects to the monitor server's `/ws` endpoint and streams full
//! snapshot frames through a [`tokio::sync::broadcast`] channel. Handles
//! reconnection with linear backoff automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use srtwatch_api::websocket::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://127.0.0.1:5000/ws")?;
//!
//! let handle = PushHandle::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(frame) = rx.recv().await {
//!     println!("{} devices", frame.len());
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use srtwatch_core::WireEntry;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 64;

/// A full snapshot frame as pushed by the server.
pub type SnapshotFrame = Arc<Vec<WireEntry>>;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Linear backoff configuration for WebSocket reconnection.
///
/// The delay grows by `base_delay` per consecutive failure, capped at
/// `max_delay`, and resets to zero after any successful connection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Backoff increment per failed attempt. Default: 1s.
    pub base_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── Connection state ─────────────────────────────────────────────────

/// Observable connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push-channel task.
///
/// Subscribe for snapshot frames, watch the connection state, and call
/// [`shutdown`](Self::shutdown) to tear down the background task.
pub struct PushHandle {
    frame_rx: broadcast::Receiver<SnapshotFrame>,
    state_rx: watch::Receiver<PushState>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the reconnection loop against the server's `/ws` endpoint.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Subscribe to the frame receiver to start
    /// consuming snapshots.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (frame_tx, frame_rx) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(PushState::Connecting);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, frame_tx, state_tx, reconnect, task_cancel).await;
        });

        Self {
            frame_rx,
            state_rx,
            cancel,
        }
    }

    /// Get a new broadcast receiver for snapshot frames.
    ///
    /// Multiple consumers can subscribe concurrently. If a consumer
    /// falls behind, it receives [`broadcast::error::RecvError::Lagged`];
    /// since every frame is a full snapshot, skipping ahead is safe.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotFrame> {
        self.frame_rx.resubscribe()
    }

    /// Watch the connection state (used for pull fallback decisions).
    pub fn state(&self) -> watch::Receiver<PushState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read frames → on drop, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    frame_tx: broadcast::Sender<SnapshotFrame>,
    state_tx: watch::Sender<PushState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        state_tx.send_replace(PushState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &frame_tx, &state_tx, &cancel) => {
                // Any successful connection resets the backoff counter,
                // even if the link later dropped with an error.
                if *state_tx.borrow() == PushState::Connected {
                    attempt = 0;
                }
                state_tx.send_replace(PushState::Disconnected);
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    Ok(()) => {
                        tracing::info!("push channel disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "push channel error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "push channel reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        attempt += 1;
                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    state_tx.send_replace(PushState::Disconnected);
    tracing::debug!("push channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection, read frames until it drops.
async fn connect_and_read(
    url: &Url,
    frame_tx: &broadcast::Sender<SnapshotFrame>,
    state_tx: &watch::Sender<PushState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("push channel connected");
    state_tx.send_replace(PushState::Connected);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(&text, frame_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pings automatically
                        tracing::trace!("push channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "push channel close frame received"
                            );
                        } else {
                            tracing::info!("push channel close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("push channel stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse a text frame as a full snapshot and broadcast it.
///
/// Malformed frames are logged and skipped; the connection stays up.
fn parse_and_broadcast(text: &str, frame_tx: &broadcast::Sender<SnapshotFrame>) {
    let entries: Vec<WireEntry> = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse snapshot frame");
            return;
        }
    };

    // Ignore send errors -- just means no active subscribers right now
    let _ = frame_tx.send(Arc::new(entries));
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Linear backoff: `delay = min(base * attempt, max)`.
///
/// Resets to zero attempts after a successful connection, so a flaky
/// link ramps up gradually instead of jumping straight to the cap.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    config
        .base_delay
        .saturating_mul(attempt)
        .min(config.max_delay)
}

// ── Tests ────────────────────────────────────────────────────────────
