//! Unified snapshot feed: WebSocket push with HTTP pull fallback.
//!
//! Observers consume one broadcast stream of snapshot frames and never
//! care where a frame came from. While the push channel is up, frames
//! arrive as the server emits them; while it is down, the feed polls
//! `GET /` on a fixed interval so state keeps flowing during outages.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::MonitorClient;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::websocket::{PushHandle, PushState, ReconnectConfig, SnapshotFrame};

/// Connection state of the feed's push channel.
///
/// Pull fallback keeps frames flowing in every state except
/// [`Connected`](PushState::Connected), so this is informational for
/// consumers rather than a liveness signal.
pub type FeedState = PushState;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

// ── FeedConfig ───────────────────────────────────────────────────────

/// Configuration for a [`SnapshotFeed`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// HTTP base URL of the monitor server, e.g. `http://127.0.0.1:5000/`.
    pub server_url: Url,

    /// Poll interval while the push channel is down. Default: 10s.
    pub poll_interval: Duration,

    /// Reconnect behavior of the push channel.
    pub reconnect: ReconnectConfig,

    /// HTTP transport settings for the pull client.
    pub transport: TransportConfig,
}

impl FeedConfig {
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            poll_interval: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

// ── SnapshotFeed ─────────────────────────────────────────────────────

/// Handle to a running snapshot feed.
pub struct SnapshotFeed {
    snapshot_rx: broadcast::Receiver<SnapshotFrame>,
    state_rx: watch::Receiver<FeedState>,
    cancel: CancellationToken,
}

impl SnapshotFeed {
    /// Spawn the feed: a push channel plus the fallback poll loop.
    ///
    /// The WebSocket URL is derived from the HTTP base (`http` becomes
    /// `ws`, `https` becomes `wss`, path `/ws`).
    pub fn spawn(config: FeedConfig, cancel: CancellationToken) -> Result<Self, Error> {
        let client = MonitorClient::new(config.server_url.clone(), &config.transport)?;
        let ws_url = push_url(&config.server_url)?;

        let push = PushHandle::connect(ws_url, config.reconnect.clone(), cancel.child_token());
        let push_rx = push.subscribe();
        let state_rx = push.state();

        let (snapshot_tx, snapshot_rx) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let task_state = state_rx.clone();
        tokio::spawn(async move {
            feed_loop(
                client,
                push_rx,
                task_state,
                snapshot_tx,
                config.poll_interval,
                task_cancel,
            )
            .await;
        });

        Ok(Self {
            snapshot_rx,
            state_rx,
            cancel,
        })
    }

    /// Get a new receiver for the unified snapshot stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotFrame> {
        self.snapshot_rx.resubscribe()
    }

    /// Watch the push channel's connection state.
    pub fn state(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Signal the background tasks to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Derive the WebSocket endpoint from the HTTP base URL.
fn push_url(base: &Url) -> Result<Url, Error> {
    let mut url = base.clone();
    let scheme = match base.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive ws url from {base}")))?;
    url.set_path("/ws");
    Ok(url)
}

// ── Feed loop ────────────────────────────────────────────────────────

/// Merge push frames with fallback polls into one stream.
///
/// The poll tick fires on its interval regardless, but only issues a
/// request while the push channel is not connected.
async fn feed_loop(
    client: MonitorClient,
    mut push_rx: broadcast::Receiver<SnapshotFrame>,
    push_state: watch::Receiver<FeedState>,
    snapshot_tx: broadcast::Sender<SnapshotFrame>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = push_rx.recv() => {
                match frame {
                    Ok(frame) => {
                        let _ = snapshot_tx.send(frame);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Full-snapshot frames make skipping safe
                        tracing::debug!(skipped, "snapshot feed lagged, skipping frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = tick.tick() => {
                if *push_state.borrow() == FeedState::Connected {
                    continue;
                }
                match client.fetch_snapshot().await {
                    Ok(entries) => {
                        tracing::debug!(count = entries.len(), "fallback poll succeeded");
                        let _ = snapshot_tx.send(Arc::new(entries));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "fallback poll failed");
                    }
                }
            }
        }
    }

    tracing::debug!("snapshot feed loop exiting");
}

// ── Tests ────────────────────────────────────────────────────────────
