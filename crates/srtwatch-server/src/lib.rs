//! HTTP and WebSocket surface over the srtwatch record store.
//!
//! Exposes report ingestion, snapshot queries, removal and rename over
//! plain HTTP, plus a full-snapshot push channel over WebSocket. The
//! staleness watchdog runs alongside the listener and both shut down
//! through one [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod error;
pub mod routes;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use srtwatch_core::{run_watchdog, RecordStore, WatchdogConfig};

pub use error::ServerError;
pub use routes::build_router;

/// Default snapshot size returned by `GET /`.
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 200;

// ── ServerConfig ─────────────────────────────────────────────────────

/// Runtime settings for the monitor server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:5000`.
    pub bind: SocketAddr,

    /// Maximum records returned per snapshot.
    pub snapshot_limit: usize,

    /// Push-channel heartbeat interval.
    pub heartbeat: std::time::Duration,

    /// Staleness watchdog settings.
    pub watchdog: WatchdogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
            heartbeat: std::time::Duration::from_secs(5),
            watchdog: WatchdogConfig::default(),
        }
    }
}

// ── AppState ─────────────────────────────────────────────────────────

/// Shared state for route handlers.
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { store, config })
    }
}

// ── Entry point ──────────────────────────────────────────────────────

/// Run the monitor server until the token is cancelled.
///
/// Binds the listener, spawns the staleness watchdog, and serves the
/// router with graceful shutdown.
pub async fn serve(
    store: Arc<RecordStore>,
    config: ServerConfig,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    let local_addr = listener.local_addr().map_err(ServerError::Io)?;
    info!(addr = %local_addr, "monitor server listening");

    let watchdog_cancel = cancel.child_token();
    let watchdog_store = Arc::clone(&store);
    let watchdog_config = config.watchdog.clone();
    let watchdog = tokio::spawn(async move {
        run_watchdog(watchdog_store, watchdog_config, watchdog_cancel).await;
    });

    let state = AppState::new(store, config);
    let router = build_router(state);

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ServerError::Io)?;

    cancel.cancel();
    let _ = watchdog.await;
    info!("monitor server stopped");
    Ok(())
}
