//! `srtwatch serve` -- run the monitor server until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use srtwatch_core::{RecordStore, WatchdogConfig};
use srtwatch_server::{serve, ServerConfig};

use crate::cli::ServeArgs;
use crate::context::Context;
use crate::error::CliError;

pub async fn handle(ctx: &Context, args: ServeArgs) -> Result<(), CliError> {
    let section = &ctx.config.server;

    let bind = match args.bind.as_deref() {
        Some(raw) => raw.parse().map_err(|_| CliError::Validation {
            field: "bind".into(),
            reason: format!("not a socket address: {raw}"),
        })?,
        None => section.bind_addr()?,
    };

    let mut watchdog = section.watchdog();
    if let Some(secs) = args.liveness_timeout {
        watchdog.liveness_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.sweep_interval {
        watchdog.sweep_interval = Duration::from_secs(secs);
    }
    validate_watchdog(&watchdog)?;

    let config = ServerConfig {
        bind,
        snapshot_limit: section.snapshot_limit,
        heartbeat: section.heartbeat(),
        watchdog,
    };

    let store = Arc::new(RecordStore::new());
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    serve(store, config, cancel).await.map_err(|e| match e {
        srtwatch_server::ServerError::Bind { addr, source } => CliError::ConnectionFailed {
            url: addr.to_string(),
            source: Box::new(source),
        },
        srtwatch_server::ServerError::Io(e) => CliError::Io(e),
    })
}

fn validate_watchdog(config: &WatchdogConfig) -> Result<(), CliError> {
    if config.sweep_interval.is_zero() {
        return Err(CliError::Validation {
            field: "sweep_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    if config.liveness_timeout.is_zero() {
        return Err(CliError::Validation {
            field: "liveness_timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(())
}
