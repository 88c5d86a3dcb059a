//! `srtwatch watch` -- run an observer until ctrl-c.
//!
//! One task drives the whole cycle: snapshot frame in, watchlist
//! refresh, reconcile, alert out. The alert send is awaited before the
//! next frame is taken, so at most one alert is in flight per observer.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use srtwatch_api::{
    AlertMessage, AlertSink, FeedConfig, FeedState, ReconnectConfig, SnapshotFeed, SnapshotFrame,
};
use srtwatch_core::{Outcome, Reconciler, Watchlist, WireDevice};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::context::Context;
use crate::error::CliError;

pub async fn handle(ctx: &Context, args: WatchArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    let observer = &ctx.config.observer;

    let webhook: url::Url = match args.webhook.as_deref() {
        Some(raw) => raw.parse().map_err(|_| CliError::Validation {
            field: "webhook".into(),
            reason: format!("invalid URL: {raw}"),
        })?,
        None => observer.webhook_url()?.ok_or(CliError::NoWebhook)?,
    };
    let prefix = args.prefix.unwrap_or_else(|| observer.prefix.clone());

    let watchlist_path = args.watchlist.unwrap_or_else(|| observer.watchlist_path());
    let mut watchlist = Watchlist::load_or_default(&watchlist_path)?;
    if watchlist.is_empty() {
        warn!(path = %watchlist_path.display(), "watchlist is empty, nothing will be alerted");
    }

    let sink = AlertSink::new(webhook, &ctx.transport)
        .map_err(|e| CliError::from_api(e, &ctx.server_url))?;

    let feed_config = FeedConfig {
        server_url: ctx.server_url.clone(),
        poll_interval: observer.poll_interval(),
        reconnect: ReconnectConfig {
            base_delay: Duration::from_secs(observer.base_delay_secs),
            max_delay: Duration::from_secs(observer.max_delay_secs),
            max_retries: None,
        },
        transport: ctx.transport.clone(),
    };

    let cancel = CancellationToken::new();
    let feed = SnapshotFeed::spawn(feed_config, cancel.clone())
        .map_err(|e| CliError::from_api(e, &ctx.server_url))?;
    let mut frames = feed.subscribe();
    let feed_state = feed.state();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    info!(server = %ctx.server_url, watched = watchlist.len(), "observer started");

    let mut reconciler = Reconciler::new();
    let mut full_list_pending = args.full_list;
    // Both channels have failed if nothing arrives for several poll cycles
    let stall_window = observer.poll_interval() * 3;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = tokio::time::timeout(stall_window, frames.recv()) => {
                match frame {
                    Err(_elapsed) => {
                        if *feed_state.borrow() != FeedState::Connected {
                            warn!(
                                window_secs = stall_window.as_secs(),
                                "disconnected: neither push nor pull delivered a snapshot"
                            );
                        }
                    }
                    Ok(Err(RecvError::Lagged(skipped))) => {
                        debug!(skipped, "observer lagged, skipping to latest snapshot");
                    }
                    Ok(Err(RecvError::Closed)) => break,
                    Ok(Ok(frame)) => {
                        reconcile_frame(
                            &frame,
                            &mut watchlist,
                            &mut reconciler,
                            &mut full_list_pending,
                            &sink,
                            &prefix,
                        )
                        .await;
                    }
                }
            }
        }
    }

    feed.shutdown();
    if let Err(e) = watchlist.save(&watchlist_path) {
        warn!(error = %e, path = %watchlist_path.display(), "failed to persist watchlist");
    }
    info!("observer stopped");
    Ok(())
}

/// One reconciliation cycle for an incoming snapshot frame.
async fn reconcile_frame(
    frame: &SnapshotFrame,
    watchlist: &mut Watchlist,
    reconciler: &mut Reconciler,
    full_list_pending: &mut bool,
    sink: &AlertSink,
    prefix: &str,
) {
    let devices: Vec<WireDevice> = frame.iter().map(|e| e.data.clone()).collect();
    watchlist.refresh_from(&devices);
    let current = watchlist.normalized();

    let message = if *full_list_pending {
        let all = reconciler.broadcast_all(current);
        *full_list_pending = false;
        info!(count = all.len(), "sending full status list");
        Some(AlertMessage::full_list(prefix, &all, Utc::now()))
    } else {
        match reconciler.observe(current) {
            Outcome::Changed(entries) => {
                info!(count = entries.len(), "status changed");
                Some(AlertMessage::status_changed(prefix, &entries, Utc::now()))
            }
            Outcome::Seeded => {
                debug!("first snapshot seeded, no alert");
                None
            }
            Outcome::Unchanged => None,
        }
    };

    if let Some(message) = message {
        // Failures are logged, never propagated; the next change retries.
        if let Err(e) = sink.send(&message).await {
            warn!(error = %e, "alert delivery failed");
        }
    }
}
