// ── Staleness watchdog ──
//
// A single periodic task that demotes devices which stopped reporting.
// Staleness is always measured against the wall-clock `last_report`, not
// tick count, so a delayed or missed tick never compounds: the next sweep
// simply sees how stale each record really is. The STALE -> ACTIVE
// transition is not handled here -- the next report re-establishes
// liveness through `upsert`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::records::RecordStore;
use crate::model::DeviceRecord;

/// Watchdog timing policy.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// How long a live device may go without reporting. Default: 60s.
    pub liveness_timeout: Duration,
    /// Sweep interval. Default: 30s.
    pub sweep_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            liveness_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl RecordStore {
    /// Demote every live record whose last report is older than `timeout`
    /// as of `now`. Returns the number of demoted records; notifies
    /// subscribers once iff that number is non-zero.
    pub fn sweep_stale(&self, timeout: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);

        // Candidate pass over a point-in-time read. The demotion itself
        // re-checks staleness under the entry guard, so a report that
        // lands between the two is never clobbered.
        let candidates: Vec<(String, Arc<DeviceRecord>)> = self
            .iter_records()
            .filter(|(_, record)| record.liveness && now - record.last_report > cutoff)
            .collect();

        let mut demoted = 0usize;
        for (identity, seen) in candidates {
            if self.demote_if_stale(&identity, cutoff, now) {
                info!(
                    identity = %identity,
                    endpoint = %seen.endpoint(),
                    last_report = %seen.last_report,
                    "device stale, clearing liveness"
                );
                demoted += 1;
            }
        }

        if demoted > 0 {
            self.notify();
        }
        demoted
    }
}

/// Run the watchdog until `cancel` fires.
pub async fn run_watchdog(
    store: Arc<RecordStore>,
    config: WatchdogConfig,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.sweep_interval);
    // Missed ticks must not burst-fire; staleness is wall-clock based.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let demoted = store.sweep_stale(config.liveness_timeout, Utc::now());
                if demoted > 0 {
                    warn!(demoted, "watchdog demoted stale devices");
                } else {
                    debug!("watchdog sweep: all devices fresh");
                }
            }
        }
    }

    debug!("watchdog exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StatusReport, StreamingState};

    fn report(identity: &str) -> StatusReport {
        StatusReport {
            identity: Some(identity.into()),
            local_address: "10.0.0.5".into(),
            public_address: None,
            streaming_state: StreamingState::On,
            port: 9000,
            liveness: Some(true),
        }
    }

    #[test]
    fn stale_record_is_demoted_with_one_notification() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1")).expect("upsert");
        let rev = store.revision();

        let later = Utc::now() + chrono::Duration::seconds(120);
        let demoted = store.sweep_stale(Duration::from_secs(60), later);

        assert_eq!(demoted, 1);
        assert_eq!(store.revision(), rev + 1);
        let record = store.get("CAM1").expect("record");
        assert!(!record.liveness);
    }

    #[test]
    fn second_sweep_without_new_report_is_silent() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1")).expect("upsert");

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(store.sweep_stale(Duration::from_secs(60), later), 1);
        let rev = store.revision();

        let even_later = later + chrono::Duration::seconds(60);
        assert_eq!(store.sweep_stale(Duration::from_secs(60), even_later), 0);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn fresh_record_is_untouched() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1")).expect("upsert");
        let rev = store.revision();

        assert_eq!(store.sweep_stale(Duration::from_secs(60), Utc::now()), 0);
        assert_eq!(store.revision(), rev);
        assert!(store.get("CAM1").expect("record").liveness);
    }

    #[test]
    fn report_landing_mid_sweep_is_not_clobbered() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1")).expect("upsert");
        let cutoff = chrono::Duration::seconds(60);

        // CAM1 looks stale from a sweep's candidate read taken 120s out,
        // but a report arrives before the demotion runs.
        let mut refreshed = report("CAM1");
        refreshed.streaming_state = StreamingState::Off;
        store.upsert(&refreshed).expect("mid-sweep report");

        assert!(!store.demote_if_stale("CAM1", cutoff, Utc::now()));
        let record = store.get("CAM1").expect("record");
        assert!(record.liveness);
        assert_eq!(record.streaming, StreamingState::Off);

        // With no fresh report the same demotion goes through.
        let later = Utc::now() + chrono::Duration::seconds(120);
        assert!(store.demote_if_stale("CAM1", cutoff, later));
        assert!(!store.get("CAM1").expect("record").liveness);
    }

    #[test]
    fn next_report_reactivates_demoted_record() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1")).expect("upsert");
        let later = Utc::now() + chrono::Duration::seconds(120);
        store.sweep_stale(Duration::from_secs(60), later);

        let (record, kind) = store.upsert(&report("CAM1")).expect("reactivate");
        assert!(record.liveness);
        assert_eq!(kind, crate::detect::ChangeKind::LivenessOnly);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_task_is_cancellable() {
        let store = Arc::new(RecordStore::new());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_watchdog(
            Arc::clone(&store),
            WatchdogConfig::default(),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.expect("join");
    }
}
