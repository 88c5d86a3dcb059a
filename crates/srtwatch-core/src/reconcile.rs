// ── Reconciliation and alert dedup ──
//
// Decides whether an observed watchlist state actually differs from what
// was last acted upon. The reconciler owns `last_acted`, the normalized
// snapshot of the watchlist at the time of the last decision. The first
// observation seeds it without alerting; afterwards the changed set is
// the (identity, port)-keyed diff over {streaming, public_address}.
//
// `last_acted` advances on every observation, changed or not, so silent
// metadata drift (local address, port bookkeeping) is absorbed without
// ever re-alerting for it. One reconciler belongs to exactly one
// observer task -- serialization of refresh cycles is structural, not a
// flag.

use crate::model::{NormalizedEntry, NormalizedSnapshot};

/// Result of observing one watchlist refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// First observation: stored as the baseline, no alert.
    Seeded,
    /// Nothing alert-worthy changed.
    Unchanged,
    /// These entries changed; emit exactly one alert containing them.
    Changed(Vec<NormalizedEntry>),
}

impl Outcome {
    pub fn changed_entries(&self) -> &[NormalizedEntry] {
        match self {
            Self::Changed(entries) => entries,
            Self::Seeded | Self::Unchanged => &[],
        }
    }
}

/// Per-observer dedup state.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_acted: Option<NormalizedSnapshot>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this reconciler has seeded its baseline yet.
    pub fn is_seeded(&self) -> bool {
        self.last_acted.is_some()
    }

    /// Observe the current watchlist state and decide.
    pub fn observe(&mut self, current: NormalizedSnapshot) -> Outcome {
        let Some(previous) = self.last_acted.take() else {
            self.last_acted = Some(current);
            return Outcome::Seeded;
        };

        let outcome = if current == previous {
            Outcome::Unchanged
        } else {
            let changed = current.changed_since(&previous);
            if changed.is_empty() {
                // Differs only in non-alert fields: advance silently.
                Outcome::Unchanged
            } else {
                Outcome::Changed(changed)
            }
        };

        self.last_acted = Some(current);
        outcome
    }

    /// Full-list broadcast mode: seed the baseline and return every
    /// current entry for one immediate alert. Used only on first
    /// activation of monitoring.
    pub fn broadcast_all(&mut self, current: NormalizedSnapshot) -> Vec<NormalizedEntry> {
        let entries = current.entries().to_vec();
        self.last_acted = Some(current);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamingState;
    use pretty_assertions::assert_eq;

    fn entry(identity: &str, port: u16, streaming: StreamingState) -> NormalizedEntry {
        NormalizedEntry {
            identity: identity.into(),
            local_address: "10.0.0.5".into(),
            public_address: Some("203.0.113.9".into()),
            streaming,
            port,
        }
    }

    fn snapshot(entries: Vec<NormalizedEntry>) -> NormalizedSnapshot {
        NormalizedSnapshot::new(entries)
    }

    #[test]
    fn first_observation_seeds_without_alert() {
        let mut rec = Reconciler::new();
        let outcome = rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::Off)]));
        assert_eq!(outcome, Outcome::Seeded);
        assert!(rec.is_seeded());
    }

    #[test]
    fn unchanged_refresh_emits_nothing() {
        let mut rec = Reconciler::new();
        rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::Off)]));
        let outcome = rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::Off)]));
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn single_changed_entry_alerts_once_with_only_that_entry() {
        let mut rec = Reconciler::new();
        rec.observe(snapshot(vec![
            entry("CAM1", 9000, StreamingState::Off),
            entry("CAM2", 9001, StreamingState::On),
        ]));

        // Only CAM2's public address moves.
        let mut cam2 = entry("CAM2", 9001, StreamingState::On);
        cam2.public_address = Some("198.51.100.7".into());
        let outcome = rec.observe(snapshot(vec![
            entry("CAM1", 9000, StreamingState::Off),
            cam2,
        ]));

        let changed = outcome.changed_entries();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].identity, "CAM2");

        // Same state again: deduped.
        let mut cam2 = entry("CAM2", 9001, StreamingState::On);
        cam2.public_address = Some("198.51.100.7".into());
        let outcome = rec.observe(snapshot(vec![
            entry("CAM1", 9000, StreamingState::Off),
            cam2,
        ]));
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn streaming_flip_is_detected_after_seed() {
        let mut rec = Reconciler::new();
        rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::Off)]));

        let outcome = rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::On)]));
        let changed = outcome.changed_entries();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].streaming, StreamingState::On);
    }

    #[test]
    fn metadata_drift_advances_baseline_silently() {
        let mut rec = Reconciler::new();
        rec.observe(snapshot(vec![entry("CAM1", 9000, StreamingState::On)]));

        let mut drifted = entry("CAM1", 9000, StreamingState::On);
        drifted.local_address = "10.0.0.99".into();
        assert_eq!(rec.observe(snapshot(vec![drifted.clone()])), Outcome::Unchanged);

        // The drift was absorbed: observing it again is still unchanged.
        assert_eq!(rec.observe(snapshot(vec![drifted])), Outcome::Unchanged);
    }

    #[test]
    fn broadcast_all_returns_everything_and_seeds() {
        let mut rec = Reconciler::new();
        let all = rec.broadcast_all(snapshot(vec![
            entry("CAM1", 9000, StreamingState::Off),
            entry("CAM2", 9001, StreamingState::On),
        ]));

        assert_eq!(all.len(), 2);
        assert!(rec.is_seeded());

        // Subsequent identical observation does not re-alert.
        let outcome = rec.observe(snapshot(vec![
            entry("CAM1", 9000, StreamingState::Off),
            entry("CAM2", 9001, StreamingState::On),
        ]));
        assert_eq!(outcome, Outcome::Unchanged);
    }
}
