// ── Normalized snapshots ──
//
// An order-independent projection of device state used exclusively for
// equality testing and diffing, never for display. Entries are restricted
// to the alert-relevant fields and sorted by (identity, port) so two
// snapshots of the same logical state always compare equal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::record::{DeviceRecord, StreamingState};

/// One device in a normalized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    pub identity: String,
    pub local_address: String,
    pub public_address: Option<String>,
    pub streaming: StreamingState,
    pub port: u16,
}

impl NormalizedEntry {
    fn key(&self) -> (&str, u16) {
        (&self.identity, self.port)
    }

    /// Alert-worthy difference: streaming state or public address.
    /// Everything else (local address drift, port metadata) is tracked
    /// silently.
    fn alert_differs(&self, other: &Self) -> bool {
        self.streaming != other.streaming || self.public_address != other.public_address
    }
}

impl From<&DeviceRecord> for NormalizedEntry {
    fn from(r: &DeviceRecord) -> Self {
        Self {
            identity: r.identity.clone(),
            local_address: r.local_address.clone(),
            public_address: r.public_address.clone(),
            streaming: r.streaming,
            port: r.port,
        }
    }
}

/// A comparison-ready set of [`NormalizedEntry`] values, sorted by
/// (identity, port).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedSnapshot {
    entries: Vec<NormalizedEntry>,
}

impl NormalizedSnapshot {
    pub fn new(mut entries: Vec<NormalizedEntry>) -> Self {
        entries.sort_by(|a, b| (&a.identity, a.port).cmp(&(&b.identity, b.port)));
        Self { entries }
    }

    pub fn entries(&self) -> &[NormalizedEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that are new or alert-differ relative to `previous`,
    /// keyed by (identity, port).
    pub fn changed_since(&self, previous: &Self) -> Vec<NormalizedEntry> {
        let prev: HashMap<(&str, u16), &NormalizedEntry> =
            previous.entries.iter().map(|e| (e.key(), e)).collect();

        self.entries
            .iter()
            .filter(|e| prev.get(&e.key()).is_none_or(|p| e.alert_differs(p)))
            .cloned()
            .collect()
    }
}

impl FromIterator<NormalizedEntry> for NormalizedSnapshot {
    fn from_iter<I: IntoIterator<Item = NormalizedEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn snapshots_compare_order_independently() {
        let a = NormalizedSnapshot::new(vec![
            entry("CAM2", 9001, StreamingState::On),
            entry("CAM1", 9000, StreamingState::Off),
        ]);
        let b = NormalizedSnapshot::new(vec![
            entry("CAM1", 9000, StreamingState::Off),
            entry("CAM2", 9001, StreamingState::On),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn streaming_change_is_in_changed_set() {
        let prev = NormalizedSnapshot::new(vec![
            entry("CAM1", 9000, StreamingState::Off),
            entry("CAM2", 9001, StreamingState::On),
        ]);
        let curr = NormalizedSnapshot::new(vec![
            entry("CAM1", 9000, StreamingState::On),
            entry("CAM2", 9001, StreamingState::On),
        ]);

        let changed = curr.changed_since(&prev);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].identity, "CAM1");
    }

    #[test]
    fn public_address_change_is_in_changed_set() {
        let prev = NormalizedSnapshot::new(vec![entry("CAM2", 9001, StreamingState::On)]);
        let mut moved = entry("CAM2", 9001, StreamingState::On);
        moved.public_address = Some("198.51.100.7".into());
        let curr = NormalizedSnapshot::new(vec![moved]);

        let changed = curr.changed_since(&prev);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].public_address.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn local_address_drift_alone_is_not_a_change() {
        let prev = NormalizedSnapshot::new(vec![entry("CAM1", 9000, StreamingState::On)]);
        let mut drifted = entry("CAM1", 9000, StreamingState::On);
        drifted.local_address = "10.0.0.99".into();
        let curr = NormalizedSnapshot::new(vec![drifted]);

        assert!(curr.changed_since(&prev).is_empty());
        // ...but the snapshots themselves are unequal, so last_acted must
        // still be advanced by the reconciler.
        assert_ne!(curr, prev);
    }

    #[test]
    fn new_entry_is_in_changed_set() {
        let prev = NormalizedSnapshot::default();
        let curr = NormalizedSnapshot::new(vec![entry("CAM1", 9000, StreamingState::Off)]);
        assert_eq!(curr.changed_since(&prev).len(), 1);
    }
}
