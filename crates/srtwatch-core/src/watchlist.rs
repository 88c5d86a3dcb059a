// ── Observer watchlists ──
//
// An ordered subset of devices that one observer tracks for alerting,
// distinct from the full fleet. Entries are refreshed in place from the
// latest global snapshot: identity match first, falling back to port
// match only for entries that carry no identity. Unmatched entries are
// left alone -- a device that vanished from the snapshot is still worth
// watching for.
//
// Persisted as a plain ordered JSON array so an observer's subset
// survives restarts, scoped per installation rather than per server.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceRecord, NormalizedEntry, NormalizedSnapshot, StreamingState, WireDevice};

/// One watched device, device-shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    #[serde(default)]
    pub identity: Option<String>,
    pub local_address: String,
    #[serde(default)]
    pub public_address: Option<String>,
    pub streaming: StreamingState,
    pub port: u16,
    #[serde(default)]
    pub liveness: bool,
}

impl WatchEntry {
    fn matches(&self, device: &WireDevice) -> bool {
        match self.identity.as_deref() {
            // Identity match has priority when the entry has a name.
            Some(name) if !name.is_empty() => name == device.identity,
            // Nameless entries fall back to port equality.
            _ => self.port == device.port,
        }
    }
}

impl From<&WireDevice> for WatchEntry {
    fn from(d: &WireDevice) -> Self {
        Self {
            identity: Some(d.identity.clone()),
            local_address: d.local_address.clone(),
            public_address: d.public_address.clone(),
            streaming: d.streaming_state,
            port: d.port,
            liveness: d.liveness,
        }
    }
}

impl From<&DeviceRecord> for WatchEntry {
    fn from(r: &DeviceRecord) -> Self {
        Self {
            identity: Some(r.identity.clone()),
            local_address: r.local_address.clone(),
            public_address: r.public_address.clone(),
            streaming: r.streaming,
            port: r.port,
            liveness: r.liveness,
        }
    }
}

impl From<&WatchEntry> for NormalizedEntry {
    fn from(e: &WatchEntry) -> Self {
        Self {
            identity: e
                .identity
                .clone()
                .unwrap_or_else(|| e.local_address.clone()),
            local_address: e.local_address.clone(),
            public_address: e.public_address.clone(),
            streaming: e.streaming,
            port: e.port,
        }
    }
}

/// An observer's ordered watchlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist {
    entries: Vec<WatchEntry>,
}

impl Watchlist {
    pub fn new(entries: Vec<WatchEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Add an entry unless one with the same (local_address, port) is
    /// already present. Returns `true` when added.
    pub fn add(&mut self, entry: WatchEntry) -> bool {
        let dup = self
            .entries
            .iter()
            .any(|e| e.local_address == entry.local_address && e.port == entry.port);
        if !dup {
            self.entries.push(entry);
        }
        !dup
    }

    /// Remove entries by identity; when no identity matches and `key`
    /// parses as a port, remove every entry on that port instead.
    /// Returns the number removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.identity.as_deref() != Some(key));
        let mut removed = before - self.entries.len();

        if removed == 0 {
            if let Ok(port) = key.parse::<u16>() {
                self.entries.retain(|e| e.port != port);
                removed = before - self.entries.len();
            }
        }
        removed
    }

    /// Refresh every entry in place from the latest global snapshot.
    /// Matched entries are replaced wholesale; unmatched entries are kept
    /// and logged.
    pub fn refresh_from(&mut self, snapshot: &[WireDevice]) {
        for entry in &mut self.entries {
            match snapshot.iter().find(|d| entry.matches(d)) {
                Some(device) => {
                    debug!(
                        identity = %device.identity,
                        local = %device.local_address,
                        "watchlist entry refreshed"
                    );
                    *entry = WatchEntry::from(device);
                }
                None => {
                    warn!(
                        identity = entry.identity.as_deref().unwrap_or("-"),
                        port = entry.port,
                        "no snapshot match for watchlist entry"
                    );
                }
            }
        }
    }

    /// Comparison-ready projection of the current watchlist.
    pub fn normalized(&self) -> NormalizedSnapshot {
        self.entries.iter().map(NormalizedEntry::from).collect()
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load the watchlist, or start empty when the file doesn't exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device(identity: &str, port: u16, streaming: StreamingState) -> WireDevice {
        WireDevice {
            identity: identity.into(),
            local_address: "10.0.0.5".into(),
            public_address: Some("203.0.113.9".into()),
            streaming_state: streaming,
            port,
            liveness: true,
        }
    }

    fn named_entry(identity: &str, port: u16) -> WatchEntry {
        WatchEntry {
            identity: Some(identity.into()),
            local_address: "10.0.0.5".into(),
            public_address: None,
            streaming: StreamingState::Unknown,
            port,
            liveness: false,
        }
    }

    #[test]
    fn refresh_matches_by_identity_first() {
        let mut list = Watchlist::new(vec![named_entry("CAM1", 1)]);
        // Port differs -- identity match must still win.
        let snapshot = vec![device("CAM1", 9000, StreamingState::On)];

        list.refresh_from(&snapshot);

        let entry = &list.entries()[0];
        assert_eq!(entry.port, 9000);
        assert_eq!(entry.streaming, StreamingState::On);
        assert_eq!(entry.public_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn nameless_entry_matches_by_port() {
        let mut list = Watchlist::new(vec![WatchEntry {
            identity: None,
            ..named_entry("unused", 9000)
        }]);
        let snapshot = vec![
            device("CAM7", 9000, StreamingState::On),
            device("CAM8", 9001, StreamingState::Off),
        ];

        list.refresh_from(&snapshot);

        let entry = &list.entries()[0];
        assert_eq!(entry.identity.as_deref(), Some("CAM7"));
        assert_eq!(entry.streaming, StreamingState::On);
    }

    #[test]
    fn unmatched_entry_is_kept_unchanged() {
        let original = named_entry("GONE", 9000);
        let mut list = Watchlist::new(vec![original.clone()]);

        list.refresh_from(&[device("CAM1", 9001, StreamingState::On)]);

        assert_eq!(list.entries()[0], original);
    }

    #[test]
    fn add_dedups_by_address_and_port() {
        let mut list = Watchlist::default();
        assert!(list.add(named_entry("CAM1", 9000)));
        assert!(!list.add(named_entry("CAM1-renamed", 9000)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_by_identity_and_by_port() {
        let mut list = Watchlist::new(vec![named_entry("CAM1", 9000), named_entry("CAM2", 9001)]);
        assert_eq!(list.remove("CAM1"), 1);
        assert_eq!(list.remove("9001"), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn numeric_identity_takes_precedence_over_port_removal() {
        let mut list = Watchlist::new(vec![
            named_entry("9001", 9005),
            WatchEntry {
                identity: None,
                ..named_entry("x", 9001)
            },
            WatchEntry {
                identity: None,
                local_address: "10.0.0.6".into(),
                ..named_entry("y", 9001)
            },
        ]);

        // The entry literally named "9001" wins over port matching.
        assert_eq!(list.remove("9001"), 1);
        assert_eq!(list.len(), 2);
        assert!(list.entries().iter().all(|e| e.identity.is_none()));

        // With no identity left to match, the same key falls back to the
        // port and clears both nameless entries.
        assert_eq!(list.remove("9001"), 2);
        assert!(list.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_field_for_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("observer").join("watchlist.json");

        let list = Watchlist::new(vec![
            named_entry("CAM2", 9001),
            named_entry("CAM1", 9000), // order must survive
            WatchEntry {
                identity: None,
                ..named_entry("x", 9002)
            },
        ]);

        list.save(&path).expect("save");
        let loaded = Watchlist::load(&path).expect("load");
        assert_eq!(loaded, list);
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let list =
            Watchlist::load_or_default(&dir.path().join("nope.json")).expect("default");
        assert!(list.is_empty());
    }
}
