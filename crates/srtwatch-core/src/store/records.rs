// ── Central device record store ──
//
// Thread-safe storage for all device records, keyed by identity.
// Per-identity mutation is linearized through the `DashMap` entry guard;
// reports for different identities proceed fully concurrently. Mutations
// bump a revision counter broadcast via a `watch` channel -- subscribers
// (the WebSocket fanout, primarily) react to the revision and pull the
// full snapshot themselves, so a slow subscriber coalesces intermediate
// states instead of queueing them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::detect::{change_event, detect, ChangeKind};
use crate::error::CoreError;
use crate::model::{DeviceRecord, StatusReport};

/// Reactive store of [`DeviceRecord`]s.
pub struct RecordStore {
    records: DashMap<String, Arc<DeviceRecord>>,

    /// Revision counter, bumped on every meaningful mutation.
    revision: watch::Sender<u64>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            records: DashMap::new(),
            revision,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Apply a status report: create or replace the record for its
    /// identity. Returns the stored record and the change classification.
    ///
    /// The entry guard serializes concurrent reports for the same
    /// identity; no lock is held beyond the in-memory swap. `NoChange`
    /// still advances `last_report` but neither touches `last_mutation`
    /// nor notifies subscribers.
    pub fn upsert(
        &self,
        report: &StatusReport,
    ) -> Result<(Arc<DeviceRecord>, ChangeKind), CoreError> {
        report.validate()?;

        let identity = report.identity().to_owned();
        let now = Utc::now();

        let build = |kind: ChangeKind, prev_mutation: DateTime<Utc>| DeviceRecord {
            identity: identity.clone(),
            local_address: report.local_address.clone(),
            public_address: report.public_address.clone(),
            streaming: report.streaming_state,
            port: report.port,
            liveness: report.liveness(),
            last_report: now,
            last_mutation: if kind.mutates() { now } else { prev_mutation },
        };

        // The entry guard is the per-identity lock: held only for the
        // in-memory swap below.
        let (record, kind) = match self.records.entry(identity.clone()) {
            Entry::Occupied(mut entry) => {
                let old = Arc::clone(entry.get());
                let kind = detect(Some(&old), report);
                if kind == ChangeKind::Significant {
                    info!(change = %change_event(&old, report), "significant change");
                }
                let arc = Arc::new(build(kind, old.last_mutation));
                entry.insert(Arc::clone(&arc));
                (arc, kind)
            }
            Entry::Vacant(entry) => {
                info!(identity = %identity, endpoint = %format!("{}:{}", report.local_address, report.port), "new device");
                let arc = Arc::new(build(ChangeKind::NewIdentity, now));
                entry.insert(Arc::clone(&arc));
                (arc, ChangeKind::NewIdentity)
            }
        };

        if kind.mutates() {
            self.notify();
        } else {
            debug!(identity = %identity, "refresh without change");
        }

        Ok((record, kind))
    }

    /// Remove the record matching the exact (identity, local_address,
    /// port) triple. Returns `true` when something was removed.
    pub fn remove_exact(&self, identity: &str, local_address: &str, port: u16) -> bool {
        let removed = self
            .records
            .remove_if(identity, |_, r| {
                r.local_address == local_address && r.port == port
            })
            .is_some();

        if removed {
            info!(identity, local_address, port, "record removed");
            self.notify();
        }
        removed
    }

    /// Rename a record in place, preserving all other fields.
    ///
    /// Fails with `NotFound` when `old` is absent and `IdentityConflict`
    /// when `new` already names a record.
    pub fn rename_identity(&self, old: &str, new: &str) -> Result<(), CoreError> {
        if old == new {
            return Ok(());
        }
        if self.records.contains_key(new) {
            return Err(CoreError::IdentityConflict {
                identity: new.to_owned(),
            });
        }

        let (_, record) = self.records.remove(old).ok_or_else(|| CoreError::NotFound {
            identity: old.to_owned(),
        })?;

        let renamed = DeviceRecord {
            identity: new.to_owned(),
            last_mutation: Utc::now(),
            ..(*record).clone()
        };
        self.records.insert(new.to_owned(), Arc::new(renamed));

        info!(old, new, "identity renamed");
        self.notify();
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// All records, most recently mutated first, capped at `limit`.
    pub fn get_all(&self, limit: usize) -> Vec<Arc<DeviceRecord>> {
        let mut all: Vec<Arc<DeviceRecord>> =
            self.records.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| b.last_mutation.cmp(&a.last_mutation));
        all.truncate(limit);
        all
    }

    /// Records whose local address matches `addr`.
    pub fn get_by_address(&self, addr: &str) -> Vec<Arc<DeviceRecord>> {
        self.records
            .iter()
            .filter(|r| r.local_address == addr)
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    pub fn get(&self, identity: &str) -> Option<Arc<DeviceRecord>> {
        self.records.get(identity).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to the revision counter. Receivers should treat any
    /// change as "pull a fresh snapshot".
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    // ── Internal ─────────────────────────────────────────────────────

    pub(crate) fn notify(&self) {
        // send_modify updates unconditionally, even with zero receivers.
        self.revision.send_modify(|v| *v += 1);
    }

    /// Clear liveness for `identity`, re-checking staleness under the
    /// entry guard: a report that landed after the caller's read leaves
    /// the record fresh and must not be overwritten. Returns `true` when
    /// the record was demoted.
    pub(crate) fn demote_if_stale(
        &self,
        identity: &str,
        cutoff: chrono::Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let mut demoted = false;
        self.records.alter(identity, |_, record| {
            if record.liveness && now - record.last_report > cutoff {
                demoted = true;
                Arc::new(DeviceRecord {
                    liveness: false,
                    last_mutation: now,
                    ..(*record).clone()
                })
            } else {
                record
            }
        });
        demoted
    }

    pub(crate) fn iter_records(
        &self,
    ) -> impl Iterator<Item = (String, Arc<DeviceRecord>)> + '_ {
        self.records
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamingState;
    use pretty_assertions::assert_eq;

    fn report(identity: &str, streaming: StreamingState) -> StatusReport {
        StatusReport {
            identity: Some(identity.into()),
            local_address: "10.0.0.5".into(),
            public_address: Some("203.0.113.9".into()),
            streaming_state: streaming,
            port: 9000,
            liveness: Some(true),
        }
    }

    #[test]
    fn first_report_is_new_identity() {
        let store = RecordStore::new();
        let (record, kind) = store
            .upsert(&report("CAM1", StreamingState::Off))
            .expect("upsert");

        assert_eq!(kind, ChangeKind::NewIdentity);
        assert_eq!(record.identity, "CAM1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn last_write_wins_per_identity() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("first");

        let mut second = report("CAM1", StreamingState::On);
        second.public_address = Some("198.51.100.7".into());
        store.upsert(&second).expect("second");

        let stored = store.get("CAM1").expect("record");
        assert_eq!(stored.streaming, StreamingState::On);
        assert_eq!(stored.public_address.as_deref(), Some("198.51.100.7"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn identical_report_is_no_change_and_does_not_notify() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("first");
        let rev = store.revision();
        let before = store.get("CAM1").expect("record");

        let (after, kind) = store
            .upsert(&report("CAM1", StreamingState::Off))
            .expect("second");

        assert_eq!(kind, ChangeKind::NoChange);
        assert_eq!(store.revision(), rev);
        // last_report advances, last_mutation does not
        assert!(after.last_report >= before.last_report);
        assert_eq!(after.last_mutation, before.last_mutation);
    }

    #[test]
    fn significant_change_notifies_exactly_once() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("first");
        let rev = store.revision();

        let (_, kind) = store
            .upsert(&report("CAM1", StreamingState::On))
            .expect("second");

        assert_eq!(kind, ChangeKind::Significant);
        assert_eq!(store.revision(), rev + 1);
    }

    #[test]
    fn liveness_only_updates_record_and_notifies() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("first");
        let rev = store.revision();

        let mut flap = report("CAM1", StreamingState::Off);
        flap.liveness = Some(false);
        let (record, kind) = store.upsert(&flap).expect("second");

        assert_eq!(kind, ChangeKind::LivenessOnly);
        assert!(!record.liveness);
        assert_eq!(store.revision(), rev + 1);
    }

    #[test]
    fn malformed_report_is_rejected_without_state_change() {
        let store = RecordStore::new();
        let mut bad = report("CAM1", StreamingState::Off);
        bad.port = 0;

        assert!(store.upsert(&bad).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn get_all_orders_by_last_mutation_desc() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("a");
        store.upsert(&report("CAM2", StreamingState::Off)).expect("b");
        // Mutate CAM1 so it becomes the most recent.
        store.upsert(&report("CAM1", StreamingState::On)).expect("c");

        let all = store.get_all(200);
        assert_eq!(all[0].identity, "CAM1");
        assert_eq!(all[1].identity, "CAM2");
    }

    #[test]
    fn get_all_respects_limit() {
        let store = RecordStore::new();
        for i in 0..5 {
            let mut r = report(&format!("CAM{i}"), StreamingState::Off);
            r.port = 9000 + i;
            store.upsert(&r).expect("upsert");
        }
        assert_eq!(store.get_all(3).len(), 3);
    }

    #[test]
    fn get_by_address_filters() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("a");
        let mut other = report("CAM2", StreamingState::Off);
        other.local_address = "10.0.0.6".into();
        store.upsert(&other).expect("b");

        let hits = store.get_by_address("10.0.0.5");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identity, "CAM1");
    }

    #[test]
    fn remove_exact_requires_full_triple() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("a");

        assert!(!store.remove_exact("CAM1", "10.0.0.5", 9999));
        assert!(!store.remove_exact("CAM1", "10.0.0.99", 9000));
        assert_eq!(store.len(), 1);

        assert!(store.remove_exact("CAM1", "10.0.0.5", 9000));
        assert!(store.is_empty());
    }

    #[test]
    fn rename_preserves_fields() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::On)).expect("a");

        store.rename_identity("CAM1", "STAGE-LEFT").expect("rename");

        assert!(store.get("CAM1").is_none());
        let renamed = store.get("STAGE-LEFT").expect("record");
        assert_eq!(renamed.streaming, StreamingState::On);
        assert_eq!(renamed.port, 9000);
    }

    #[test]
    fn rename_missing_is_not_found() {
        let store = RecordStore::new();
        let err = store.rename_identity("GHOST", "CAM9").expect_err("err");
        assert!(err.is_not_found());
    }

    #[test]
    fn rename_onto_existing_identity_conflicts() {
        let store = RecordStore::new();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("a");
        let mut second = report("CAM2", StreamingState::Off);
        second.port = 9001;
        store.upsert(&second).expect("b");

        let err = store.rename_identity("CAM1", "CAM2").expect_err("err");
        assert!(matches!(err, CoreError::IdentityConflict { .. }));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_revision_changes() {
        let store = RecordStore::new();
        let mut rx = store.subscribe();
        store.upsert(&report("CAM1", StreamingState::Off)).expect("a");

        rx.changed().await.expect("revision change");
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
