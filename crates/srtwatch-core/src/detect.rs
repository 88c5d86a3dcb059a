// ── Change detection ──
//
// Classifies an incoming report against the stored record. Liveness
// toggles at heartbeat frequency and is deliberately excluded from
// "significant": it must update the record (the watchdog and any UI read
// it) but must never by itself reach the alert path.

use crate::model::{DeviceRecord, StatusReport};

/// Classification of an incoming report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// First report for an unseen identity. Always significant.
    NewIdentity,
    /// Address, port, streaming state, or identity differs.
    Significant,
    /// Only the liveness flag differs.
    LivenessOnly,
    /// Nothing differs; the report is a pure refresh.
    NoChange,
}

impl ChangeKind {
    /// Whether this change updates `last_mutation` and notifies
    /// subscribers.
    pub fn mutates(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Old/new values for a significant change, for logging only.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub identity: String,
    pub fields: Vec<FieldChange>,
}

#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.identity)?;
        for c in &self.fields {
            write!(f, " {}: {} -> {}", c.field, c.old, c.new)?;
        }
        Ok(())
    }
}

/// Classify `report` against the stored record (if any).
pub fn detect(old: Option<&DeviceRecord>, report: &StatusReport) -> ChangeKind {
    let Some(old) = old else {
        return ChangeKind::NewIdentity;
    };

    let significant = old.identity != report.identity()
        || old.local_address != report.local_address
        || old.public_address != report.public_address
        || old.streaming != report.streaming_state
        || old.port != report.port;

    if significant {
        ChangeKind::Significant
    } else if old.liveness != report.liveness() {
        ChangeKind::LivenessOnly
    } else {
        ChangeKind::NoChange
    }
}

/// Build the old/new field list for a significant change.
pub fn change_event(old: &DeviceRecord, report: &StatusReport) -> ChangeEvent {
    fn opt(v: Option<&str>) -> String {
        v.unwrap_or("-").to_owned()
    }

    let mut fields = Vec::new();
    if old.local_address != report.local_address {
        fields.push(FieldChange {
            field: "local_address",
            old: old.local_address.clone(),
            new: report.local_address.clone(),
        });
    }
    if old.public_address != report.public_address {
        fields.push(FieldChange {
            field: "public_address",
            old: opt(old.public_address.as_deref()),
            new: opt(report.public_address.as_deref()),
        });
    }
    if old.streaming != report.streaming_state {
        fields.push(FieldChange {
            field: "streaming_state",
            old: old.streaming.to_string(),
            new: report.streaming_state.to_string(),
        });
    }
    if old.port != report.port {
        fields.push(FieldChange {
            field: "port",
            old: old.port.to_string(),
            new: report.port.to_string(),
        });
    }

    ChangeEvent {
        identity: report.identity().to_owned(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamingState;
    use chrono::Utc;

    fn record() -> DeviceRecord {
        DeviceRecord {
            identity: "CAM1".into(),
            local_address: "10.0.0.5".into(),
            public_address: Some("203.0.113.9".into()),
            streaming: StreamingState::Off,
            port: 9000,
            liveness: true,
            last_report: Utc::now(),
            last_mutation: Utc::now(),
        }
    }

    fn matching_report() -> StatusReport {
        StatusReport {
            identity: Some("CAM1".into()),
            local_address: "10.0.0.5".into(),
            public_address: Some("203.0.113.9".into()),
            streaming_state: StreamingState::Off,
            port: 9000,
            liveness: Some(true),
        }
    }

    #[test]
    fn missing_record_is_new_identity() {
        assert_eq!(detect(None, &matching_report()), ChangeKind::NewIdentity);
    }

    #[test]
    fn identical_report_is_no_change() {
        assert_eq!(detect(Some(&record()), &matching_report()), ChangeKind::NoChange);
    }

    #[test]
    fn streaming_difference_is_significant() {
        let mut r = matching_report();
        r.streaming_state = StreamingState::On;
        assert_eq!(detect(Some(&record()), &r), ChangeKind::Significant);
    }

    #[test]
    fn port_difference_is_significant() {
        let mut r = matching_report();
        r.port = 9001;
        assert_eq!(detect(Some(&record()), &r), ChangeKind::Significant);
    }

    #[test]
    fn liveness_difference_alone_is_liveness_only() {
        let mut r = matching_report();
        r.liveness = Some(false);
        assert_eq!(detect(Some(&record()), &r), ChangeKind::LivenessOnly);
    }

    #[test]
    fn liveness_plus_streaming_is_significant() {
        let mut r = matching_report();
        r.liveness = Some(false);
        r.streaming_state = StreamingState::On;
        assert_eq!(detect(Some(&record()), &r), ChangeKind::Significant);
    }

    #[test]
    fn change_event_lists_only_differing_fields() {
        let mut r = matching_report();
        r.streaming_state = StreamingState::On;
        let event = change_event(&record(), &r);
        assert_eq!(event.fields.len(), 1);
        assert_eq!(event.fields[0].field, "streaming_state");
        assert_eq!(event.to_string(), "[CAM1] streaming_state: OFF -> ON");
    }
}
