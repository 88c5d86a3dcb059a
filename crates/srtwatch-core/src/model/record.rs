// ── Device record types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// SRT streaming state as reported by a device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum StreamingState {
    On,
    Off,
    #[default]
    Unknown,
}

impl StreamingState {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// Canonical per-device state. One record per identity.
///
/// `identity` is the stable key: the device name, falling back to the
/// local address when no name was reported. Mutable fields are replaced
/// wholesale on every accepted report; `last_report` always advances,
/// `last_mutation` advances only when something actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub identity: String,
    pub local_address: String,
    pub public_address: Option<String>,
    pub streaming: StreamingState,
    pub port: u16,
    /// "App reporting" flag. Cleared by the staleness watchdog, never by
    /// report absence alone.
    pub liveness: bool,
    pub last_report: DateTime<Utc>,
    pub last_mutation: DateTime<Utc>,
}

impl DeviceRecord {
    /// Endpoint string for logs (`addr:port`).
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.local_address, self.port)
    }
}
