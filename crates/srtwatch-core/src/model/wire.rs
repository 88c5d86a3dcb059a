// ── Wire format ──
//
// The JSON envelope served by `GET /` and pushed over the WebSocket
// channel: `{timestamp, data: {...}}` per device, most recently mutated
// first. Shared by the server and the client crates so both sides agree
// on field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{DeviceRecord, StreamingState};
use super::snapshot::NormalizedEntry;

/// Device fields as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDevice {
    pub identity: String,
    pub local_address: String,
    #[serde(default)]
    pub public_address: Option<String>,
    pub streaming_state: StreamingState,
    pub port: u16,
    pub liveness: bool,
}

/// One snapshot entry: the device plus its last mutation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub timestamp: DateTime<Utc>,
    pub data: WireDevice,
}

impl From<&DeviceRecord> for WireEntry {
    fn from(r: &DeviceRecord) -> Self {
        Self {
            timestamp: r.last_mutation,
            data: WireDevice {
                identity: r.identity.clone(),
                local_address: r.local_address.clone(),
                public_address: r.public_address.clone(),
                streaming_state: r.streaming,
                port: r.port,
                liveness: r.liveness,
            },
        }
    }
}

impl From<&WireDevice> for NormalizedEntry {
    fn from(d: &WireDevice) -> Self {
        Self {
            identity: d.identity.clone(),
            local_address: d.local_address.clone(),
            public_address: d.public_address.clone(),
            streaming: d.streaming_state,
            port: d.port,
        }
    }
}
