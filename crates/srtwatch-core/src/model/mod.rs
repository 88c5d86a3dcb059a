// ── Domain model ──
//
// DeviceRecord is the canonical per-device state; StatusReport is the
// inbound report shape; NormalizedSnapshot is the comparison-only
// projection; wire.rs holds the JSON envelope shared with server and
// clients.

mod record;
mod report;
mod snapshot;
mod wire;

pub use record::{DeviceRecord, StreamingState};
pub use report::StatusReport;
pub use snapshot::{NormalizedEntry, NormalizedSnapshot};
pub use wire::{WireDevice, WireEntry};
