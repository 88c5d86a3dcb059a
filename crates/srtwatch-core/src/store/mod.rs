// ── Record store ──
//
// Keyed device storage with push-based change notification.

mod records;
mod watchdog;

pub use records::RecordStore;
pub use watchdog::{run_watchdog, WatchdogConfig};
