// srtwatch-core: domain model and synchronization engine between device
// reports and consumers (server/CLI observers).

pub mod detect;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod watchlist;

// ── Primary re-exports ──────────────────────────────────────────────
pub use detect::{ChangeEvent, ChangeKind};
pub use error::CoreError;
pub use reconcile::{Outcome, Reconciler};
pub use store::{run_watchdog, RecordStore, WatchdogConfig};
pub use watchlist::{WatchEntry, Watchlist};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DeviceRecord, NormalizedEntry, NormalizedSnapshot, StatusReport, StreamingState, WireDevice,
    WireEntry,
};
