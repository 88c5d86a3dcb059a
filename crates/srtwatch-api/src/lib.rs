//! Client-side transport for the srtwatch monitor server.
//!
//! - [`MonitorClient`]: pull-based HTTP access (snapshots, reports,
//!   removal, rename).
//! - [`websocket`]: the push channel with reconnect backoff.
//! - [`SnapshotFeed`]: push-with-pull-fallback adapter combining the two.
//! - [`AlertSink`]: the outbound webhook for alert delivery.

pub mod alert;
pub mod client;
pub mod error;
pub mod feed;
pub mod transport;
pub mod websocket;

pub use alert::{AlertMessage, AlertSink};
pub use client::{MonitorClient, ReportAck, ReportAction};
pub use error::Error;
pub use feed::{FeedConfig, FeedState, SnapshotFeed};
pub use transport::TransportConfig;
pub use websocket::{PushHandle, ReconnectConfig, SnapshotFrame};
