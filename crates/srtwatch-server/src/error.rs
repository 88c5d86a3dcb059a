use std::net::SocketAddr;

use thiserror::Error;

/// Failures that stop the server from running at all.
///
/// Request-level failures never reach this type; they are mapped to
/// HTTP status codes in `routes`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server I/O error")]
    Io(#[source] std::io::Error),
}
