//! Server error types.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Site root missing or not a directory.
    #[error("site root {} is not a directory", .0.display())]
    InvalidRoot(PathBuf),

    /// Listen address could not be parsed.
    #[error("invalid listen address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    /// A listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// File watcher could not be started.
    #[error("failed to watch site root: {0}")]
    Watch(#[from] notify::Error),

    /// Socket or filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
