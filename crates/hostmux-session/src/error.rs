//! Session errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by session construction and iteration.
///
/// Per-host connection failures are deliberately NOT errors at this level:
/// they mark the host unconnected and the batch continues. The only fatal
/// batch condition is `NoConnections`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid host '{spec}': {reason}")]
    InvalidHost { spec: String, reason: String },

    #[error("cannot read hosts file {path}: {source}")]
    HostsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no host could be connected")]
    NoConnections,
}
