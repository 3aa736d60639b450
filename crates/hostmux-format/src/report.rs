//! Host-grouped error reporting.

use std::io::Write;

use crate::error::FormatError;

/// One host's failure within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    pub host: String,
    pub message: String,
}

impl HostFailure {
    pub fn new(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            message: message.into(),
        }
    }
}

/// The error summary printed after a batch: per-host failures grouped by
/// host, followed by the hosts that never yielded a connection.
///
/// An empty report prints nothing, so callers can write it unconditionally.
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    pub failures: Vec<HostFailure>,
    pub unconnected: Vec<String>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&mut self, host: impl Into<String>, message: impl Into<String>) {
        self.failures.push(HostFailure::new(host, message));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.unconnected.is_empty()
    }

    /// Writes the report. Produces no output when the report is empty.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        if self.is_empty() {
            return Ok(());
        }
        if !self.failures.is_empty() {
            writeln!(w, "Errors:")?;
            for failure in &self.failures {
                writeln!(w, "  {}: {}", failure.host, failure.message)?;
            }
        }
        if !self.unconnected.is_empty() {
            writeln!(w, "Could not connect:")?;
            for host in &self.unconnected {
                writeln!(w, "  {}", host)?;
            }
        }
        Ok(())
    }
}
