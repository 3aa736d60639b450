//! Formatter errors.

use thiserror::Error;

/// Errors that can occur while rendering the event stream.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for FormatError {
    fn from(e: csv::Error) -> Self {
        FormatError::Csv(e.to_string())
    }
}
