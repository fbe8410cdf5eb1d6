//! Error types for twotube-core.

use thiserror::Error;

/// Result type alias for twotube operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for coincidence extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A caller supplied an argument the operation cannot accept,
    /// e.g. the same detector twice.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Hit data is missing fields or the per-field sequences disagree in length.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl Error {
    pub(crate) fn malformed_event(event: usize, reason: impl std::fmt::Display) -> Self {
        Self::MalformedInput(format!("event {event}: {reason}"))
    }
}
