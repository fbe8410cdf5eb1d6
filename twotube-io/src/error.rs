//! I/O error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// A requested subset label is not present in a run file.
    #[error("subset '{label}' not found in {}", .path.display())]
    SubsetNotFound { label: String, path: PathBuf },

    /// Invalid analysis layout.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] twotube_core::Error),
}
