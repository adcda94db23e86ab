//! Error types for the wikilink processor.
//!
//! Per-link variants (`Parse`, `Resolution`) and the per-note variant
//! (`NoteAccess`) are recorded in a [`ProcessingResult`](crate::ProcessingResult)
//! and never abort a run. `ConfigValidation` and `Run` propagate to the caller.

use thiserror::Error;

/// Result type alias using the processor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for wikilink processing.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or degenerate wikilink token (e.g. empty title)
    #[error("Parse error: {0}")]
    Parse(String),

    /// No candidate note found (and auto-create disabled), or the lookup failed
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Note to process vanished or its content could not be read
    #[error("Note access error: {0}")]
    NoteAccess(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Invalid configuration value, raised before any processing
    #[error("Configuration error: {0}")]
    ConfigValidation(String),

    /// Candidate selection or batch orchestration failed
    #[error("Run failed: {0}")]
    Run(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Remote store answered with an error status
    #[error("Store error ({status}): {message}")]
    Store { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
