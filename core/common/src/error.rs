//! Common error types for Sluice.

use thiserror::Error;

/// Top-level error type for storage operations.
///
/// Variants are classified as transient or permanent, see [`Error::is_transient`].
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure (connection reset, DNS, broken stream).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The service asked us to slow down.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Credentials were rejected or lack permission.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required configuration field is missing or malformed.
    #[error("Configuration error: {field}: {reason}")]
    Config { field: String, reason: String },
}

impl Error {
    /// Build a configuration error for `field`.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) | Error::Throttled(_) => true,
            Error::Io(e) => is_transient_io(e.kind()),
            _ => false,
        }
    }
}

/// I/O failures worth repeating. Permission, space and path-shape errors
/// fail the same way on every attempt.
fn is_transient_io(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
