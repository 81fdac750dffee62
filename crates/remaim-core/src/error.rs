//! Error types for remaim.

use thiserror::Error;

/// Main error type for remaim operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Conduit answered with an error envelope
    #[error("Conduit error: {code} - {info}")]
    Conduit { code: String, info: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tracker could not be reached at all
    #[error("Unable to connect to {host}: {reason}")]
    Unreachable { host: String, reason: String },

    /// The selected source project has no issues
    #[error("No tasks found on project with id {project_id}")]
    NoIssuesFound { project_id: u64 },

    /// Requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data returned by a tracker had an unexpected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Standard input was closed while an answer was expected
    #[error("Input closed while waiting for an answer")]
    InputClosed,

    /// Terminal I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an error from an HTTP status code and response body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// Whether this error means the remote side is not reachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Unreachable { .. })
    }
}

/// Result type alias for remaim operations.
pub type Result<T> = std::result::Result<T, Error>;
