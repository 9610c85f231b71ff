//! Unified error types for sw-cache.
//!
//! Every variant renders with a stable machine-readable prefix so that
//! tool callers can match on it without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the sw-cache worker and server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed control message).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network could not be reached (offline, DNS, timeout).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A write violated the store's admission rules (non-GET or non-200).
    #[error("NOT_CACHEABLE: {0}")]
    NotCacheable(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored data could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    Corrupt(String),

    /// One or more manifest assets could not be fetched during install.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// A lifecycle transition was requested from the wrong state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// A host collaborator (clients, notifications) refused an operation.
    #[error("CLIENT_ERROR: {0}")]
    Client(String),
}

impl Error {
    /// Whether this error came from the network rather than the store.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Corrupt(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Network(msg) => (-32008, msg.clone()),
            Error::NotCacheable(msg) => (-32013, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Corrupt(msg) => (-32002, msg.clone()),
            Error::InstallFailed(msg) => (-32014, msg.clone()),
            Error::InvalidState(msg) => (-32015, msg.clone()),
            Error::Client(msg) => (-32016, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
