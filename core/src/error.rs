//! Error types for the auth/network layer.
//!
//! # Design
//! Each seam gets its own enum so callers can match on the failures that
//! layer can actually produce. An expired token is not an error anywhere in
//! this crate: it surfaces as `Authorization::RefreshRequired`.
//! `TransportError` is produced by host transports and relayed verbatim.

use thiserror::Error;

/// Failures from a `KeyValueStore` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The key contains characters the backend cannot represent.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// A platform backend (e.g. keychain) rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures from `TokenStore` operations.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored bytes or a caller-supplied mapping did not match the record
    /// schema. Nothing was written.
    #[error("auth record decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The record could not be serialized for persistence.
    #[error("auth record encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The operation needs an existing session record.
    #[error("no active auth session")]
    NoSession,
}

/// Errors reported by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The host could not reach the server.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport treats this status as a failure.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Reading or writing the request/response body failed.
    #[error("transport I/O failed: {0}")]
    Io(String),

    /// The dispatch was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Errors returned by `DispatchHandle::finish`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `Dispatcher::send` was called outside a tokio runtime.
    #[error("no tokio runtime to run the request on")]
    NoRuntime,
}

/// Failures while loading `AuthnetConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_status_display_includes_body() {
        let err = TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: unavailable");
    }

    #[test]
    fn storage_error_is_transparent_in_token_store_error() {
        let err = TokenStoreError::from(StorageError::InvalidKey("a/b".to_string()));
        assert_eq!(err.to_string(), "invalid storage key: \"a/b\"");
    }
}
