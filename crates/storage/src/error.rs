//! Error types for object-store operations.

use thiserror::Error;

/// Errors that can occur while talking to the object store or spooling
/// its contents to the local cache.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Object not found in the store.
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Access denied by the store.
    #[error("Access denied to {bucket}/{key}: {message}")]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },

    /// Transport-level failure (connection, TLS, 5xx).
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// Local I/O error while writing fetched contents.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Invalid client configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::NotFound { .. } => false,
            StorageError::AccessDenied { .. } => false,
            StorageError::IoError { .. } => false,
            StorageError::InvalidConfig { .. } => false,
        }
    }

    /// Check if this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError {
            path: String::new(),
            message: err.to_string(),
        }
    }
}
