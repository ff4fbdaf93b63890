//! Error types for cache operations.

use thiserror::Error;

/// Errors that can occur while operating on the on-disk cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Walking the cache directory failed. The directory may be in flux;
    /// the evictor logs this and skips the tick.
    #[error("Cache walk failed at {path}: {message}")]
    WalkFailed { path: String, message: String },

    /// Local I/O error on a cache file.
    #[error("Cache I/O error for {path}: {message}")]
    Io { path: String, message: String },
}

impl CacheError {
    /// Create an Io error from std::io::Error.
    ///
    /// # Arguments
    /// * `path` - Path where the error occurred
    /// * `err` - The underlying IO error
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
