//! Error types for the VFS crate.

use std::fmt;

use minfs_cache::CacheError;
use minfs_storage::StorageError;

/// Errors that can occur during filesystem operations.
///
/// Anything that reaches a FUSE handler aborts that handler and is
/// translated to a kernel error code via [`VfsError::errno`].
#[derive(Debug)]
pub enum VfsError {
    /// Inode not found in the node table.
    InodeNotFound(u64),

    /// Operation requires a directory.
    NotADirectory(u64),

    /// Operation requires a regular file.
    NotAFile(u64),

    /// No such object or bucket upstream.
    NotFound { path: String },

    /// Object-store failure.
    Storage(StorageError),

    /// Local cache failure.
    Cache(CacheError),

    /// Local I/O failure outside the cache store.
    Io { path: String, message: String },

    /// Mount operation failed.
    MountFailed(String),
}

impl VfsError {
    /// Map this error to the errno surfaced to the kernel.
    pub fn errno(&self) -> libc::c_int {
        match self {
            VfsError::InodeNotFound(_) => libc::ENOENT,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::NotAFile(_) => libc::EISDIR,
            VfsError::NotFound { .. } => libc::ENOENT,
            VfsError::Storage(err) if err.is_not_found() => libc::ENOENT,
            // No retry at this layer; the kernel and the application
            // retry at their discretion.
            VfsError::Storage(_) => libc::EIO,
            VfsError::Cache(_) => libc::EIO,
            VfsError::Io { .. } => libc::EIO,
            VfsError::MountFailed(_) => libc::EIO,
        }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::InodeNotFound(ino) => write!(f, "Inode not found: {}", ino),
            VfsError::NotADirectory(ino) => write!(f, "Not a directory: {}", ino),
            VfsError::NotAFile(ino) => write!(f, "Not a file: {}", ino),
            VfsError::NotFound { path } => write!(f, "No such object: {}", path),
            VfsError::Storage(err) => write!(f, "Object store error: {}", err),
            VfsError::Cache(err) => write!(f, "Cache error: {}", err),
            VfsError::Io { path, message } => write!(f, "I/O error for {}: {}", path, message),
            VfsError::MountFailed(msg) => write!(f, "Mount failed: {}", msg),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::Storage(err) => Some(err),
            VfsError::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for VfsError {
    fn from(err: StorageError) -> Self {
        VfsError::Storage(err)
    }
}

impl From<CacheError> for VfsError {
    fn from(err: CacheError) -> Self {
        VfsError::Cache(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(
            VfsError::NotFound { path: "b/a".into() }.errno(),
            libc::ENOENT
        );
        assert_eq!(
            VfsError::Storage(StorageError::NotFound {
                bucket: "b".into(),
                key: "a".into()
            })
            .errno(),
            libc::ENOENT
        );
        assert_eq!(
            VfsError::Storage(StorageError::NetworkError {
                message: "timeout".into(),
                retryable: true
            })
            .errno(),
            libc::EIO
        );
        assert_eq!(VfsError::NotADirectory(7).errno(), libc::ENOTDIR);
    }
}
