//! Client trait for S3-compatible object stores.

use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::StorageError;

/// Information about a bucket from a list-buckets call.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    /// Bucket name. Surfaces as a first-level directory at the mount root.
    pub name: String,
    /// Creation timestamp, when the store reports one.
    pub creation_date: Option<SystemTime>,
}

/// Information about an object from list/stat operations.
///
/// A delimited (non-recursive) listing also yields synthetic entries for
/// common prefixes; those have a `key` ending in `/`, zero `size`, and no
/// `etag`.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Full object key within its bucket.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// ETag without surrounding quotes. Part of the cache filename, so a
    /// content-version change produces a fresh cache entry.
    pub etag: String,
    /// Last modified timestamp.
    pub last_modified: Option<SystemTime>,
}

impl ObjectInfo {
    /// Check whether this entry is a synthetic common-prefix (directory).
    pub fn is_prefix(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// The object-store operations minfs consumes.
///
/// Every method may block on the network indefinitely; callers hold no
/// shared lock across these calls. Implementations distinguish "object does
/// not exist" (`Ok(None)` / `StorageError::NotFound`) from transport
/// failures so the FUSE boundary can map them to `ENOENT` vs `EIO`.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// List all buckets visible to this client.
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError>;

    /// List objects under `prefix`.
    ///
    /// With `recursive` false the listing is delimited on `/` and common
    /// prefixes come back as entries whose key ends in `/`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Stat a single object. Returns `None` if it doesn't exist.
    async fn stat_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectInfo>, StorageError>;

    /// Fetch an object's contents into `local_path`, atomically.
    ///
    /// The file either appears complete or not at all: implementations
    /// stream into a sibling temporary and rename into place. Parent
    /// directories are created as needed.
    async fn fetch_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError>;
}
