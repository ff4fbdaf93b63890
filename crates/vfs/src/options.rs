//! Configuration options for the mount.

use std::time::Duration;

use minfs_cache::DEFAULT_EVICTOR_INTERVAL;
use minfs_common::DEFAULT_FILE_MODE;

/// Behavior options for one mount.
///
/// # Example
///
/// ```ignore
/// let options = MountOptions::default()
///     .with_bucket(Some("backups".into()))
///     .with_quota_gb(16.0);
/// ```
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Restrict the mount to one bucket. `None` surfaces every bucket the
    /// credentials can see as a first-level directory.
    pub bucket: Option<String>,
    /// Key prefix all object paths are joined under (from the target URL).
    pub base_path: String,
    /// Owner uid reported for every node.
    pub uid: u32,
    /// Owner gid reported for every node.
    pub gid: u32,
    /// Permission bits reported for regular files.
    pub file_mode: u32,
    /// Cache quota in GiB. `0.0` disables eviction deletion.
    pub quota_gb: f64,
    /// Interval between evictor passes.
    pub evictor_interval: Duration,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            bucket: None,
            base_path: String::new(),
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            file_mode: DEFAULT_FILE_MODE,
            quota_gb: 0.0,
            evictor_interval: DEFAULT_EVICTOR_INTERVAL,
        }
    }
}

impl MountOptions {
    /// Restrict the mount to one bucket.
    pub fn with_bucket(mut self, bucket: Option<String>) -> Self {
        self.bucket = bucket;
        self
    }

    /// Set the base path joined under the bucket.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the reported owner.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Set the permission bits reported for regular files.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Set the cache quota in GiB.
    pub fn with_quota_gb(mut self, quota_gb: f64) -> Self {
        self.quota_gb = quota_gb;
        self
    }

    /// Set the evictor interval.
    pub fn with_evictor_interval(mut self, interval: Duration) -> Self {
        self.evictor_interval = interval;
        self
    }
}
