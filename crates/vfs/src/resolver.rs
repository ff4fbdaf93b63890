//! Directory resolver.
//!
//! Maps a mount-relative path to a listing. The root enumerates buckets;
//! below the root the first path segment selects the bucket and the rest
//! becomes a delimited listing prefix. Listings are built ad hoc from the
//! object store on every call - there is no listing cache.

use std::time::SystemTime;

use minfs_common::{entry_name, listing_prefix, split_mount_path, BUCKET_DIR_MODE, PREFIX_DIR_MODE};
use minfs_storage::ObjectClient;

use crate::error::VfsError;
use crate::options::MountOptions;

/// One entry produced by a directory scan.
#[derive(Debug, Clone)]
pub enum ScanEntry {
    /// A subdirectory: a bucket at the root, or a common prefix below it.
    Dir {
        name: String,
        perm: u16,
        mtime: Option<SystemTime>,
    },
    /// A regular file backed by one object.
    File {
        name: String,
        size: u64,
        etag: String,
        mtime: Option<SystemTime>,
    },
}

impl ScanEntry {
    /// The entry's name within its directory.
    pub fn name(&self) -> &str {
        match self {
            ScanEntry::Dir { name, .. } => name,
            ScanEntry::File { name, .. } => name,
        }
    }
}

/// Stateless scanner over one client.
///
/// Holds only borrowed references; the mount context outlives every
/// resolver for the mount's lifetime.
pub struct Resolver<'a> {
    client: &'a dyn ObjectClient,
    options: &'a MountOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a dyn ObjectClient, options: &'a MountOptions) -> Self {
        Self { client, options }
    }

    /// List the directory at `path` (empty string = mount root).
    pub async fn scan(&self, path: &str) -> Result<Vec<ScanEntry>, VfsError> {
        match split_mount_path(path) {
            None => self.scan_root().await,
            Some((bucket, rest)) => self.scan_prefix(bucket, rest).await,
        }
    }

    /// Find a single entry by name inside the directory at `path`.
    ///
    /// Performs the same scan as the listing; `Ok(None)` means no entry.
    pub async fn lookup(&self, path: &str, name: &str) -> Result<Option<ScanEntry>, VfsError> {
        let entries: Vec<ScanEntry> = self.scan(path).await?;
        Ok(entries.into_iter().find(|e| e.name() == name))
    }

    async fn scan_root(&self) -> Result<Vec<ScanEntry>, VfsError> {
        let buckets = self.client.list_buckets().await?;

        let entries: Vec<ScanEntry> = buckets
            .into_iter()
            .filter(|b| match self.options.bucket {
                // target URL named a bucket; the root shows only that one
                Some(ref only) => b.name == *only,
                None => true,
            })
            .map(|b| ScanEntry::Dir {
                name: b.name,
                perm: BUCKET_DIR_MODE as u16,
                mtime: b.creation_date,
            })
            .collect();

        Ok(entries)
    }

    async fn scan_prefix(&self, bucket: &str, dir_path: &str) -> Result<Vec<ScanEntry>, VfsError> {
        let prefix: String = listing_prefix(&self.options.base_path, dir_path);
        let objects = self.client.list_objects(bucket, &prefix, false).await?;

        let mut entries: Vec<ScanEntry> = Vec::with_capacity(objects.len());
        for obj in objects {
            // The store echoes the prefix itself for directory markers.
            let Some(name) = entry_name(&obj.key, &prefix) else {
                continue;
            };
            if obj.is_prefix() {
                entries.push(ScanEntry::Dir {
                    name: name.to_string(),
                    perm: PREFIX_DIR_MODE as u16,
                    mtime: obj.last_modified,
                });
            } else {
                entries.push(ScanEntry::File {
                    name: name.to_string(),
                    size: obj.size,
                    etag: obj.etag,
                    mtime: obj.last_modified,
                });
            }
        }

        Ok(entries)
    }
}
