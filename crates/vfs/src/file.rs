//! The file-open workflow.
//!
//! Opening a file resolves its cache path from the object's current etag,
//! then populates and pins the cache file under the path's keyed lock:
//!
//! 1. stat the object (current size + etag)
//! 2. derive the cache path
//! 3. take the keyed lock for that path
//! 4. ensure the file is present (touch on hit, fetch on miss)
//! 5. register the handle, open a local fd
//! 6. release the lock
//!
//! Because the evictor takes the same lock before checking the handle
//! registry, there is no window in which a just-populated file can be
//! deleted before its handle is visible. Two concurrent opens of the same
//! object contend on the same key; the loser finds the file present and
//! skips the fetch.

use std::fs::OpenOptions;
use std::path::PathBuf;

use minfs_cache::HandleId;
use minfs_storage::{ObjectClient, ObjectInfo};

use crate::error::VfsError;
use crate::fs::MountContext;

/// A served open file: the local fd and the cache path pinning it.
#[derive(Debug)]
pub struct OpenFile {
    /// Local fd on the cache file. Reads are positional.
    pub file: std::fs::File,
    /// The cache file backing this handle.
    pub cache_path: PathBuf,
}

/// Open `bucket/key` through the cache and register a handle.
///
/// Returns the handle id (surfaced to the kernel), the open file slot, and
/// the on-disk size actually being served.
///
/// # Arguments
/// * `ctx` - Mount context (cache store, registry, keyed mutex)
/// * `client` - Object client for the requesting uid
/// * `bucket` - Bucket name
/// * `key` - Full object key
/// * `flags` - Open flags from the kernel request
pub async fn open_file(
    ctx: &MountContext,
    client: &dyn ObjectClient,
    bucket: &str,
    key: &str,
    flags: i32,
) -> Result<(HandleId, OpenFile, u64), VfsError> {
    let object: ObjectInfo =
        client
            .stat_object(bucket, key)
            .await?
            .ok_or_else(|| VfsError::NotFound {
                path: format!("{bucket}/{key}"),
            })?;

    let cache_path: PathBuf = ctx.store.cache_path(bucket, &object.key, &object.etag);

    // Lock the cache resource until the open is fully served. The guard
    // releases on every exit path.
    let _guard = ctx.keyed.lock(&cache_path.to_string_lossy()).await;

    let size: u64 = ensure_cached(ctx, client, bucket, &object, &cache_path, flags).await?;

    let handle: HandleId = ctx.registry.acquire(&cache_path);

    let truncate: bool = flags & libc::O_TRUNC != 0;
    let file: std::fs::File = OpenOptions::new()
        .read(true)
        .write(truncate)
        .open(&cache_path)
        .map_err(|e| {
            // keep the registry invariant: no entry without an fd
            ctx.registry.release(handle);
            VfsError::Io {
                path: cache_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

    Ok((
        handle,
        OpenFile {
            file,
            cache_path,
        },
        size,
    ))
}

/// Make sure the cache file exists and return the size being served.
///
/// Must be called with the keyed lock for `cache_path` held.
async fn ensure_cached(
    ctx: &MountContext,
    client: &dyn ObjectClient,
    bucket: &str,
    object: &ObjectInfo,
    cache_path: &std::path::Path,
    flags: i32,
) -> Result<u64, VfsError> {
    if let Ok(meta) = std::fs::metadata(cache_path) {
        // Warm hit: promote out of the LRU victim set and serve as-is.
        ctx.store.touch(cache_path)?;
        return Ok(meta.len());
    }

    if flags & libc::O_TRUNC != 0 {
        // Truncate-on-open: the caller wants zero length; no point
        // fetching contents it is about to discard.
        if let Some(parent) = cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VfsError::Io {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        std::fs::File::create(cache_path).map_err(|e| VfsError::Io {
            path: cache_path.display().to_string(),
            message: e.to_string(),
        })?;
        return Ok(0);
    }

    client
        .fetch_object_to_file(bucket, &object.key, cache_path)
        .await?;

    let meta = std::fs::metadata(cache_path).map_err(|e| VfsError::Io {
        path: cache_path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(meta.len())
}
