//! Registry of open file handles.
//!
//! Maps the handle id surfaced to the kernel to the cache path the handle
//! reads from. The evictor consults this (under the keyed lock for the
//! path) before deleting a cache file. The local fd behind a handle lives
//! in the filesystem layer's open-file table under the same id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Opaque identifier for a live open file. Allocated monotonically.
pub type HandleId = u64;

/// Table of live handles and the cache paths backing them.
///
/// Invariant: while an entry `(h, p)` is present, the file at `p` exists in
/// the cache and the owner of `h` holds a local fd on it.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<HandleId, PathBuf>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh handle id for a file served from `cache_path`.
    pub fn acquire(&self, cache_path: &Path) -> HandleId {
        let id: HandleId = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap()
            .insert(id, cache_path.to_path_buf());
        id
    }

    /// Remove a handle. Releasing an unknown id is a no-op returning `None`.
    pub fn release(&self, id: HandleId) -> Option<PathBuf> {
        self.entries.lock().unwrap().remove(&id)
    }

    /// Check whether any live handle reads from `cache_path`.
    ///
    /// Returns a snapshot; callers sequence against new acquires by holding
    /// the keyed lock for the path across this call and the decision it
    /// feeds.
    pub fn is_in_use(&self, cache_path: &Path) -> bool {
        self.entries
            .lock()
            .unwrap()
            .values()
            .any(|p| p == cache_path)
    }

    /// Number of live handles, for observability.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
