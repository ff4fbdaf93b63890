//! On-disk cache store.
//!
//! The store is a directory of `<bucket>/<objectKey>-<etag>.fcache` files.
//! No metadata sidecar exists: identity lives in the filename and recency in
//! the file mtime. Callers must hold the keyed lock for a cache path before
//! observing or mutating the file behind it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use walkdir::WalkDir;

use minfs_common::{bytes_to_gib, CACHE_FILE_SUFFIX};

use crate::error::CacheError;

/// Immutable snapshot of one cached file, produced by [`CacheStore::walk`].
#[derive(Debug, Clone)]
pub struct CacheItem {
    /// Absolute path of the cache file.
    pub path: PathBuf,
    /// Size in GiB.
    pub size_gb: f64,
    /// Last-modified time; the eviction ordering key.
    pub mtime: SystemTime,
}

/// Handle to the cache directory.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open the store, creating the root directory if needed.
    ///
    /// # Arguments
    /// * `root` - Cache directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root: PathBuf = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| CacheError::from_io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic cache path for one object version.
    ///
    /// `<root>/<bucket>/<objectKey>-<etag>.fcache`. Object keys may contain
    /// `/`; the fetch step creates intermediate directories. Distinct etags
    /// never collide because the etag is part of the final component.
    pub fn cache_path(&self, bucket: &str, key: &str, etag: &str) -> PathBuf {
        self.root
            .join(bucket)
            .join(format!("{key}-{etag}{CACHE_FILE_SUFFIX}"))
    }

    /// Walk the cache directory.
    ///
    /// Returns every regular `.fcache` file sorted oldest-mtime first,
    /// along with the total size in GiB. Any walk or stat error aborts the
    /// walk and propagates; the directory may be in flux and the caller
    /// decides whether to retry later.
    pub fn walk(&self) -> Result<(Vec<CacheItem>, f64), CacheError> {
        let mut items: Vec<CacheItem> = Vec::new();
        let mut total_gb: f64 = 0.0;

        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| CacheError::WalkFailed {
                path: e
                    .path()
                    .unwrap_or(&self.root)
                    .display()
                    .to_string(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let is_cache_file: bool = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(CACHE_FILE_SUFFIX));
            if !is_cache_file {
                continue;
            }

            let meta = entry
                .metadata()
                .map_err(|e| CacheError::WalkFailed {
                    path: entry.path().display().to_string(),
                    message: e.to_string(),
                })?;
            let mtime: SystemTime = meta.modified().map_err(|e| {
                CacheError::from_io(entry.path().display().to_string(), e)
            })?;

            let size_gb: f64 = bytes_to_gib(meta.len());
            total_gb += size_gb;
            items.push(CacheItem {
                path: entry.into_path(),
                size_gb,
                mtime,
            });
        }

        items.sort_by_key(|item| item.mtime);

        Ok((items, total_gb))
    }

    /// Best-effort delete of a cache file. Absence is not an error.
    ///
    /// Callers must hold the keyed lock for `path`.
    pub fn remove(&self, path: &Path) -> Result<(), CacheError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::from_io(path.display().to_string(), e)),
        }
    }

    /// Bump a cache file's timestamps to now.
    ///
    /// Eviction orders victims by mtime; a warm open promotes its file out
    /// of the victim set this way instead of tracking atime.
    pub fn touch(&self, path: &Path) -> Result<(), CacheError> {
        let now: FileTime = FileTime::now();
        filetime::set_file_times(path, now, now)
            .map_err(|e| CacheError::from_io(path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn write_cache_file(root: &Path, rel: &str, len: usize, age_secs: u64) -> PathBuf {
        let path: PathBuf = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; len]).unwrap();
        let mtime = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(age_secs));
        filetime::set_file_mtime(&path, mtime).unwrap();
        path
    }

    #[test]
    fn test_cache_path_is_deterministic() {
        let dir: TempDir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();

        let a: PathBuf = store.cache_path("b", "photos/cat.jpg", "e1");
        let b: PathBuf = store.cache_path("b", "photos/cat.jpg", "e1");
        assert_eq!(a, b);
        assert_eq!(a, dir.path().join("b/photos/cat.jpg-e1.fcache"));
    }

    #[test]
    fn test_cache_path_differs_per_etag() {
        let dir: TempDir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();

        assert_ne!(
            store.cache_path("b", "a", "e1"),
            store.cache_path("b", "a", "e2")
        );
    }

    #[test]
    fn test_walk_sorts_oldest_first_and_filters() {
        let dir: TempDir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();

        write_cache_file(dir.path(), "b/new-e.fcache", 100, 10);
        write_cache_file(dir.path(), "b/old-e.fcache", 200, 300);
        write_cache_file(dir.path(), "b/mid-e.fcache", 300, 100);
        // not a cache file; ignored
        write_cache_file(dir.path(), "b/other.partial", 400, 50);

        let (items, total_gb) = store.walk().unwrap();
        let names: Vec<String> = items
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["old-e.fcache", "mid-e.fcache", "new-e.fcache"]);
        assert!((total_gb - bytes_to_gib(600)).abs() < 1e-12);
    }

    #[test]
    fn test_remove_absent_is_ok() {
        let dir: TempDir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        store.remove(&dir.path().join("b/missing-e.fcache")).unwrap();
    }

    #[test]
    fn test_touch_promotes_mtime() {
        let dir: TempDir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let path: PathBuf = write_cache_file(dir.path(), "b/a-e.fcache", 10, 3600);

        let before: SystemTime = std::fs::metadata(&path).unwrap().modified().unwrap();
        store.touch(&path).unwrap();
        let after: SystemTime = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert!(after > before);
    }
}
