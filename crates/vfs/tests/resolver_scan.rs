//! Integration tests for the directory resolver: root bucket listing,
//! delimited prefix listings, lookup, and bucket scoping from the target
//! URL.

use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

use minfs_storage::{BucketInfo, ObjectClient, ObjectInfo, StorageError};
use minfs_vfs::{MountOptions, Resolver, ScanEntry};

/// Object store double with a fixed set of buckets and keys. Listing
/// reproduces the store's delimiter semantics: keys below the prefix are
/// folded into common-prefix entries ending in `/`.
struct ListingStore {
    buckets: Vec<&'static str>,
    keys: Vec<(&'static str, &'static str, u64)>,
}

#[async_trait]
impl ObjectClient for ListingStore {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        Ok(self
            .buckets
            .iter()
            .map(|name| BucketInfo {
                name: name.to_string(),
                creation_date: Some(SystemTime::UNIX_EPOCH),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        assert!(!recursive, "the resolver always lists non-recursively");

        let mut entries: Vec<ObjectInfo> = Vec::new();
        let mut seen_prefixes: Vec<String> = Vec::new();
        for (b, key, size) in &self.keys {
            if *b != bucket {
                continue;
            }
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if let Some(idx) = rest.find('/') {
                let common: String = format!("{prefix}{}", &rest[..=idx]);
                if !seen_prefixes.contains(&common) {
                    seen_prefixes.push(common.clone());
                    entries.push(ObjectInfo {
                        key: common,
                        size: 0,
                        etag: String::new(),
                        last_modified: None,
                    });
                }
            } else {
                entries.push(ObjectInfo {
                    key: key.to_string(),
                    size: *size,
                    etag: format!("etag-{key}"),
                    last_modified: Some(SystemTime::UNIX_EPOCH),
                });
            }
        }
        Ok(entries)
    }

    async fn stat_object(
        &self,
        _bucket: &str,
        _key: &str,
    ) -> Result<Option<ObjectInfo>, StorageError> {
        Ok(None)
    }

    async fn fetch_object_to_file(
        &self,
        _bucket: &str,
        _key: &str,
        _local_path: &Path,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

fn store() -> ListingStore {
    ListingStore {
        buckets: vec!["alpha", "beta"],
        keys: vec![
            ("alpha", "readme.txt", 100),
            ("alpha", "photos/cat.jpg", 2048),
            ("alpha", "photos/dog.jpg", 4096),
            ("beta", "dump.sql", 9000),
        ],
    }
}

#[tokio::test]
async fn test_root_lists_buckets_as_dirs() {
    let client: ListingStore = store();
    let options = MountOptions::default();
    let resolver = Resolver::new(&client, &options);

    let entries: Vec<ScanEntry> = resolver.scan("").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["alpha", "beta"]);
    for entry in &entries {
        match entry {
            ScanEntry::Dir { perm, .. } => assert_eq!(*perm, 0o770),
            ScanEntry::File { .. } => panic!("buckets must surface as directories"),
        }
    }
}

#[tokio::test]
async fn test_root_scoped_to_url_bucket() {
    let client: ListingStore = store();
    let options = MountOptions::default().with_bucket(Some("beta".into()));
    let resolver = Resolver::new(&client, &options);

    let entries: Vec<ScanEntry> = resolver.scan("").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["beta"]);
}

#[tokio::test]
async fn test_bucket_listing_mixes_files_and_prefixes() {
    let client: ListingStore = store();
    let options = MountOptions::default();
    let resolver = Resolver::new(&client, &options);

    let entries: Vec<ScanEntry> = resolver.scan("alpha").await.unwrap();

    let mut dirs: Vec<&str> = Vec::new();
    let mut files: Vec<(&str, u64)> = Vec::new();
    for entry in &entries {
        match entry {
            ScanEntry::Dir { name, perm, .. } => {
                assert_eq!(*perm, 0o555);
                dirs.push(name);
            }
            ScanEntry::File { name, size, .. } => files.push((name, *size)),
        }
    }
    assert_eq!(dirs, ["photos"]);
    assert_eq!(files, [("readme.txt", 100)]);
}

#[tokio::test]
async fn test_nested_listing_propagates_metadata() {
    let client: ListingStore = store();
    let options = MountOptions::default();
    let resolver = Resolver::new(&client, &options);

    let entries: Vec<ScanEntry> = resolver.scan("alpha/photos").await.unwrap();
    let mut names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    names.sort();
    assert_eq!(names, ["cat.jpg", "dog.jpg"]);

    for entry in entries {
        let ScanEntry::File { name, size, etag, .. } = entry else {
            panic!("expected only files under photos/");
        };
        assert!(size > 0);
        assert_eq!(etag, format!("etag-photos/{name}"));
    }
}

#[tokio::test]
async fn test_base_path_scopes_listing() {
    let client = ListingStore {
        buckets: vec!["alpha"],
        keys: vec![
            ("alpha", "base/inner/file.bin", 10),
            ("alpha", "outside.bin", 20),
        ],
    };
    let options = MountOptions::default().with_base_path("base");
    let resolver = Resolver::new(&client, &options);

    let entries: Vec<ScanEntry> = resolver.scan("alpha").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["inner"], "keys outside the base path are invisible");
}

#[tokio::test]
async fn test_lookup_finds_single_entry() {
    let client: ListingStore = store();
    let options = MountOptions::default();
    let resolver = Resolver::new(&client, &options);

    let found: Option<ScanEntry> = resolver.lookup("alpha", "readme.txt").await.unwrap();
    match found {
        Some(ScanEntry::File { size, .. }) => assert_eq!(size, 100),
        other => panic!("expected a file entry, got {other:?}"),
    }

    let dir: Option<ScanEntry> = resolver.lookup("alpha", "photos").await.unwrap();
    assert!(matches!(dir, Some(ScanEntry::Dir { .. })));

    let missing: Option<ScanEntry> = resolver.lookup("alpha", "absent").await.unwrap();
    assert!(missing.is_none());
}
