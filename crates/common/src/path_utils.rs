//! Path helpers for the mount tree.
//!
//! Paths inside the mount are always relative, `/`-separated, and never
//! begin or end with a slash. The empty string is the mount root. The first
//! segment of a non-empty path names the bucket; the remainder is an object
//! key or key prefix within it.

/// Split a mount path into `(bucket, remainder)`.
///
/// The remainder is empty when the path names the bucket itself.
/// Returns `None` for the root path.
///
/// # Arguments
/// * `path` - Mount-relative path, e.g. `"b/photos/cat.jpg"`
pub fn split_mount_path(path: &str) -> Option<(&str, &str)> {
    let trimmed: &str = path.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once('/') {
        Some((bucket, rest)) => Some((bucket, rest)),
        None => Some((trimmed, "")),
    }
}

/// Build the object-store listing prefix for a directory.
///
/// Joins the configured base path with the in-bucket directory path and
/// appends a trailing `/` when the result is non-empty, which is what a
/// delimited listing expects.
///
/// # Arguments
/// * `base_path` - Base path from the target URL (may be empty)
/// * `dir_path` - In-bucket directory path (may be empty)
pub fn listing_prefix(base_path: &str, dir_path: &str) -> String {
    let joined: String = join_segments(base_path, dir_path);
    if joined.is_empty() {
        joined
    } else {
        format!("{joined}/")
    }
}

/// Build the full object key for a file inside the bucket.
///
/// # Arguments
/// * `base_path` - Base path from the target URL (may be empty)
/// * `rel` - In-bucket file path
pub fn object_path(base_path: &str, rel: &str) -> String {
    join_segments(base_path, rel)
}

/// Extract the entry name from a listed object key.
///
/// Strips the listing prefix and, for common-prefix entries, the trailing
/// `/`. Returns `None` when the key does not extend the prefix (the object
/// store echoes the prefix itself for zero-byte directory markers).
///
/// # Arguments
/// * `key` - Object key as returned by the listing
/// * `prefix` - The prefix the listing was issued with
pub fn entry_name<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let rest: &str = key.strip_prefix(prefix)?;
    let name: &str = rest.strip_suffix('/').unwrap_or(rest);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn join_segments(a: &str, b: &str) -> String {
    let a: &str = a.trim_matches('/');
    let b: &str = b.trim_matches('/');
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (true, false) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{a}/{b}"),
    }
}
