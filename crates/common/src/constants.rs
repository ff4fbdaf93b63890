//! Shared constants used across minfs crates.

/// Suffix appended to every file in the on-disk cache.
/// The full name is `<objectKey>-<etag>.fcache`.
pub const CACHE_FILE_SUFFIX: &str = ".fcache";

/// Bytes in one gibibyte. Cache quota accounting is done in GiB.
pub const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

/// Environment variable supplying the access key when no credential
/// provider chain is configured.
pub const ENV_ACCESS_KEY: &str = "MINIO_ACCESS_KEY";

/// Environment variable supplying the secret key.
pub const ENV_SECRET_KEY: &str = "MINIO_SECRET_KEY";

/// Environment variable supplying an optional session token.
pub const ENV_SECRET_TOKEN: &str = "MINFS_SECRET_TOKEN";

/// Default permission bits for files surfaced through the mount.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits for bucket directories at the mount root.
pub const BUCKET_DIR_MODE: u32 = 0o770;

/// Permission bits for directories synthesized from common prefixes.
pub const PREFIX_DIR_MODE: u32 = 0o555;
