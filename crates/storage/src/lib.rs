//! Object-store abstraction for minfs.
//!
//! This crate defines the thin client facade the filesystem layers consume:
//!
//! - **`ObjectClient`** - the four operations minfs needs from an
//!   S3-compatible store (list buckets, list objects, stat object, fetch
//!   object to a local file)
//! - **`ClientPool`** - a per-uid pool of lazily constructed clients, so a
//!   multi-tenant mount can honor the requesting user's credentials
//!
//! Concrete backends live in their own crates (`minfs-storage-s3` for the
//! AWS SDK implementation). Tests substitute mock clients through the same
//! trait.

mod error;
mod pool;
mod traits;
mod types;

pub use error::StorageError;
pub use pool::{ClientFactory, ClientPool};
pub use traits::{BucketInfo, ObjectClient, ObjectInfo};
pub use types::{Credentials, StorageSettings};
