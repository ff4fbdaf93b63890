//! FUSE filesystem over an S3-compatible object store.
//!
//! Applications issue ordinary path-based file operations against the
//! mountpoint; this crate translates them into object-store requests and
//! serves file contents from the persistent on-disk cache in `minfs-cache`.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE dispatch (fuser::Filesystem impl, sync, bridged via Handle)
//! Layer 2: Resolver (listings/lookup) + open workflow (cache population)
//! Layer 1: minfs-cache (keyed mutex, store, registry, evictor)
//!          minfs-storage (per-uid client pool)
//! ```
//!
//! The filesystem is intentionally not POSIX-conformant; it targets
//! read-mostly workloads. Directory mutation is refused with `EPERM`.

pub mod error;
mod file;
mod fs;
mod nodes;
mod options;
mod resolver;

pub use error::VfsError;
pub use file::{open_file, OpenFile};
pub use fs::{mount, spawn_mount, MinFs, MountContext};
pub use nodes::{Node, NodeAttr, NodeKind, NodeTable, ROOT_INO};
pub use options::MountOptions;
pub use resolver::{Resolver, ScanEntry};
