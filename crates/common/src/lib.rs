//! Shared types and utilities for minfs.
//!
//! This crate provides common functionality used across all minfs crates:
//! - Cache-file naming constants
//! - Byte/gigabyte conversion helpers
//! - Object-key path helpers for the mount tree

pub mod constants;
pub mod path_utils;
pub mod units;

// Re-export commonly used items at crate root
pub use constants::*;
pub use path_utils::{entry_name, listing_prefix, object_path, split_mount_path};
pub use units::bytes_to_gib;
