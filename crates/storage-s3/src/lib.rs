//! AWS SDK S3 backend for minfs.
//!
//! This crate provides an `ObjectClient` implementation using the AWS SDK
//! for Rust, pointed at any S3-compatible endpoint (MinIO, AWS, Ceph RGW)
//! via `endpoint_url` with path-style addressing.
//!
//! # Example
//!
//! ```ignore
//! use minfs_storage::StorageSettings;
//! use minfs_storage_s3::S3ObjectClient;
//!
//! let settings = StorageSettings::new("https://play.min.io:9000");
//! let client = S3ObjectClient::new(settings).await?;
//! let buckets = client.list_buckets().await?;
//! ```

mod client;

pub use client::S3ObjectClient;
