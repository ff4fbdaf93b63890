//! Persistent on-disk cache for object contents.
//!
//! Cache files live under a configured directory as
//! `<bucket>/<objectKey>-<etag>.fcache`. The etag in the name means a
//! content-version change lands in a fresh file; stale versions linger until
//! the evictor reclaims them. The cache survives process restarts - there is
//! no in-memory owner of its contents.
//!
//! # Cache safety protocol
//!
//! Three pieces cooperate so that a cache file referenced by a live handle
//! is never deleted, and concurrent opens of one object share one download:
//!
//! - [`KeyedMutex`] - per-cache-path mutual exclusion. Unrelated paths never
//!   contend.
//! - [`HandleRegistry`] - which cache paths currently back an open handle.
//! - [`Evictor`] - periodic quota enforcement, oldest-mtime first.
//!
//! Both the opener and the evictor take the keyed lock for a path *before*
//! consulting the registry or touching the file. Once an opener holds the
//! key the evictor must wait; by the time it enters, the registry already
//! shows the handle.

mod error;
mod evictor;
mod handles;
mod keyed_mutex;
mod store;

pub use error::CacheError;
pub use evictor::{Evictor, EvictorConfig, DEFAULT_EVICTOR_INTERVAL};
pub use handles::{HandleId, HandleRegistry};
pub use keyed_mutex::{KeyedGuard, KeyedMutex};
pub use store::{CacheItem, CacheStore};
