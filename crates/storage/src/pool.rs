//! Per-uid client pool.
//!
//! The mount honors the requesting user's identity: credentials may differ
//! per uid on multi-tenant mounts, so each uid gets its own lazily built
//! client. A factory that ignores the uid degenerates to a single shared
//! client behind per-uid map entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::ObjectClient;

/// Builds a client for a given uid.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Construct a client authorized for `uid`.
    async fn build(&self, uid: u32) -> Result<Arc<dyn ObjectClient>, StorageError>;
}

/// Lazy map from uid to object client.
///
/// The map lock is held only for lookups and inserts, never across client
/// construction. Two racing first requests for the same uid may both build
/// a client; the first insert wins and the loser's client is dropped.
pub struct ClientPool {
    factory: Arc<dyn ClientFactory>,
    clients: Mutex<HashMap<u32, Arc<dyn ObjectClient>>>,
}

impl ClientPool {
    /// Create a pool around a client factory.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Return the client for `uid`, constructing it on first use.
    pub async fn client_for(&self, uid: u32) -> Result<Arc<dyn ObjectClient>, StorageError> {
        if let Some(client) = self.clients.lock().unwrap().get(&uid) {
            return Ok(Arc::clone(client));
        }

        tracing::debug!(uid, "building object client");
        let built: Arc<dyn ObjectClient> = self.factory.build(uid).await?;

        let mut clients = self.clients.lock().unwrap();
        let client: &Arc<dyn ObjectClient> = clients.entry(uid).or_insert(built);
        Ok(Arc::clone(client))
    }

    /// Number of constructed clients, for observability.
    pub fn len(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    /// Check whether no client has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.clients.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::traits::{BucketInfo, ObjectInfo};

    struct NullClient;

    #[async_trait]
    impl ObjectClient for NullClient {
        async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
            Ok(Vec::new())
        }

        async fn list_objects(
            &self,
            _bucket: &str,
            _prefix: &str,
            _recursive: bool,
        ) -> Result<Vec<ObjectInfo>, StorageError> {
            Ok(Vec::new())
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

    struct CountingFactory {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl ClientFactory for CountingFactory {
        async fn build(&self, _uid: u32) -> Result<Arc<dyn ObjectClient>, StorageError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullClient))
        }
    }

    #[tokio::test]
    async fn test_client_built_once_per_uid() {
        let factory = Arc::new(CountingFactory {
            builds: AtomicUsize::new(0),
        });
        let pool = ClientPool::new(factory.clone());

        pool.client_for(1000).await.unwrap();
        pool.client_for(1000).await.unwrap();
        pool.client_for(1001).await.unwrap();

        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
        assert_eq!(pool.len(), 2);
    }

    struct FailingFactory;

    #[async_trait]
    impl ClientFactory for FailingFactory {
        async fn build(&self, _uid: u32) -> Result<Arc<dyn ObjectClient>, StorageError> {
            Err(StorageError::InvalidConfig {
                message: "no credentials".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_build_not_cached() {
        let pool = ClientPool::new(Arc::new(FailingFactory));
        assert!(pool.client_for(0).await.is_err());
        assert!(pool.is_empty());
    }
}
