//! Quota-driven background eviction.
//!
//! A periodic task walks the cache, and while the total size exceeds the
//! quota deletes unused files oldest-mtime first. Modification time
//! approximates LRU: warm opens promote their file by touching it, so the
//! oldest mtime is the least recently served.

use std::sync::Arc;
use std::time::Duration;

use crate::handles::HandleRegistry;
use crate::keyed_mutex::KeyedMutex;
use crate::store::{CacheItem, CacheStore};

/// Default interval between evictor ticks.
pub const DEFAULT_EVICTOR_INTERVAL: Duration = Duration::from_secs(30);

/// Evictor tuning.
#[derive(Debug, Clone)]
pub struct EvictorConfig {
    /// Cache size ceiling in GiB. `0.0` disables deletion; the monitor
    /// still runs and logs cache size.
    pub quota_gb: f64,
    /// Time between ticks.
    pub interval: Duration,
}

impl Default for EvictorConfig {
    fn default() -> Self {
        Self {
            quota_gb: 0.0,
            interval: DEFAULT_EVICTOR_INTERVAL,
        }
    }
}

/// Background cache evictor.
///
/// Owns no cache state; every tick operates on a fresh walk snapshot. For
/// each candidate it takes the keyed lock on the cache path *before*
/// consulting the handle registry, which is what makes the check-then-delete
/// race-free against concurrent opens.
pub struct Evictor {
    store: Arc<CacheStore>,
    registry: Arc<HandleRegistry>,
    keyed: Arc<KeyedMutex>,
    config: EvictorConfig,
}

impl Evictor {
    pub fn new(
        store: Arc<CacheStore>,
        registry: Arc<HandleRegistry>,
        keyed: Arc<KeyedMutex>,
        config: EvictorConfig,
    ) -> Self {
        Self {
            store,
            registry,
            keyed,
            config,
        }
    }

    /// Run the monitor loop. Never returns; terminated with the process.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            quota_gb = self.config.quota_gb,
            interval_secs = self.config.interval.as_secs(),
            "starting cache monitor"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick of an interval fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One monitor pass. Exposed separately so tests can drive it.
    pub async fn tick(&self) {
        let (items, total_gb) = match self.store.walk() {
            Ok(walked) => walked,
            Err(err) => {
                // Directory in flux; try again next tick.
                tracing::warn!(error = %err, "cache walk failed; skipping tick");
                return;
            }
        };

        if self.config.quota_gb == 0.0 {
            tracing::debug!(
                files = items.len(),
                size_gb = total_gb,
                "cache monitor pass (eviction disabled)"
            );
            return;
        }

        if total_gb <= self.config.quota_gb {
            tracing::debug!(files = items.len(), size_gb = total_gb, "cache ok");
            return;
        }

        tracing::info!(
            files = items.len(),
            size_gb = total_gb,
            quota_gb = self.config.quota_gb,
            open_handles = self.registry.count(),
            "cache over quota; evicting"
        );
        self.delete_until(items, total_gb - self.config.quota_gb)
            .await;
    }

    /// Delete unused items oldest-first until `overage_gb` is paid off.
    ///
    /// An in-use item is skipped; its size still counts against the quota
    /// for this tick and the next tick re-evaluates it.
    async fn delete_until(&self, items: Vec<CacheItem>, mut overage_gb: f64) {
        for item in items {
            let key: String = item.path.to_string_lossy().into_owned();
            let _guard = self.keyed.lock(&key).await;

            if self.registry.is_in_use(&item.path) {
                tracing::debug!(path = %item.path.display(), "cache file in use; skipping");
                continue;
            }

            match self.store.remove(&item.path) {
                Ok(()) => {
                    overage_gb -= item.size_gb;
                    tracing::info!(
                        path = %item.path.display(),
                        size_gb = item.size_gb,
                        "evicted cache file"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        path = %item.path.display(),
                        error = %err,
                        "failed to evict cache file; skipping"
                    );
                    continue;
                }
            }

            if overage_gb < 0.0 {
                break;
            }
        }
    }
}
