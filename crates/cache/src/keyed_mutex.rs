//! Mutual exclusion keyed by arbitrary strings.
//!
//! The key domain is cache paths: concurrent opens of the same object
//! serialize on its cache path while opens of distinct objects proceed in
//! parallel. The key domain is unbounded, so per-key records are dropped as
//! soon as the last holder releases and no waiter remains.
//!
//! Fairness is not guaranteed; the workload is low-contention per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

struct KeyEntry {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Holders plus waiters. The entry is removed exactly when this
    /// reaches zero.
    refs: usize,
}

#[derive(Default)]
struct KeyTable {
    entries: Mutex<HashMap<String, KeyEntry>>,
}

impl KeyTable {
    fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(key);
            }
        }
    }
}

/// A mutex whose exclusion domain is a string key.
///
/// `lock` returns a [`KeyedGuard`]; dropping the guard releases the key.
/// Guard semantics make double-release unrepresentable.
#[derive(Default)]
pub struct KeyedMutex {
    table: Arc<KeyTable>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive ownership of `key`, waiting for any current holder.
    ///
    /// Holders of distinct keys never serialize on each other. The inner
    /// lock is acquired outside the table lock, so a long hold on one key
    /// cannot block acquisition of another.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let lock: Arc<tokio::sync::Mutex<()>> = {
            let mut entries = self.table.entries.lock().unwrap();
            let entry: &mut KeyEntry =
                entries.entry(key.to_string()).or_insert_with(|| KeyEntry {
                    lock: Arc::new(tokio::sync::Mutex::new(())),
                    refs: 0,
                });
            entry.refs += 1;
            Arc::clone(&entry.lock)
        };

        let guard: OwnedMutexGuard<()> = lock.lock_owned().await;

        KeyedGuard {
            table: Arc::clone(&self.table),
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of live per-key records, for observability and tests.
    pub fn len(&self) -> usize {
        self.table.entries.lock().unwrap().len()
    }

    /// Check whether no key record is live.
    pub fn is_empty(&self) -> bool {
        self.table.entries.lock().unwrap().is_empty()
    }
}

/// Exclusive ownership of one key. Released on drop.
pub struct KeyedGuard {
    table: Arc<KeyTable>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release the inner lock before decrementing the refcount so a
        // waiter never observes the record disappearing under it.
        drop(self.guard.take());
        self.table.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_excludes() {
        let km = Arc::new(KeyedMutex::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let km = Arc::clone(&km);
            let in_section = Arc::clone(&in_section);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _guard = km.lock("shared").await;
                let now: usize = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_serialize() {
        let km = KeyedMutex::new();

        let guard_a = km.lock("a").await;
        // Must not block even though "a" is held.
        let guard_b = tokio::time::timeout(Duration::from_secs(1), km.lock("b"))
            .await
            .expect("lock on a distinct key blocked");

        drop(guard_a);
        drop(guard_b);
    }

    #[tokio::test]
    async fn test_records_dropped_after_release() {
        let km = Arc::new(KeyedMutex::new());

        {
            let _g1 = km.lock("x").await;
            assert_eq!(km.len(), 1);
        }
        assert!(km.is_empty());

        // A waiter keeps the record alive until it too releases.
        let g = km.lock("y").await;
        let km2 = Arc::clone(&km);
        let waiter = tokio::spawn(async move {
            let _g = km2.lock("y").await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(km.len(), 1);
        drop(g);
        waiter.await.unwrap();
        assert!(km.is_empty());
    }

    #[tokio::test]
    async fn test_guard_reports_key() {
        let km = KeyedMutex::new();
        let guard = km.lock("some/cache/path").await;
        assert_eq!(guard.key(), "some/cache/path");
    }
}
