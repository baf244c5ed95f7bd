//! Keyed mutual-exclusion maps for per-user and per-(user, data_type)
//! coalescing (§5).
//!
//! A parent `dashmap` guards only insert/remove of the per-key mutex;
//! contention on a single key is handled by that key's own `tokio::sync::Mutex`,
//! so unrelated keys never block each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::DataType;

#[derive(Default)]
pub struct KeyedLocks<K: std::hash::Hash + Eq + Clone> {
    inner: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: std::hash::Hash + Eq + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    fn entry(&self, key: K) -> Arc<Mutex<()>> {
        self.inner.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquires the lock for `key`, running `f` while held, then releases it.
    /// The map entry is left in place for reuse rather than removed on every
    /// release — a bounded number of users/types makes this cheap to keep.
    pub async fn with_lock<F, Fut, T>(&self, key: K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let mutex = self.entry(key);
        let _guard = mutex.lock().await;
        f().await
    }
}

pub type TokenRefreshLocks = KeyedLocks<Uuid>;
pub type SyncLocks = KeyedLocks<(Uuid, DataType)>;
