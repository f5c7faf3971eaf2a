// ABOUTME: In-memory store implementation with LRU eviction and TTL support
// ABOUTME: Includes background cleanup task for expired entries; suitable for single-instance and tests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use super::{KeyValueStore, StoreConfig};
use crate::errors::{AppError, AppResult};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// In-memory store entry with expiration
#[derive(Debug, Clone)]
struct StoreEntry {
    value: String,
    expires_at: Instant,
}

impl StoreEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}

/// In-memory store with LRU eviction and background cleanup
///
/// Uses `Arc<RwLock<LruCache>>` for shared state between store operations and
/// the background cleanup task. Counter increments take the write lock for
/// the whole read-modify-write, which makes them atomic within the process.
/// State is process-local, so this backend is only correct for
/// single-instance deployments and tests.
#[derive(Clone)]
pub struct MemoryStore {
    store: Arc<RwLock<LruCache<String, StoreEntry>>>,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl MemoryStore {
    /// Default capacity when config specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create new in-memory store with optional background cleanup task
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        // LruCache requires NonZeroUsize for capacity
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);

        let store = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let store_clone = store.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&store_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Store cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self { store, shutdown_tx }
    }

    /// Remove all expired entries
    async fn cleanup_expired(store: &Arc<RwLock<LruCache<String, StoreEntry>>>) {
        let mut store_guard = store.write().await;

        // Collect expired keys first (can't modify while iterating)
        let expired_keys: Vec<String> = store_guard
            .iter()
            .filter_map(|(k, v)| {
                if v.is_expired() {
                    Some(k.clone())
                } else {
                    None
                }
            })
            .collect();

        for key in &expired_keys {
            store_guard.pop(key);
        }

        let removed = expired_keys.len();
        drop(store_guard);
        if removed > 0 {
            tracing::debug!("Cleaned up {} expired store entries", removed);
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut store = self.store.write().await;

        // LruCache::get is mutable (updates access order)
        if let Some(entry) = store.get(key) {
            if entry.is_expired() {
                store.pop(key);
                drop(store);
                return Ok(None);
            }

            let value = entry.value.clone();
            drop(store);
            return Ok(Some(value));
        }
        drop(store);

        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = StoreEntry::new(value.to_owned(), ttl);

        // LruCache handles eviction automatically on push
        self.store.write().await.push(key.to_owned(), entry);

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.store.write().await.pop(key);
        Ok(())
    }

    async fn incr_with_window(&self, key: &str, window: Duration) -> AppResult<u64> {
        let mut store = self.store.write().await;

        // Holding the write lock for the full read-modify-write keeps the
        // increment atomic. An expired counter restarts at 1 with a fresh
        // window; a live counter keeps its original expiry.
        let current = store.get(key).filter(|entry| !entry.is_expired()).cloned();

        let (count, entry) = match current {
            Some(entry) => {
                let count = entry
                    .value
                    .parse::<u64>()
                    .map_err(|e| {
                        AppError::storage(format!("counter key '{key}' holds non-numeric value"))
                            .with_source(e)
                    })?
                    .saturating_add(1);
                let updated = StoreEntry {
                    value: count.to_string(),
                    expires_at: entry.expires_at,
                };
                (count, updated)
            }
            None => (1, StoreEntry::new("1".to_owned(), window)),
        };

        store.push(key.to_owned(), entry);
        drop(store);

        Ok(count)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;

        if let Some(entry) = store.get(key) {
            if entry.is_expired() {
                store.pop(key);
                drop(store);
                return Ok(false);
            }
            drop(store);
            return Ok(true);
        }
        drop(store);

        Ok(false)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let store = self.store.write().await;

        // peek avoids updating LRU order
        if let Some(entry) = store.peek(key) {
            if entry.is_expired() {
                return Ok(None);
            }
            let ttl = entry.remaining_ttl();
            drop(store);
            return Ok(ttl);
        }

        Ok(None)
    }

    async fn health_check(&self) -> AppResult<()> {
        // In-memory store is always healthy
        Ok(())
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        // Signal the background cleanup task to shut down. The task exits
        // when all senders are dropped, so a send failure here is expected
        // if the channel is already closed.
        if let Some(tx) = &self.shutdown_tx {
            if let Err(e) = tx.try_send(()) {
                tracing::debug!(error = ?e, "Store shutdown signal send failed (channel likely closed)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> MemoryStore {
        MemoryStore::new(&StoreConfig {
            enable_background_cleanup: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = test_store();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_owned()));
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_missing() {
        let store = test_store();
        store
            .set_ex("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_incr_starts_at_one_and_counts_up() {
        let store = test_store();
        let window = Duration::from_secs(60);
        assert_eq!(store.incr_with_window("c", window).await.unwrap(), 1);
        assert_eq!(store.incr_with_window("c", window).await.unwrap(), 2);
        assert_eq!(store.incr_with_window("c", window).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_incr_keeps_original_window() {
        let store = test_store();
        let window = Duration::from_secs(60);
        store.incr_with_window("c", window).await.unwrap();
        let first_ttl = store.ttl("c").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.incr_with_window("c", window).await.unwrap();
        let second_ttl = store.ttl("c").await.unwrap().unwrap();

        // Later increments must not extend the window
        assert!(second_ttl <= first_ttl);
    }

    #[tokio::test]
    async fn test_incr_restarts_after_window_expires() {
        let store = test_store();
        let window = Duration::from_millis(10);
        store.incr_with_window("c", window).await.unwrap();
        store.incr_with_window("c", window).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            store
                .incr_with_window("c", Duration::from_secs(60))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_nothing() {
        let store = Arc::new(test_store());
        let window = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.incr_with_window("c", window).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store.get("c").await.unwrap().as_deref(),
            Some("20"),
            "all increments must be observed"
        );
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = test_store();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        // Deleting again is not an error
        store.delete("k").await.unwrap();
    }
}
