// ABOUTME: Key-value store abstraction backing OTP state and rate-limit counters
// ABOUTME: Pluggable backend support (in-memory, Redis) injected into the services that need it
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

/// In-memory store implementation
pub mod memory;
/// Redis store implementation
pub mod redis;

use crate::config::environment::RedisConnectionConfig;
use crate::errors::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a store backend.
///
/// Services hold this instead of a concrete backend so tests can swap in
/// [`memory::MemoryStore`] while production uses [`redis::RedisStore`].
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Key-value store trait for pluggable backend implementations.
///
/// All values are strings; callers that need counters use
/// [`KeyValueStore::incr_with_window`], which the backend must implement
/// atomically. Expiration is mandatory on every write so abandoned flows
/// clean themselves up.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, `None` if missing or expired
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a value with a TTL in one atomic operation
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Remove a single entry; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Atomically increment a counter and return the new value.
    ///
    /// The expiry is applied only when the increment creates the key, so the
    /// window is anchored at the first request and is never extended by
    /// later increments.
    ///
    /// # Errors
    ///
    /// Returns an error if the increment fails
    async fn incr_with_window(&self, key: &str, window: Duration) -> AppResult<u64>;

    /// Check if a key exists and has not expired
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Get remaining TTL for a key, `None` if missing or without expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the TTL lookup fails
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy
    async fn health_check(&self) -> AppResult<()>;
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL; `None` selects the in-memory backend
    pub redis_url: Option<String>,
    /// Maximum number of entries (for the in-memory store)
    pub max_entries: usize,
    /// Cleanup interval for expired entries (in-memory store)
    pub cleanup_interval: Duration,
    /// Enable background cleanup task (disable in tests to avoid runtime conflicts)
    pub enable_background_cleanup: bool,
    /// Redis connection and retry configuration
    pub redis_connection: RedisConnectionConfig,
}

impl StoreConfig {
    /// Build a store configuration from the environment-derived settings
    #[must_use]
    pub fn from_settings(settings: &crate::config::environment::StoreSettings) -> Self {
        Self {
            redis_url: settings.redis_url.clone(),
            max_entries: settings.max_entries,
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            enable_background_cleanup: true,
            redis_connection: settings.redis_connection.clone(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: 100_000,
            cleanup_interval: Duration::from_secs(60),
            enable_background_cleanup: true,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

/// Build a store backend from configuration.
///
/// Selects Redis when a URL is configured, otherwise the bounded in-memory
/// store. Single-instance deployments can run without Redis; anything
/// load-balanced needs the shared backend so rate-limit state is visible to
/// every instance.
///
/// # Errors
///
/// Returns an error if the Redis connection cannot be established
pub async fn from_config(config: &StoreConfig) -> AppResult<SharedStore> {
    if config.redis_url.is_some() {
        let store = redis::RedisStore::new(config).await?;
        Ok(Arc::new(store))
    } else {
        tracing::warn!("no REDIS_URL configured, using in-memory store (single instance only)");
        Ok(Arc::new(memory::MemoryStore::new(config)))
    }
}
