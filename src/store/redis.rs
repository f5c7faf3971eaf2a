// ABOUTME: Redis store implementation with connection pooling and TTL support
// ABOUTME: Shared backend for multi-instance deployments so rate-limit state is global
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use super::{KeyValueStore, StoreConfig};
use crate::config::environment::RedisConnectionConfig;
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis store implementation with connection pooling
///
/// Uses Redis `ConnectionManager` for automatic reconnection. Counter
/// increments rely on Redis `INCR`, which is atomic server-side, so
/// concurrent requests from multiple instances never lose updates.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Create new Redis store instance
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis connection fails after all retries
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for the Redis store backend"))?;

        let conn_config = &config.redis_connection;

        info!(
            "Connecting to Redis at {} (timeout={}s, response_timeout={}s, retries={})",
            redis_url,
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::internal(format!("Failed to create Redis client: {e}")))?;

        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");

        Ok(Self { manager })
    }

    /// Connect to Redis with exponential backoff retry on failure
    ///
    /// Uses `ConnectionManagerConfig` to configure timeouts and reconnection behavior.
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_exponent_base(conn_config.retry_exponent_base)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let initial_delay_ms = conn_config.initial_retry_delay_ms;
        let max_delay_ms = conn_config.max_retry_delay_ms;

        let mut last_error = None;
        let mut delay_ms = initial_delay_ms;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            last_error
                                .as_ref()
                                .map_or_else(|| "unknown".to_owned(), ToString::to_string)
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        // Exponential backoff with cap
                        delay_ms = (delay_ms * 2).min(max_delay_ms);
                    }
                }
            }
        }

        // All retries exhausted
        Err(AppError::internal(format!(
            "Failed to connect to Redis after {} retries: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();

        let value: Option<String> = conn.get(key).await.map_err(|e| {
            error!("Redis GET operation failed: {}", e);
            AppError::storage(format!("Store error: {e}"))
        })?;

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();

        // SETEX sets value and expiration in one atomic operation
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| {
                error!("Redis SET operation failed: {}", e);
                AppError::storage(format!("Store error: {e}"))
            })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let _: () = conn.del(key).await.map_err(|e| {
            error!("Redis DEL operation failed: {}", e);
            AppError::storage(format!("Store error: {e}"))
        })?;

        Ok(())
    }

    async fn incr_with_window(&self, key: &str, window: Duration) -> AppResult<u64> {
        let mut conn = self.manager.clone();

        let count: u64 = conn.incr(key, 1u64).await.map_err(|e| {
            error!("Redis INCR operation failed: {}", e);
            AppError::storage(format!("Store error: {e}"))
        })?;

        // Only the request that created the key sets the window, so the
        // expiry is anchored at the first increment.
        if count == 1 {
            let _: () = conn.expire(key, window.as_secs() as i64).await.map_err(|e| {
                error!("Redis EXPIRE operation failed: {}", e);
                AppError::storage(format!("Store error: {e}"))
            })?;
        }

        Ok(count)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();

        let exists: bool = conn.exists(key).await.map_err(|e| {
            error!("Redis EXISTS operation failed: {}", e);
            AppError::storage(format!("Store error: {e}"))
        })?;

        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut conn = self.manager.clone();

        let ttl_secs: i64 = conn.ttl(key).await.map_err(|e| {
            error!("Redis TTL operation failed: {}", e);
            AppError::storage(format!("Store error: {e}"))
        })?;

        // Redis returns -2 if key doesn't exist, -1 if key has no expiration
        match ttl_secs {
            -2 | -1 => Ok(None),
            #[allow(clippy::cast_sign_loss)] // Validated: secs > 0 before cast
            secs if secs > 0 => Ok(Some(Duration::from_secs(secs as u64))),
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        // PING verifies the connection is alive
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING failed: {}", e);
                AppError::storage(format!("Store error: {e}"))
            })?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Store error: unexpected PING response '{response}'"
            )))
        }
    }
}
