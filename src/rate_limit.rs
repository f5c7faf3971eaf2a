// ABOUTME: Multi-window rate limiting for OTP issuance
// ABOUTME: Enforces account locks, spam locks, and resend cooldowns with store-backed counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! # OTP Rate Limiter
//!
//! Guards the OTP request path with three identity-wide controls:
//!
//! 1. an account lock, set by the OTP engine after repeated failed
//!    verifications,
//! 2. a spam lock, set here when the request counter crosses its limit,
//! 3. a resend cooldown between consecutive requests.
//!
//! Checks run in that priority order and short-circuit on the first hit, so
//! a locked account always reports the lock rather than a cooldown. All state
//! lives in the shared store; with a Redis backend the limits hold across
//! instances.

use crate::config::environment::OtpPolicyConfig;
use crate::constants::keys;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::store::SharedStore;
use std::time::Duration;

/// Store-backed rate limiter for OTP issuance
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedStore,
    policy: OtpPolicyConfig,
}

impl RateLimiter {
    /// Create a new rate limiter over the given store backend
    #[must_use]
    pub fn new(store: SharedStore, policy: OtpPolicyConfig) -> Self {
        Self { store, policy }
    }

    /// Check all restrictions for an identity, in lock-priority order.
    ///
    /// # Errors
    ///
    /// - [`AppError::account_locked`] while the account lock is live
    /// - [`AppError::rate_limit_exceeded`] while the spam lock or cooldown
    ///   is live
    /// - storage errors from the backend
    pub async fn check_restrictions(&self, email: &str) -> AppResult<()> {
        if self.store.exists(&keys::otp_lock(email)).await? {
            let retry_after = self
                .retry_after(&keys::otp_lock(email), self.policy.account_lock_secs)
                .await?;
            return Err(AppError::account_locked(
                "Account locked due to multiple failed attempts! Try again later.",
                retry_after,
            ));
        }

        if self.store.exists(&keys::otp_spam_lock(email)).await? {
            let retry_after = self
                .retry_after(&keys::otp_spam_lock(email), self.policy.spam_lock_secs)
                .await?;
            return Err(AppError::rate_limit_exceeded(
                "Too many OTP requests! Please wait before requesting again.",
                retry_after,
            ));
        }

        if self.store.exists(&keys::otp_cooldown(email)).await? {
            let retry_after = self
                .retry_after(&keys::otp_cooldown(email), self.policy.cooldown_secs)
                .await?;
            return Err(AppError::rate_limit_exceeded(
                "Please wait before requesting a new OTP!",
                retry_after,
            ));
        }

        Ok(())
    }

    /// Count an OTP request and convert overflow into a spam lock.
    ///
    /// The counter is incremented atomically; the window is anchored at the
    /// first request and later requests never extend it. Crossing the limit
    /// installs the spam lock and rejects the request that crossed it.
    ///
    /// # Errors
    ///
    /// - [`AppError::rate_limit_exceeded`] when this request exceeds the
    ///   resend limit
    /// - storage errors from the backend
    pub async fn track_request(&self, email: &str) -> AppResult<()> {
        let count = self
            .store
            .incr_with_window(
                &keys::otp_request_count(email),
                Duration::from_secs(self.policy.request_window_secs),
            )
            .await?;

        if count > self.policy.resend_limit {
            self.store
                .set_ex(
                    &keys::otp_spam_lock(email),
                    "locked",
                    Duration::from_secs(self.policy.spam_lock_secs),
                )
                .await?;

            AppLogger::log_security_event(
                "otp_spam_lock",
                "medium",
                "OTP request limit exceeded",
                Some(email),
            );

            return Err(AppError::rate_limit_exceeded(
                "Too many OTP requests! Please wait before requesting again.",
                self.policy.spam_lock_secs as i64,
            ));
        }

        Ok(())
    }

    /// Start the resend cooldown after a code has been sent
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails
    pub async fn start_cooldown(&self, email: &str) -> AppResult<()> {
        self.store
            .set_ex(
                &keys::otp_cooldown(email),
                "true",
                Duration::from_secs(self.policy.cooldown_secs),
            )
            .await
    }

    /// Remaining TTL of a restriction key, with a fallback for backends
    /// that lose TTL information
    async fn retry_after(&self, key: &str, fallback_secs: u64) -> AppResult<i64> {
        Ok(self
            .store
            .ttl(key)
            .await?
            .map_or(fallback_secs as i64, |d| d.as_secs() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreConfig;
    use std::sync::Arc;

    fn limiter_with_policy(policy: OtpPolicyConfig) -> RateLimiter {
        let store = Arc::new(MemoryStore::new(&StoreConfig {
            enable_background_cleanup: false,
            ..Default::default()
        }));
        RateLimiter::new(store, policy)
    }

    fn test_limiter() -> RateLimiter {
        limiter_with_policy(OtpPolicyConfig::default())
    }

    #[tokio::test]
    async fn test_clean_identity_passes() {
        let limiter = test_limiter();
        limiter.check_restrictions("a@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_cooldown_blocks_until_expiry() {
        let limiter = limiter_with_policy(OtpPolicyConfig {
            cooldown_secs: 1,
            ..Default::default()
        });

        limiter.start_cooldown("a@example.com").await.unwrap();
        let err = limiter
            .check_restrictions("a@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);
        assert!(err.message.contains("wait before requesting a new OTP"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.check_restrictions("a@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_request_limit_installs_spam_lock() {
        let limiter = limiter_with_policy(OtpPolicyConfig {
            resend_limit: 2,
            ..Default::default()
        });

        limiter.track_request("a@example.com").await.unwrap();
        limiter.track_request("a@example.com").await.unwrap();

        // Third request crosses the limit
        let err = limiter.track_request("a@example.com").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);

        // And the spam lock now blocks the check path too
        let err = limiter
            .check_restrictions("a@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);
        assert!(err.message.contains("Too many OTP requests"));
    }

    #[tokio::test]
    async fn test_account_lock_outranks_spam_lock_and_cooldown() {
        let limiter = test_limiter();
        let store = limiter.store.clone();

        // Install all three restrictions
        store
            .set_ex(
                &keys::otp_lock("a@example.com"),
                "locked",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        store
            .set_ex(
                &keys::otp_spam_lock("a@example.com"),
                "locked",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        limiter.start_cooldown("a@example.com").await.unwrap();

        let err = limiter
            .check_restrictions("a@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountLocked);
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let limiter = limiter_with_policy(OtpPolicyConfig {
            resend_limit: 1,
            ..Default::default()
        });

        limiter.track_request("a@example.com").await.unwrap();
        let err = limiter.track_request("a@example.com").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);

        // A different identity is unaffected
        limiter.track_request("b@example.com").await.unwrap();
        limiter.check_restrictions("b@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_after_reported_in_details() {
        let limiter = test_limiter();
        limiter.start_cooldown("a@example.com").await.unwrap();

        let err = limiter
            .check_restrictions("a@example.com")
            .await
            .unwrap_err();
        let retry = err.context.details.get("retry_after_secs").unwrap();
        assert!(retry.as_i64().unwrap() <= 60);
    }
}
