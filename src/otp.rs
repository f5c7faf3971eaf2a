// ABOUTME: OTP engine covering code generation, keyed hashing, verification, and attempt lockout
// ABOUTME: Codes are stored only as keyed SHA-256 hashes and compared in constant time
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! # OTP Engine
//!
//! One-time passcode lifecycle for registration and password-reset flows.
//! A code is a 4-digit decimal string drawn from a CSPRNG. The plaintext code
//! exists only in the outgoing email; the store holds a keyed SHA-256 hash
//! bound to the purpose and identity, so a leaked store snapshot cannot be
//! replayed across flows or identities without the hash key.

use crate::config::environment::OtpPolicyConfig;
use crate::constants::keys;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::store::SharedStore;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::time::Duration;
use subtle::ConstantTimeEq;

/// Flow an OTP belongs to.
///
/// The OTP record and its failed-attempt counter are namespaced by purpose so
/// a registration code can never verify a password reset and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    /// New account registration
    Register,
    /// Password reset for an existing account
    Reset,
}

impl OtpPurpose {
    /// Stable string form used in store keys
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Reset => "reset",
        }
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OTP lifecycle engine
#[derive(Clone)]
pub struct OtpEngine {
    store: SharedStore,
    policy: OtpPolicyConfig,
    hash_key: String,
}

impl OtpEngine {
    /// Create a new engine over the given store backend
    #[must_use]
    pub fn new(store: SharedStore, policy: OtpPolicyConfig, hash_key: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            hash_key: hash_key.into(),
        }
    }

    /// Generate a 4-digit code from the OS CSPRNG.
    ///
    /// The range is [1000, 9999), so codes never carry a leading zero and
    /// parsing ambiguity at the client is impossible.
    #[must_use]
    pub fn generate_code(&self) -> String {
        let code: u32 =
            OsRng.gen_range(crate::constants::otp_policy::CODE_MIN..crate::constants::otp_policy::CODE_MAX);
        code.to_string()
    }

    /// Persist the hash of a freshly issued code.
    ///
    /// Overwrites any previous pending code for the same purpose and
    /// identity, which implicitly invalidates it. The failed-attempt counter
    /// is reset alongside so a new code always starts with a clean slate.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails
    pub async fn store_code(&self, purpose: OtpPurpose, email: &str, code: &str) -> AppResult<()> {
        let hash = self.hash_code(purpose, email, code);
        self.store
            .set_ex(
                &keys::otp(purpose, email),
                &hash,
                Duration::from_secs(self.policy.ttl_secs),
            )
            .await?;
        self.store.delete(&keys::otp_attempts(purpose, email)).await?;
        Ok(())
    }

    /// Verify a submitted code against the pending hash.
    ///
    /// On success the OTP record and its attempt counter are both removed so
    /// the code is strictly single-use. On failure the attempt counter is
    /// incremented; at the configured threshold the identity is locked, the
    /// pending code destroyed, and the caller told how long to wait.
    ///
    /// # Errors
    ///
    /// - [`AppError::account_locked`] when the identity is locked or this
    ///   failure crossed the attempt threshold
    /// - [`AppError::invalid_input`] when no code is pending or the code is
    ///   wrong, with remaining attempts in the message
    /// - storage errors from the backend
    pub async fn verify(&self, purpose: OtpPurpose, email: &str, submitted: &str) -> AppResult<()> {
        if self.store.exists(&keys::otp_lock(email)).await? {
            let retry_after = self.lock_retry_after(&keys::otp_lock(email)).await?;
            return Err(AppError::account_locked(
                "Account locked due to multiple failed attempts! Try again later.",
                retry_after,
            ));
        }

        let Some(stored_hash) = self.store.get(&keys::otp(purpose, email)).await? else {
            return Err(AppError::invalid_input("Invalid or expired OTP!"));
        };

        let candidate = self.hash_code(purpose, email, submitted);
        if candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into() {
            // Atomic-as-unit cleanup: the code is spent the moment it matches
            // and the identity returns to a clean slate
            self.store.delete(&keys::otp(purpose, email)).await?;
            self.store.delete(&keys::otp_attempts(purpose, email)).await?;
            self.store.delete(&keys::otp_request_count(email)).await?;
            self.store.delete(&keys::otp_cooldown(email)).await?;
            return Ok(());
        }

        self.record_failure(purpose, email).await
    }

    /// Count a failed attempt and lock the identity at the threshold
    async fn record_failure(&self, purpose: OtpPurpose, email: &str) -> AppResult<()> {
        let attempts = self
            .store
            .incr_with_window(
                &keys::otp_attempts(purpose, email),
                Duration::from_secs(self.policy.failed_attempt_window_secs),
            )
            .await?;

        if attempts >= self.policy.max_failed_attempts {
            self.store
                .set_ex(
                    &keys::otp_lock(email),
                    "locked",
                    Duration::from_secs(self.policy.account_lock_secs),
                )
                .await?;
            // A locked identity forfeits its pending code
            self.store.delete(&keys::otp(purpose, email)).await?;
            self.store.delete(&keys::otp_attempts(purpose, email)).await?;

            AppLogger::log_security_event(
                "otp_account_lock",
                "high",
                "failed OTP attempt threshold reached",
                Some(email),
            );

            return Err(AppError::account_locked(
                "Account locked due to multiple failed attempts! Try again later.",
                self.policy.account_lock_secs as i64,
            ));
        }

        let remaining = self.policy.max_failed_attempts - attempts;
        Err(AppError::invalid_input(format!(
            "Incorrect OTP. {remaining} attempts left."
        )))
    }

    /// Keyed hash binding the code to its purpose and identity
    fn hash_code(&self, purpose: OtpPurpose, email: &str, code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.hash_key.as_bytes());
        hasher.update(b":");
        hasher.update(purpose.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(email.as_bytes());
        hasher.update(b":");
        hasher.update(code.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Remaining lock duration in seconds, for client retry hints
    async fn lock_retry_after(&self, key: &str) -> AppResult<i64> {
        Ok(self
            .store
            .ttl(key)
            .await?
            .map_or(self.policy.account_lock_secs as i64, |d| d.as_secs() as i64))
    }
}
