// ABOUTME: System-wide constants for the ShopVerse auth service
// ABOUTME: Key-space prefixes, OTP policy defaults, and token lifetime defaults
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! # Constants Module
//!
//! Application constants shared across the OTP engine, rate limiter, and
//! session issuer. Values configurable at runtime live in
//! [`crate::config::environment`]; only fixed protocol-level values belong
//! here.

/// Key-space layout for the shared key-value store.
///
/// Every key this service writes is namespaced under [`keys::PREFIX`] so a
/// shared Redis deployment can be swept or monitored per-service. The OTP
/// record and its failed-attempt counter are additionally namespaced by
/// purpose so a concurrent registration and password-reset flow for the same
/// email cannot clobber each other. Cooldowns, request counters, and locks
/// are identity-wide abuse controls and deliberately ignore purpose.
pub mod keys {
    use crate::otp::OtpPurpose;

    /// Service-wide key prefix
    pub const PREFIX: &str = "shopverse:auth:";

    /// Key holding the hashed OTP for a pending verification
    #[must_use]
    pub fn otp(purpose: OtpPurpose, email: &str) -> String {
        format!("{PREFIX}otp:{}:{email}", purpose.as_str())
    }

    /// Key counting failed verification attempts for a pending OTP
    #[must_use]
    pub fn otp_attempts(purpose: OtpPurpose, email: &str) -> String {
        format!("{PREFIX}otp_attempts:{}:{email}", purpose.as_str())
    }

    /// Key marking the per-identity resend cooldown
    #[must_use]
    pub fn otp_cooldown(email: &str) -> String {
        format!("{PREFIX}otp_cooldown:{email}")
    }

    /// Key counting OTP requests inside the rolling request window
    #[must_use]
    pub fn otp_request_count(email: &str) -> String {
        format!("{PREFIX}otp_request_count:{email}")
    }

    /// Key marking a spam lock after too many OTP requests
    #[must_use]
    pub fn otp_spam_lock(email: &str) -> String {
        format!("{PREFIX}otp_spam_lock:{email}")
    }

    /// Key marking an account lock after too many failed verifications
    #[must_use]
    pub fn otp_lock(email: &str) -> String {
        format!("{PREFIX}otp_lock:{email}")
    }
}

/// Default OTP policy values. Overridable through `OTP_*` environment
/// variables, see [`crate::config::environment::OtpPolicyConfig`].
pub mod otp_policy {
    /// OTP time-to-live in seconds (5 minutes)
    pub const TTL_SECS: u64 = 300;

    /// Resend cooldown in seconds
    pub const COOLDOWN_SECS: u64 = 60;

    /// Request-count window in seconds (1 hour)
    pub const REQUEST_WINDOW_SECS: u64 = 3600;

    /// Requests allowed inside the request window before a spam lock
    pub const RESEND_LIMIT: u64 = 5;

    /// Spam lock duration in seconds (1 hour)
    pub const SPAM_LOCK_SECS: u64 = 3600;

    /// Failed verification attempts allowed before an account lock
    pub const MAX_FAILED_ATTEMPTS: u64 = 10;

    /// Failed-attempt counter window in seconds (5 minutes)
    pub const FAILED_ATTEMPT_WINDOW_SECS: u64 = 300;

    /// Account lock duration in seconds (30 minutes)
    pub const ACCOUNT_LOCK_SECS: u64 = 1800;

    /// Inclusive lower bound of generated codes
    pub const CODE_MIN: u32 = 1000;

    /// Exclusive upper bound of generated codes
    pub const CODE_MAX: u32 = 9999;
}

/// Default token lifetimes
pub mod tokens {
    /// Access token lifetime in seconds (15 minutes)
    pub const ACCESS_TTL_SECS: u64 = 900;

    /// Refresh token lifetime in seconds (7 days)
    pub const REFRESH_TTL_SECS: u64 = 604_800;

    /// Cookie carrying the access token
    pub const ACCESS_COOKIE: &str = "access_token";

    /// Cookie carrying the refresh token
    pub const REFRESH_COOKIE: &str = "refresh_token";
}

/// Password hashing cost
pub mod hashing {
    /// bcrypt cost factor for stored passwords
    pub const BCRYPT_COST: u32 = 10;
}

/// Service identity
pub mod service {
    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Default service name for logs
    pub const SERVER_NAME: &str = "shopverse-auth";
}
