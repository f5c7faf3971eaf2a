// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides an in-memory service harness with a recording mailer
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `shopverse_auth`
//!
//! Builds a fully wired `AccountService` over the in-memory store, an
//! in-memory SQLite database, and a mail recorder so flows can be driven
//! end to end without external services.

use anyhow::Result;
use shopverse_auth::{
    account::AccountService,
    auth::SessionIssuer,
    config::environment::{JwtConfig, OtpPolicyConfig},
    database::Database,
    mail::{RecordingMailer, SharedMailer},
    otp::OtpEngine,
    rate_limit::RateLimiter,
    store::{memory::MemoryStore, SharedStore, StoreConfig},
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fully wired account service with handles to its collaborators
pub struct TestHarness {
    pub accounts: AccountService,
    pub database: Arc<Database>,
    pub store: SharedStore,
    pub mailer: Arc<RecordingMailer>,
    pub issuer: Arc<SessionIssuer>,
}

/// JWT configuration with fixed test secrets
pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        access_secret: "integration-test-access-secret-0123456789".to_owned(),
        refresh_secret: "integration-test-refresh-secret-012345678".to_owned(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 604_800,
    }
}

/// Build a harness with the default OTP policy
pub async fn create_harness() -> Result<TestHarness> {
    create_harness_with_policy(OtpPolicyConfig::default()).await
}

/// Build a harness with a custom OTP policy for rate-limit and lockout tests
pub async fn create_harness_with_policy(policy: OtpPolicyConfig) -> Result<TestHarness> {
    init_test_logging();

    let store_config = StoreConfig {
        enable_background_cleanup: false,
        ..StoreConfig::default()
    };
    let store: SharedStore = Arc::new(MemoryStore::new(&store_config));

    let database = Arc::new(Database::new("sqlite::memory:").await?);
    let mailer = RecordingMailer::new();
    let issuer = Arc::new(SessionIssuer::new(&test_jwt_config()));

    let otp = Arc::new(OtpEngine::new(
        store.clone(),
        policy.clone(),
        "integration-test-hash-key",
    ));
    let limiter = Arc::new(RateLimiter::new(store.clone(), policy.clone()));

    let shared_mailer: SharedMailer = mailer.clone();
    let accounts = AccountService::new(
        database.clone(),
        otp,
        limiter,
        shared_mailer,
        issuer.clone(),
        policy.ttl_secs,
    );

    Ok(TestHarness {
        accounts,
        database,
        store,
        mailer,
        issuer,
    })
}

/// Pull the 4-digit code out of a captured OTP email body
pub fn extract_otp(body: &str) -> String {
    let digits: Vec<char> = body.chars().collect();
    for window in digits.windows(4) {
        if window.iter().all(char::is_ascii_digit) {
            return window.iter().collect();
        }
    }
    panic!("no OTP code found in email body: {body}");
}

/// Latest OTP code sent to the recording mailer
pub fn last_otp(mailer: &RecordingMailer) -> String {
    let mail = mailer.last().expect("no mail captured");
    extract_otp(&mail.body)
}
