// ABOUTME: Integration tests for OTP request rate limiting
// ABOUTME: Exercises cooldown, spam lock, and restriction precedence end to end
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::create_harness_with_policy;
use shopverse_auth::config::environment::OtpPolicyConfig;
use shopverse_auth::errors::ErrorCode;

#[tokio::test]
async fn test_cooldown_blocks_immediate_resend() {
    let harness = create_harness_with_policy(OtpPolicyConfig::default())
        .await
        .unwrap();

    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();

    let err = harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimitExceeded);
    assert!(err.message.contains("wait before requesting a new OTP"));

    // Only the first request produced mail
    assert_eq!(harness.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_cooldown_expires() {
    let policy = OtpPolicyConfig {
        cooldown_secs: 1,
        ..OtpPolicyConfig::default()
    };
    let harness = create_harness_with_policy(policy).await.unwrap();

    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();
    assert_eq!(harness.mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_spam_lock_after_too_many_requests() {
    let policy = OtpPolicyConfig {
        cooldown_secs: 0,
        resend_limit: 2,
        ..OtpPolicyConfig::default()
    };
    let harness = create_harness_with_policy(policy).await.unwrap();

    for _ in 0..2 {
        harness
            .accounts
            .request_registration_otp("Jane", "jane@example.com", "password1")
            .await
            .unwrap();
    }

    // The third request crosses the limit and installs the spam lock
    let err = harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimitExceeded);
    assert!(err.message.contains("Too many OTP requests"));

    // The lock persists for subsequent requests
    let err = harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimitExceeded);
    assert!(err.message.contains("Too many OTP requests"));

    assert_eq!(harness.mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_spam_lock_spans_purposes() {
    let policy = OtpPolicyConfig {
        cooldown_secs: 0,
        resend_limit: 2,
        ..OtpPolicyConfig::default()
    };
    let harness = create_harness_with_policy(policy).await.unwrap();

    // Register so the reset path is available
    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();
    let code = common::last_otp(&harness.mailer);
    harness
        .accounts
        .verify_registration("Jane", "jane@example.com", "password1", &code)
        .await
        .unwrap();

    // Second request is the last one inside the limit
    harness
        .accounts
        .request_reset_otp("jane@example.com")
        .await
        .unwrap();

    // The identity-wide counter spans registration and reset purposes
    let err = harness
        .accounts
        .request_reset_otp("jane@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimitExceeded);
}

#[tokio::test]
async fn test_rate_limits_are_per_identity() {
    let policy = OtpPolicyConfig {
        cooldown_secs: 0,
        resend_limit: 1,
        ..OtpPolicyConfig::default()
    };
    let harness = create_harness_with_policy(policy).await.unwrap();

    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();
    let err = harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimitExceeded);

    // A different identity is unaffected
    harness
        .accounts
        .request_registration_otp("John", "john@example.com", "password2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_errors_carry_retry_after() {
    let harness = create_harness_with_policy(OtpPolicyConfig::default())
        .await
        .unwrap();

    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap();

    let err = harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", "password1")
        .await
        .unwrap_err();
    let retry_after = err
        .context
        .details
        .get("retry_after_secs")
        .and_then(serde_json::Value::as_i64)
        .expect("retry_after_secs should be numeric");
    assert!(retry_after > 0 && retry_after <= 60);
}
