// ABOUTME: Integration tests for the OTP-gated password reset flow
// ABOUTME: Covers reset requests, OTP verification, and password replacement rules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{create_harness_with_policy, last_otp, TestHarness};
use shopverse_auth::config::environment::OtpPolicyConfig;
use shopverse_auth::errors::ErrorCode;

/// Registers jane@example.com with the given password through the OTP flow
async fn register_user(harness: &TestHarness, password: &str) {
    harness
        .accounts
        .request_registration_otp("Jane", "jane@example.com", password)
        .await
        .unwrap();
    let code = last_otp(&harness.mailer);
    harness
        .accounts
        .verify_registration("Jane", "jane@example.com", password, &code)
        .await
        .unwrap();
}

fn relaxed_policy() -> OtpPolicyConfig {
    // Cooldown disabled so registration and reset can run back to back
    OtpPolicyConfig {
        cooldown_secs: 0,
        ..OtpPolicyConfig::default()
    }
}

#[tokio::test]
async fn test_full_reset_flow() {
    let harness = create_harness_with_policy(relaxed_policy()).await.unwrap();
    register_user(&harness, "old-password-1").await;

    harness
        .accounts
        .request_reset_otp("jane@example.com")
        .await
        .unwrap();
    let code = last_otp(&harness.mailer);

    harness
        .accounts
        .verify_reset_otp("jane@example.com", &code)
        .await
        .unwrap();

    harness
        .accounts
        .reset_password("jane@example.com", "new-password-1")
        .await
        .unwrap();

    // New password logs in, old one is refused
    harness
        .accounts
        .login("jane@example.com", "new-password-1")
        .await
        .unwrap();
    let err = harness
        .accounts
        .login("jane@example.com", "old-password-1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);
}

#[tokio::test]
async fn test_reset_requires_registered_email() {
    let harness = create_harness_with_policy(relaxed_policy()).await.unwrap();

    let err = harness
        .accounts
        .request_reset_otp("nobody@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert!(harness.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_reset_rejects_unchanged_password() {
    let harness = create_harness_with_policy(relaxed_policy()).await.unwrap();
    register_user(&harness, "same-password-1").await;

    harness
        .accounts
        .request_reset_otp("jane@example.com")
        .await
        .unwrap();
    let code = last_otp(&harness.mailer);
    harness
        .accounts
        .verify_reset_otp("jane@example.com", &code)
        .await
        .unwrap();

    let err = harness
        .accounts
        .reset_password("jane@example.com", "same-password-1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert!(err.message.contains("same as the old password"));

    // Original password still works after the rejected reset
    harness
        .accounts
        .login("jane@example.com", "same-password-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_otp_is_isolated_from_registration_otp() {
    let harness = create_harness_with_policy(relaxed_policy()).await.unwrap();
    register_user(&harness, "old-password-1").await;
    let registration_code = last_otp(&harness.mailer);

    harness
        .accounts
        .request_reset_otp("jane@example.com")
        .await
        .unwrap();
    let reset_code = last_otp(&harness.mailer);
    if reset_code == registration_code {
        // Randomly colliding codes would make the assertion meaningless
        return;
    }

    // The consumed registration code does not verify the reset purpose
    let err = harness
        .accounts
        .verify_reset_otp("jane@example.com", &registration_code)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    // The real reset code still verifies afterwards
    harness
        .accounts
        .verify_reset_otp("jane@example.com", &reset_code)
        .await
        .unwrap();
}
