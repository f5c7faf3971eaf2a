// ABOUTME: Account lifecycle orchestration for registration, login, and password reset
// ABOUTME: Coordinates OTP engine, rate limiter, mailer, database, and session issuer
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use crate::auth::{SessionIssuer, SessionTokens};
use crate::constants::hashing;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::mail::{templates, SharedMailer};
use crate::models::{User, UserProfile};
use crate::otp::{OtpEngine, OtpPurpose};
use crate::rate_limit::RateLimiter;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // Safe: pattern is a compile-time constant known to be valid
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
    })
}

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 8;

/// Orchestrates account flows over the OTP engine, rate limiter, mailer,
/// session issuer, and user store
#[derive(Clone)]
pub struct AccountService {
    database: Arc<Database>,
    otp: Arc<OtpEngine>,
    limiter: Arc<RateLimiter>,
    mailer: SharedMailer,
    issuer: Arc<SessionIssuer>,
    otp_ttl_secs: u64,
}

impl AccountService {
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        otp: Arc<OtpEngine>,
        limiter: Arc<RateLimiter>,
        mailer: SharedMailer,
        issuer: Arc<SessionIssuer>,
        otp_ttl_secs: u64,
    ) -> Self {
        Self {
            database,
            otp,
            limiter,
            mailer,
            issuer,
            otp_ttl_secs,
        }
    }

    /// Starts registration by sending an OTP to a not-yet-registered email.
    ///
    /// # Errors
    ///
    /// Returns an error if input validation fails, the email is already
    /// registered, a rate limit or lock is active, or mail delivery fails.
    #[tracing::instrument(skip(self, password), fields(email = %email))]
    pub async fn request_registration_otp(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<()> {
        validate_registration_input(name, email, password)?;

        if self.database.get_user_by_email(email).await?.is_some() {
            return Err(AppError::already_exists(
                "User already exists with this email!",
            ));
        }

        self.send_otp(name, email, OtpPurpose::Register).await
    }

    /// Completes registration: verifies the OTP, hashes the password, and
    /// creates the user record.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the email was registered in the
    /// meantime, or the OTP is wrong, expired, or locked out.
    #[tracing::instrument(skip(self, password, code), fields(email = %email))]
    pub async fn verify_registration(
        &self,
        name: &str,
        email: &str,
        password: &str,
        code: &str,
    ) -> AppResult<UserProfile> {
        validate_registration_input(name, email, password)?;

        // Re-checked here because the account may have been created between
        // the OTP request and this verification
        if self.database.get_user_by_email(email).await?.is_some() {
            return Err(AppError::already_exists(
                "User already exists with this email!",
            ));
        }

        self.otp.verify(OtpPurpose::Register, email, code).await?;

        let password_hash = hash_password(password.to_owned()).await?;
        let user = User::new(email.to_owned(), name.to_owned(), password_hash);
        self.database.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.profile())
    }

    /// Authenticates credentials and issues a session token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is unknown or the password is wrong.
    #[tracing::instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(UserProfile, SessionTokens)> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(AppError::invalid_input("Email and Password are required!"));
        }

        let user = self
            .database
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::auth_invalid("User doesn't exists!"))?;

        if !verify_password(password.to_owned(), user.password_hash.clone()).await? {
            AppLogger::log_auth_event(
                &user.id.to_string(),
                "login",
                false,
                Some("password mismatch"),
            );
            return Err(AppError::auth_invalid("Invalid email or password!"));
        }

        self.database.touch_last_active(user.id).await?;
        let tokens = self.issuer.issue_session(&user)?;

        AppLogger::log_auth_event(&user.id.to_string(), "login", true, None);
        Ok((user.profile(), tokens))
    }

    /// Rotates an access token from a refresh token.
    ///
    /// A missing token is an authentication-required failure; a present but
    /// invalid token, or one whose subject no longer exists, is forbidden.
    pub async fn refresh_session(&self, refresh_token: Option<&str>) -> AppResult<(UserProfile, String)> {
        let token = refresh_token.ok_or_else(AppError::auth_required)?;

        let claims = self
            .issuer
            .validate_refresh(token)
            .map_err(|e| AppError::forbidden(format!("Invalid refresh token: {e}")))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::forbidden("Invalid subject in refresh token"))?;

        let user = self
            .database
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::forbidden("Account is not found!"))?;

        let access_token = self.issuer.issue_access(&user)?;
        tracing::debug!(user_id = %user.id, "Access token refreshed");
        Ok((user.profile(), access_token))
    }

    /// Loads the profile behind an authenticated principal
    pub async fn current_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let user = self
            .database
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::forbidden("Account is not found!"))?;
        Ok(user.profile())
    }

    /// Starts a password reset by sending an OTP to a registered email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is unknown or a rate limit is active.
    #[tracing::instrument(skip(self), fields(email = %email))]
    pub async fn request_reset_otp(&self, email: &str) -> AppResult<()> {
        validate_email(email)?;

        let user = self
            .database
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {email}")))?;

        self.send_otp(&user.name, email, OtpPurpose::Reset).await
    }

    /// Verifies a password-reset OTP without changing anything yet
    pub async fn verify_reset_otp(&self, email: &str, code: &str) -> AppResult<()> {
        validate_email(email)?;
        self.otp.verify(OtpPurpose::Reset, email, code).await
    }

    /// Writes a new password after a verified reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is unknown or the new password matches
    /// the current one.
    #[tracing::instrument(skip(self, new_password), fields(email = %email))]
    pub async fn reset_password(&self, email: &str, new_password: &str) -> AppResult<()> {
        validate_email(email)?;
        validate_password(new_password)?;

        let user = self
            .database
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {email}")))?;

        if verify_password(new_password.to_owned(), user.password_hash.clone()).await? {
            return Err(AppError::invalid_input(
                "New password cannot be the same as the old password!",
            ));
        }

        let password_hash = hash_password(new_password.to_owned()).await?;
        self.database.update_password(email, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Shared OTP send path: restrictions, request tracking, mail delivery,
    /// then the store write. Mail goes out first so a failed delivery never
    /// leaves behind a code the user never received.
    async fn send_otp(&self, name: &str, email: &str, purpose: OtpPurpose) -> AppResult<()> {
        self.limiter.check_restrictions(email).await?;
        self.limiter.track_request(email).await?;

        let code = self.otp.generate_code();
        self.mailer
            .send(
                email,
                "Verify your email",
                templates::OTP_CODE,
                &json!({
                    "name": name,
                    "code": code,
                    "ttl_minutes": (self.otp_ttl_secs / 60).to_string(),
                }),
            )
            .await?;

        self.otp.store_code(purpose, email, &code).await?;
        self.limiter.start_cooldown(email).await?;

        tracing::info!(purpose = %purpose, "OTP sent");
        Ok(())
    }
}

/// Hashes a password on the blocking pool, bcrypt is CPU-bound
async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, hashing::BCRYPT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))
}

fn validate_registration_input(name: &str, email: &str, password: &str) -> AppResult<()> {
    if name.trim().is_empty() || email.trim().is_empty() || password.trim().is_empty() {
        return Err(AppError::invalid_input("Missing required fields"));
    }
    validate_email(email)?;
    validate_password(password)
}

fn validate_email(email: &str) -> AppResult<()> {
    if !email_regex().is_match(email) {
        return Err(AppError::invalid_input("Invalid email format!"));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_validate_email_accepts_plausible_addresses() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane.doe+tag@sub.example.co").is_ok());
    }

    #[test]
    fn test_validate_email_rejects_garbage() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("jane@nodot").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_registration_input_requires_all_fields() {
        let err = validate_registration_input("", "jane@example.com", "password1")
            .expect_err("empty name must fail");
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = validate_registration_input("Jane", "jane@example.com", "short")
            .expect_err("short password must fail");
        assert_eq!(err.code, ErrorCode::InvalidInput);

        assert!(validate_registration_input("Jane", "jane@example.com", "password1").is_ok());
    }

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery".to_owned()).await.unwrap();
        assert!(verify_password("correct horse battery".to_owned(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong password".to_owned(), hash)
            .await
            .unwrap());
    }
}
