// ABOUTME: REST endpoints for OTP-gated registration, login, password reset, and sessions
// ABOUTME: Thin handlers that delegate to AccountService and manage session cookies
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! Authentication routes
//!
//! All handlers are thin wrappers that delegate business logic to
//! [`AccountService`](crate::account::AccountService) and translate results
//! into HTTP responses and session cookies.

use crate::constants::tokens;
use crate::errors::AppError;
use crate::models::UserProfile;
use crate::routes::ServerResources;
use crate::security::cookies::{get_cookie_value, session_cookie};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registration OTP request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Registration completion request carrying the emailed code
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub otp: String,
}

/// Login request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password reset OTP request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Password reset OTP verification request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyForgotPasswordRequest {
    pub email: String,
    pub otp: String,
}

/// Final password reset request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Login and refresh response carrying the authenticated profile
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Authenticated "current user" response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

/// Authentication routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::handle_register))
            .route("/api/auth/verify-register", post(Self::handle_verify_register))
            .route("/api/auth/login", post(Self::handle_login))
            .route("/api/auth/refresh", post(Self::handle_refresh))
            .route("/api/auth/forgot-password", post(Self::handle_forgot_password))
            .route(
                "/api/auth/verify-forgot-password",
                post(Self::handle_verify_forgot_password),
            )
            .route("/api/auth/reset-password", post(Self::handle_reset_password))
            .route("/api/auth/me", get(Self::handle_me))
            .with_state(resources)
    }

    /// Handle POST /api/auth/register - send a registration OTP
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<RegisterRequest>,
    ) -> Result<Response, AppError> {
        resources
            .accounts
            .request_registration_otp(&body.name, &body.email, &body.password)
            .await?;

        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                message: "OTP sent to your email. Please verify your account.".to_owned(),
            }),
        )
            .into_response())
    }

    /// Handle POST /api/auth/verify-register - verify the OTP and create the account
    async fn handle_verify_register(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<VerifyRegisterRequest>,
    ) -> Result<Response, AppError> {
        resources
            .accounts
            .verify_registration(&body.name, &body.email, &body.password, &body.otp)
            .await?;

        Ok((
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "User registered successfully!".to_owned(),
            }),
        )
            .into_response())
    }

    /// Handle POST /api/auth/login - authenticate and set session cookies
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let (user, tokens) = resources.accounts.login(&body.email, &body.password).await?;

        let mut response = (
            StatusCode::OK,
            Json(SessionResponse {
                message: "Login successful!".to_owned(),
                user,
            }),
        )
            .into_response();

        let environment = resources.config.environment;
        append_cookie(
            &mut response,
            &session_cookie(
                tokens::ACCESS_COOKIE,
                &tokens.access_token,
                resources.issuer.access_ttl_secs(),
                environment,
            ),
        )?;
        append_cookie(
            &mut response,
            &session_cookie(
                tokens::REFRESH_COOKIE,
                &tokens.refresh_token,
                resources.issuer.refresh_ttl_secs(),
                environment,
            ),
        )?;

        Ok(response)
    }

    /// Handle POST /api/auth/refresh - rotate the access token from the refresh cookie
    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let refresh_token = get_cookie_value(&headers, tokens::REFRESH_COOKIE);
        let (user, access_token) = resources
            .accounts
            .refresh_session(refresh_token.as_deref())
            .await?;

        let mut response = (
            StatusCode::CREATED,
            Json(SessionResponse {
                message: "Token refreshed!".to_owned(),
                user,
            }),
        )
            .into_response();

        append_cookie(
            &mut response,
            &session_cookie(
                tokens::ACCESS_COOKIE,
                &access_token,
                resources.issuer.access_ttl_secs(),
                resources.config.environment,
            ),
        )?;

        Ok(response)
    }

    /// Handle POST /api/auth/forgot-password - send a reset OTP
    async fn handle_forgot_password(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<ForgotPasswordRequest>,
    ) -> Result<Response, AppError> {
        resources.accounts.request_reset_otp(&body.email).await?;

        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                message: "OTP sent to your email. Please verify to reset your password.".to_owned(),
            }),
        )
            .into_response())
    }

    /// Handle POST /api/auth/verify-forgot-password - check the reset OTP
    async fn handle_verify_forgot_password(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<VerifyForgotPasswordRequest>,
    ) -> Result<Response, AppError> {
        resources
            .accounts
            .verify_reset_otp(&body.email, &body.otp)
            .await?;

        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                message: "OTP verified. You can now reset your password.".to_owned(),
            }),
        )
            .into_response())
    }

    /// Handle POST /api/auth/reset-password - write the new password
    async fn handle_reset_password(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<ResetPasswordRequest>,
    ) -> Result<Response, AppError> {
        resources
            .accounts
            .reset_password(&body.email, &body.new_password)
            .await?;

        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                message: "Password reset successfully!".to_owned(),
            }),
        )
            .into_response())
    }

    /// Handle GET /api/auth/me - return the authenticated user's profile
    async fn handle_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = resources.auth_middleware.authenticate_request(&headers).await?;
        let user = resources.accounts.current_user(principal.user_id).await?;

        Ok((StatusCode::OK, Json(MeResponse { user })).into_response())
    }
}

/// Appends a `Set-Cookie` header to an already-built response
fn append_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::internal(format!("Invalid cookie value: {e}")))?;
    response
        .headers_mut()
        .append(axum::http::header::SET_COOKIE, value);
    Ok(())
}
