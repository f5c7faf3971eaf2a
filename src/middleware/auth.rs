// ABOUTME: Session authentication middleware for protected routes
// ABOUTME: Validates access tokens from cookies or Bearer headers and loads the account
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use crate::auth::SessionIssuer;
use crate::constants::tokens;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{AuthPrincipal, UserRole};
use crate::security::cookies::get_cookie_value;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticates incoming requests against issued session tokens
#[derive(Clone)]
pub struct AuthMiddleware {
    issuer: Arc<SessionIssuer>,
    database: Arc<Database>,
}

impl AuthMiddleware {
    #[must_use]
    pub const fn new(issuer: Arc<SessionIssuer>, database: Arc<Database>) -> Self {
        Self { issuer, database }
    }

    /// Authenticates a request from its headers.
    ///
    /// Tries the `access_token` cookie first (web clients), then falls back
    /// to an `Authorization: Bearer` header (API clients).
    ///
    /// # Errors
    ///
    /// Returns an error if no token is present, the token fails validation,
    /// or the account it names no longer exists or is deactivated.
    #[tracing::instrument(
        skip(self, headers),
        fields(
            auth_method = tracing::field::Empty,
            user_id = tracing::field::Empty,
            success = tracing::field::Empty,
        )
    )]
    pub async fn authenticate_request(
        &self,
        headers: &axum::http::HeaderMap,
    ) -> AppResult<AuthPrincipal> {
        if let Some(token) = get_cookie_value(headers, tokens::ACCESS_COOKIE) {
            tracing::Span::current().record("auth_method", "cookie");
            return self.resolve_token(&token, "cookie").await;
        }

        if let Some(token) = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            tracing::Span::current().record("auth_method", "bearer");
            return self.resolve_token(token, "bearer").await;
        }

        tracing::Span::current().record("success", false);
        tracing::warn!("Authentication failed: no session token in cookie or header");
        Err(AppError::auth_required())
    }

    /// Validates the token and confirms the account behind it still exists
    async fn resolve_token(&self, token: &str, method: &'static str) -> AppResult<AuthPrincipal> {
        // A token that is present but fails validation is a forbidden
        // request, not a missing-credentials one
        let claims = self.issuer.validate_access(token).map_err(|e| {
            tracing::Span::current().record("success", false);
            tracing::warn!(error = %e, "Access token validation failed");
            AppError::forbidden(format!("Invalid session token: {e}"))
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::forbidden("Invalid user ID in token"))?;

        let user = self
            .database
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::forbidden("Account is not found!"))?;

        if !user.is_active {
            tracing::Span::current().record("success", false);
            return Err(AppError::forbidden("Account is deactivated"));
        }

        tracing::Span::current()
            .record("user_id", user_id.to_string())
            .record("success", true);
        tracing::debug!(user_id = %user_id, "Request authenticated");

        Ok(AuthPrincipal {
            user_id,
            role: UserRole::from_str_or_default(&claims.role),
            auth_method: method,
        })
    }
}
