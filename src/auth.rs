// ABOUTME: JWT session issuance and validation with separate access and refresh secrets
// ABOUTME: Signs HS256 token pairs for authenticated users and decodes them back to claims
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use crate::config::environment::JwtConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{User, UserRole};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Converts seconds into a human-readable duration string
fn humanize_duration(total_secs: i64) -> String {
    if total_secs < 60 {
        return format!("{total_secs} seconds");
    }
    let minutes = total_secs / 60;
    if minutes < 60 {
        return format!("{minutes} minutes");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} hours");
    }
    let days = hours / 24;
    format!("{days} days")
}

/// Detailed JWT validation error types for better error handling
#[derive(Debug, Clone)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: chrono::DateTime<chrono::Utc>,
        /// Current time for reference
        current_time: chrono::DateTime<chrono::Utc>,
    },
    /// Token signature is invalid or token was signed with a different secret
    TokenInvalid {
        /// Why the token failed validation
        reason: String,
    },
    /// Token structure is malformed
    TokenMalformed {
        /// What part of the token is malformed
        details: String,
    },
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenExpired {
                expired_at,
                current_time,
            } => {
                let expired_duration = current_time.signed_duration_since(*expired_at);
                write!(
                    f,
                    "Token expired {} ago at {}",
                    humanize_duration(expired_duration.num_seconds()),
                    expired_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Self::TokenInvalid { reason } => write!(f, "Token validation failed: {reason}"),
            Self::TokenMalformed { details } => write!(f, "Token malformed: {details}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

/// Maps `jsonwebtoken` decode failures onto validation error variants
fn convert_jwt_error(error: &jsonwebtoken::errors::Error, token: &str) -> JwtValidationError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::ExpiredSignature => {
            // Decode without validation to recover the expiry timestamp
            let expired_at = decode_expiry_unchecked(token).unwrap_or_else(Utc::now);
            JwtValidationError::TokenExpired {
                expired_at,
                current_time: Utc::now(),
            }
        }
        ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
            reason: "Invalid signature".to_owned(),
        },
        ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
            details: "Invalid token structure".to_owned(),
        },
        ErrorKind::Base64(e) => JwtValidationError::TokenMalformed {
            details: format!("Invalid base64 encoding: {e}"),
        },
        ErrorKind::Json(e) => JwtValidationError::TokenMalformed {
            details: format!("Invalid JSON in claims: {e}"),
        },
        other => JwtValidationError::TokenInvalid {
            reason: format!("{other:?}"),
        },
    }
}

/// Reads the `exp` claim from an expired token without verifying its signature
fn decode_expiry_unchecked(token: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.insecure_disable_signature_validation();
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    chrono::DateTime::from_timestamp(data.claims.exp, 0)
}

/// JWT claims carried by both access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject)
    pub sub: String,
    /// User role
    pub role: String,
    /// Issued at (milliseconds since epoch, with a uniqueness offset)
    pub iat: i64,
    /// Expiration time (seconds since epoch)
    pub exp: i64,
}

/// Access and refresh token pair returned on login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds, for clients that track expiry
    pub expires_in: u64,
}

/// Which of the two signing secrets a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

/// Signs and validates session token pairs with per-kind secrets
pub struct SessionIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    token_counter: AtomicU64,
}

impl Clone for SessionIssuer {
    fn clone(&self) -> Self {
        Self {
            access_encoding: self.access_encoding.clone(),
            access_decoding: self.access_decoding.clone(),
            refresh_encoding: self.refresh_encoding.clone(),
            refresh_decoding: self.refresh_decoding.clone(),
            access_ttl_secs: self.access_ttl_secs,
            refresh_ttl_secs: self.refresh_ttl_secs,
            token_counter: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            token_counter: AtomicU64::new(0),
        }
    }

    /// Issues a fresh access/refresh pair for the given user
    pub fn issue_session(&self, user: &User) -> AppResult<SessionTokens> {
        let access_token = self.sign(&user.id.to_string(), user.role, TokenKind::Access)?;
        let refresh_token = self.sign(&user.id.to_string(), user.role, TokenKind::Refresh)?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
        })
    }

    /// Issues a standalone access token, used when rotating via a refresh token
    pub fn issue_access(&self, user: &User) -> AppResult<String> {
        self.sign(&user.id.to_string(), user.role, TokenKind::Access)
    }

    /// Validates an access token and returns its claims
    pub fn validate_access(&self, token: &str) -> Result<Claims, JwtValidationError> {
        self.validate(token, TokenKind::Access)
    }

    /// Validates a refresh token and returns its claims
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, JwtValidationError> {
        self.validate(token, TokenKind::Refresh)
    }

    #[must_use]
    pub const fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    #[must_use]
    pub const fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    fn sign(&self, subject: &str, role: UserRole, kind: TokenKind) -> AppResult<String> {
        let now = Utc::now();
        let ttl_secs = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| AppError::internal("Token TTL exceeds i64 range"))?;
        let expiry = now + chrono::Duration::seconds(ttl);

        // Tokens issued within the same second get distinct iat values so
        // repeated logins never produce identical signatures
        let counter = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let unique_iat = now.timestamp() * 1000 + i64::try_from(counter % 1000).unwrap_or(0);

        let claims = Claims {
            sub: subject.to_owned(),
            role: role.as_str().to_owned(),
            iat: unique_iat,
            exp: expiry.timestamp(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };
        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
    }

    fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtValidationError> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| convert_jwt_error(&e, token))
    }
}
