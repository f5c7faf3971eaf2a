// ABOUTME: Core domain models for users and session principals
// ABOUTME: Data structures shared between the database layer, services, and HTTP routes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! # Data Models
//!
//! Core data structures for the auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role for permission checks and token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular shopper account
    #[default]
    User,
    /// Administrative account
    Admin,
}

impl UserRole {
    /// Stable string form used in JWT claims and the database
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse from the stored string form, defaulting to `User`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address (used for identification)
    pub email: String,
    /// Display name
    pub name: String,
    /// Hashed password for authentication
    pub password_hash: String,
    /// User role for the permission system
    pub role: UserRole,
    /// When the user account was created
    pub created_at: DateTime<Utc>,
    /// Last time the user accessed the system
    pub last_active: DateTime<Utc>,
    /// Whether the user account is active
    pub is_active: bool,
}

impl User {
    /// Create a new user with a freshly generated ID
    #[must_use]
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            role: UserRole::User,
            created_at: now,
            last_active: now,
            is_active: true,
        }
    }

    /// Public profile view, excluding the password hash
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public view of a user, safe to return to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Authenticated principal resolved from a validated access token
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    /// User ID from the token subject
    pub user_id: Uuid,
    /// Role carried in the token
    pub role: UserRole,
    /// How the token reached us (cookie or bearer header)
    pub auth_method: &'static str,
}
