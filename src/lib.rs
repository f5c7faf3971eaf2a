// ABOUTME: Main library entry point for the ShopVerse authentication service
// ABOUTME: OTP-gated registration and password reset with rate limiting and JWT sessions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

#![deny(unsafe_code)]

//! # ShopVerse Auth Service
//!
//! Authentication microservice for the ShopVerse platform. Accounts are
//! created and recovered through an email OTP flow guarded by layered rate
//! limiting, and authenticated sessions are carried by short-lived access
//! and longer-lived refresh JWT pairs in `HttpOnly` cookies.
//!
//! ## Architecture
//!
//! - **OTP Engine**: short-lived hashed codes with failed-attempt lockout
//! - **Rate Limiter**: cooldown, request-count, spam-lock, and account-lock
//!   windows over a shared expiring key-value store
//! - **Session Issuer**: HS256 access/refresh token pairs with distinct secrets
//! - **Store**: Redis in production, in-process LRU store for development and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shopverse_auth::config::environment::ServerConfig;
//! use shopverse_auth::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("auth service configured for port {}", config.http_port);
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the server binary (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access them.

/// Account lifecycle orchestration: registration, login, password reset
pub mod account;

/// JWT session issuance and validation
pub mod auth;

/// Shared constants: key-space, policy defaults, token names
pub mod constants;

/// Environment-based configuration
pub mod config;

/// SQLite-backed user persistence
pub mod database;

/// Error types and HTTP error mapping
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Outbound email delivery
pub mod mail;

/// Request authentication and CORS middleware
pub mod middleware;

/// Domain models: users, roles, principals
pub mod models;

/// OTP generation, storage, and verification
pub mod otp;

/// Multi-window OTP request rate limiting
pub mod rate_limit;

/// HTTP route handlers
pub mod routes;

/// Session cookie helpers
pub mod security;

/// HTTP server assembly
pub mod server;

/// Expiring key-value store abstraction with Redis and in-memory backends
pub mod store;
