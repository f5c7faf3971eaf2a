// ABOUTME: HTTP middleware for request authentication
// ABOUTME: Resolves session tokens from cookies or Authorization headers into principals
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

pub mod auth;
pub mod cors;

pub use auth::AuthMiddleware;
