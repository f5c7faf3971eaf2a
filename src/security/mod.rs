// ABOUTME: Security utilities shared across HTTP handlers and middleware
// ABOUTME: Currently houses session cookie construction and parsing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

pub mod cookies;
