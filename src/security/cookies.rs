// ABOUTME: Session cookie construction and extraction for access and refresh tokens
// ABOUTME: Builds HttpOnly Set-Cookie values and reads token cookies from request headers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use crate::config::environment::Environment;
use http::HeaderMap;

/// Builds a session cookie value for a `Set-Cookie` header.
///
/// Cookies are `HttpOnly` so scripts cannot read tokens, `SameSite=Lax` to
/// limit cross-site sends, and `Secure` outside development.
#[must_use]
pub fn session_cookie(name: &str, token: &str, max_age_secs: u64, environment: Environment) -> String {
    let mut cookie = format!("{name}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    if environment.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts a named cookie value from the request `Cookie` header
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(http::header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        if key == name {
            let value = parts.next().unwrap_or("").trim();
            if value.is_empty() {
                return None;
            }
            return Some(value.to_owned());
        }
    }
    None
}
