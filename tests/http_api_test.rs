// ABOUTME: HTTP-level integration tests driving the axum router directly
// ABOUTME: Verifies status codes, cookies, and JSON bodies for the auth endpoints
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{last_otp, test_jwt_config, TestHarness};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shopverse_auth::config::environment::{
    DatabaseConfig, DatabaseUrl, Environment, LogLevel, OtpPolicyConfig, SecurityConfig,
    ServerConfig, SmtpConfig, StoreSettings,
};
use shopverse_auth::routes::{router, ServerResources};
use std::sync::Arc;
use tower::ServiceExt;

fn test_server_config() -> ServerConfig {
    ServerConfig {
        http_port: 8080,
        log_level: LogLevel::Info,
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: DatabaseUrl::Memory,
        },
        jwt: test_jwt_config(),
        otp: OtpPolicyConfig::default(),
        smtp: SmtpConfig {
            host: "localhost".to_owned(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_address: "no-reply@shopverse.example".to_owned(),
        },
        store: StoreSettings::default(),
        security: SecurityConfig {
            cors_origins: vec!["*".to_owned()],
            otp_hash_key: "test-otp-hash-key".to_owned(),
        },
    }
}

async fn build_app() -> (Router, TestHarness) {
    let harness = common::create_harness().await.unwrap();
    let resources = Arc::new(ServerResources::new(
        Arc::new(test_server_config()),
        harness.database.clone(),
        harness.store.clone(),
        harness.accounts.clone(),
        harness.issuer.clone(),
    ));
    (router(resources), harness)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_endpoint_sends_otp() {
    let (app, harness) = build_app().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            &json!({"name": "Jane", "email": "jane@example.com", "password": "password1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("OTP sent"));
    assert_eq!(harness.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_unknown_fields() {
    let (app, _harness) = build_app().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            &json!({
                "name": "Jane",
                "email": "jane@example.com",
                "password": "password1",
                "role": "admin"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_full_flow_over_http() {
    let (app, harness) = build_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            &json!({"name": "Jane", "email": "jane@example.com", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let code = last_otp(&harness.mailer);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/verify-register",
            &json!({
                "name": "Jane",
                "email": "jane@example.com",
                "password": "password1",
                "otp": code
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Login sets both session cookies
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "jane@example.com", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let access_cookie = cookies
        .iter()
        .find(|c| c.starts_with("access_token="))
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();
    let refresh_cookie = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "jane@example.com");

    // Authenticated read via the access cookie
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .header(header::COOKIE, &access_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], "Jane");

    // Refresh rotates a new access cookie
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(header::COOKIE, &refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let new_access = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(new_access.starts_with("access_token="));
}

#[tokio::test]
async fn test_login_failures_map_to_unauthorized() {
    let (app, _harness) = build_app().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            &json!({"email": "ghost@example.com", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let (app, _harness) = build_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cooldown_maps_to_too_many_requests() {
    let (app, _harness) = build_app().await;

    let payload = json!({"name": "Jane", "email": "jane@example.com", "password": "password1"});
    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/api/auth/register", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("wait before requesting"));
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized() {
    let (app, _harness) = build_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _harness) = build_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["database"], "up");
    assert_eq!(body["components"]["store"], "up");
}
