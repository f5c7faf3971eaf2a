// ABOUTME: HTTP route registration and shared server resources
// ABOUTME: Wires auth and health routers around the Arc-shared service dependencies
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

pub mod auth;
pub mod health;

use crate::account::AccountService;
use crate::auth::SessionIssuer;
use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::middleware::AuthMiddleware;
use crate::store::SharedStore;
use axum::Router;
use std::sync::Arc;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;

/// Shared dependencies handed to every route handler
pub struct ServerResources {
    pub config: Arc<ServerConfig>,
    pub database: Arc<Database>,
    pub store: SharedStore,
    pub accounts: AccountService,
    pub auth_middleware: AuthMiddleware,
    pub issuer: Arc<SessionIssuer>,
}

impl ServerResources {
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        database: Arc<Database>,
        store: SharedStore,
        accounts: AccountService,
        issuer: Arc<SessionIssuer>,
    ) -> Self {
        let auth_middleware = AuthMiddleware::new(issuer.clone(), database.clone());
        Self {
            config,
            database,
            store,
            accounts,
            auth_middleware,
            issuer,
        }
    }
}

/// Builds the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(HealthRoutes::routes(resources))
}
