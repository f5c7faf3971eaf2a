// ABOUTME: Health check route handlers for service monitoring
// ABOUTME: Reports database and key-value store reachability for load balancers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use crate::constants::service;
use crate::routes::ServerResources;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    /// Handle GET /health - report component status
    async fn handle_health(
        State(resources): State<Arc<ServerResources>>,
    ) -> impl IntoResponse {
        let database_healthy = resources.database.health_check().await.is_ok();
        let store_healthy = resources.store.health_check().await.is_ok();
        let healthy = database_healthy && store_healthy;

        let status = if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        (
            status,
            Json(serde_json::json!({
                "status": if healthy { "healthy" } else { "degraded" },
                "service": service::SERVER_NAME,
                "version": service::SERVER_VERSION,
                "components": {
                    "database": if database_healthy { "up" } else { "down" },
                    "store": if store_healthy { "up" } else { "down" },
                },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
    }
}
