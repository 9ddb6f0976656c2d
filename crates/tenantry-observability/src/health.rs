//! Health endpoints
//!
//! This module provides HTTP health check endpoints:
//! - `/healthz` - Liveness probe (always returns 200 OK if server is running)
//! - `/readyz` - Readiness probe (checks the storage backend)
//! - `/metrics` - Prometheus metrics endpoint

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Service status
    pub status: String,
    /// Component statuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentStatus>>,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status of one dependency in a readiness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component name
    pub name: String,
    /// "healthy" or "unhealthy"
    pub status: String,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentStatus {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "healthy".to_string(),
            error: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Readiness checker trait
///
/// The service is ready when every reported component is healthy.
#[async_trait]
pub trait ReadinessChecker: Send + Sync {
    async fn check(&self) -> Vec<ComponentStatus>;
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    /// Metrics collector
    pub metrics: Arc<Metrics>,
    /// Optional readiness checker
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    /// Create a new health state
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness_checker: None,
        }
    }

    /// Create a new health state with readiness checker
    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        readiness_checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            readiness_checker: Some(readiness_checker),
        }
    }
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: None,
    })
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable if any component is unhealthy
async fn readyz(State(state): State<HealthState>) -> Response {
    let Some(checker) = &state.readiness_checker else {
        // No readiness checker, assume ready
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                components: None,
                message: None,
            }),
        )
            .into_response();
    };

    let components = checker.check().await;
    let ready = components.iter().all(ComponentStatus::is_healthy);
    state.metrics.set_storage_ready(ready);

    if ready {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                components: Some(components),
                message: None,
            }),
        )
            .into_response()
    } else {
        tracing::warn!(?components, "Readiness check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                components: Some(components),
                message: Some("One or more components are unavailable".to_string()),
            }),
        )
            .into_response()
    }
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text format
async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response(),
    }
}
