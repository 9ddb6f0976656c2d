//! Application state and router
//!
//! `AppState` carries the lifecycle manager, the auth service and the
//! metrics collector. Every storage-backed component inside them shares the
//! single handle opened at startup.

use async_trait::async_trait;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tenantry_auth::{Argon2Hasher, AuthService, JwtTokenService};
use tenantry_core::CredentialHasher;
use tenantry_lifecycle::LifecycleManager;
use tenantry_observability::{
    ComponentStatus, HealthState, Metrics, ReadinessChecker, health_router,
};

use crate::config::ServerConfig;
use crate::handlers;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleManager,
    pub auth: AuthService,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(lifecycle: LifecycleManager, auth: AuthService, metrics: Arc<Metrics>) -> Self {
        Self {
            lifecycle,
            auth,
            metrics,
        }
    }

    /// Wire the production collaborators (Argon2 hashing, JWT tokens) onto `storage`
    pub fn from_config(storage: &Storage, config: &ServerConfig, metrics: Arc<Metrics>) -> Self {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());
        let tokens = Arc::new(JwtTokenService::new(&config.auth));

        let lifecycle = storage.lifecycle(hasher.clone(), config.migration.clone());
        let auth = AuthService::new(storage.credentials(), hasher, tokens);
        Self::new(lifecycle, auth, metrics)
    }
}

/// Readiness backed by a storage round trip
struct StorageReadiness {
    lifecycle: LifecycleManager,
}

#[async_trait]
impl ReadinessChecker for StorageReadiness {
    async fn check(&self) -> Vec<ComponentStatus> {
        match self.lifecycle.ping().await {
            Ok(()) => vec![ComponentStatus::healthy("storage")],
            Err(e) => vec![ComponentStatus::unhealthy("storage", e.to_string())],
        }
    }
}

/// Organization API plus the health and metrics endpoints
pub fn router(state: AppState) -> Router {
    let health_state = HealthState::with_readiness_checker(
        state.metrics.clone(),
        Arc::new(StorageReadiness {
            lifecycle: state.lifecycle.clone(),
        }),
    );

    Router::new()
        .route("/", get(handlers::root))
        .route("/org/create", post(handlers::create_organization))
        .route("/org/get", get(handlers::get_organization))
        .route("/org/update", put(handlers::update_organization))
        .route("/org/delete", delete(handlers::delete_organization))
        .route("/admin/login", post(handlers::admin_login))
        .with_state(state)
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http())
}
