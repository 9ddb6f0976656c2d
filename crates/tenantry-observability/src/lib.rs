//! Tenantry Observability
//!
//! This crate provides:
//! - Prometheus metrics for organization lifecycle operations and region migrations
//! - Health endpoints (`/healthz`, `/readyz`, `/metrics`)

pub mod health;
pub mod metrics;

pub use health::{ComponentStatus, HealthState, ReadinessChecker, health_router};
pub use metrics::{Metrics, Operation};
