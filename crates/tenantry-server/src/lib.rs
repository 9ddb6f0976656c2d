//! Tenantry HTTP server
//!
//! Request surface for the tenant region lifecycle manager:
//! - `POST /org/create`, `GET /org/get`, `PUT /org/update`, `DELETE /org/delete`
//! - `POST /admin/login`
//! - `/healthz`, `/readyz`, `/metrics`

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod storage;
pub mod telemetry;

pub use app::{AppState, router};
pub use config::{ConfigError, ServerConfig, StorageBackend};
pub use storage::Storage;
