//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for Tenantry:
//! - Lifecycle operation counts by operation and outcome
//! - Lifecycle operation latency
//! - Region migration volume (documents scanned, written, failed; batches)
//! - Admin login attempts by outcome
//! - Storage readiness

use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Organization lifecycle operation, used as the `operation` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Metrics collector for Tenantry
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Lifecycle metrics
    /// Lifecycle operations by operation and outcome
    pub operations_total: CounterVec,
    /// Lifecycle operation duration
    pub operation_duration_seconds: HistogramVec,

    // Migration metrics
    /// Region migrations by outcome (complete, lossy, aborted)
    pub migrations_total: CounterVec,
    /// Documents handled by region migrations, by result (scanned, written, failed)
    pub migration_documents_total: CounterVec,
    /// Bulk-insert batches written by region migrations
    pub migration_batches_total: Counter,

    // Auth metrics
    /// Admin login attempts by outcome
    pub login_attempts_total: CounterVec,

    /// Storage backend readiness (1=reachable, 0=unreachable)
    pub storage_ready: Gauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations_total = CounterVec::new(
            Opts::new(
                "tenantry_lifecycle_operations_total",
                "Total number of organization lifecycle operations",
            ),
            &["operation", "outcome"],
        )?;

        let operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tenantry_lifecycle_operation_duration_seconds",
                "Organization lifecycle operation duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["operation"],
        )?;

        let migrations_total = CounterVec::new(
            Opts::new(
                "tenantry_region_migrations_total",
                "Total number of region migrations by outcome",
            ),
            &["outcome"],
        )?;

        let migration_documents_total = CounterVec::new(
            Opts::new(
                "tenantry_region_migration_documents_total",
                "Documents handled by region migrations",
            ),
            &["result"],
        )?;

        let migration_batches_total = Counter::with_opts(Opts::new(
            "tenantry_region_migration_batches_total",
            "Bulk-insert batches written by region migrations",
        ))?;

        let login_attempts_total = CounterVec::new(
            Opts::new(
                "tenantry_login_attempts_total",
                "Total number of admin login attempts",
            ),
            &["outcome"],
        )?;

        let storage_ready = Gauge::with_opts(Opts::new(
            "tenantry_storage_ready",
            "Storage backend readiness (1=reachable, 0=unreachable)",
        ))?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(operation_duration_seconds.clone()))?;
        registry.register(Box::new(migrations_total.clone()))?;
        registry.register(Box::new(migration_documents_total.clone()))?;
        registry.register(Box::new(migration_batches_total.clone()))?;
        registry.register(Box::new(login_attempts_total.clone()))?;
        registry.register(Box::new(storage_ready.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            operations_total,
            operation_duration_seconds,
            migrations_total,
            migration_documents_total,
            migration_batches_total,
            login_attempts_total,
            storage_ready,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished lifecycle operation.
    ///
    /// `outcome` is `"success"` or the error class of the failure.
    pub fn record_operation(&self, operation: Operation, outcome: &str, duration_secs: f64) {
        self.operations_total
            .with_label_values(&[operation.as_str(), outcome])
            .inc();
        self.operation_duration_seconds
            .with_label_values(&[operation.as_str()])
            .observe(duration_secs);
    }

    /// Record the counters of a finished region migration
    pub fn record_migration(&self, scanned: u64, written: u64, failed: u64, batches: u64) {
        let outcome = if failed == 0 && scanned == written {
            "complete"
        } else {
            "lossy"
        };
        self.migrations_total.with_label_values(&[outcome]).inc();
        self.record_migration_documents(scanned, written, failed, batches);
    }

    /// Record a region migration stopped by the fail-fast policy
    pub fn record_migration_aborted(&self, scanned: u64, written: u64, failed: u64, batches: u64) {
        self.migrations_total.with_label_values(&["aborted"]).inc();
        self.record_migration_documents(scanned, written, failed, batches);
    }

    fn record_migration_documents(&self, scanned: u64, written: u64, failed: u64, batches: u64) {
        self.migration_documents_total
            .with_label_values(&["scanned"])
            .inc_by(scanned as f64);
        self.migration_documents_total
            .with_label_values(&["written"])
            .inc_by(written as f64);
        self.migration_documents_total
            .with_label_values(&["failed"])
            .inc_by(failed as f64);
        self.migration_batches_total.inc_by(batches as f64);
    }

    /// Record an admin login attempt
    pub fn record_login(&self, outcome: &str) {
        self.login_attempts_total.with_label_values(&[outcome]).inc();
    }

    /// Update storage readiness
    pub fn set_storage_ready(&self, ready: bool) {
        self.storage_ready.set(if ready { 1.0 } else { 0.0 });
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str, labels: &[(&str, &str)]) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| panic!("{name} metric not found"));

        family
            .metric
            .iter()
            .find(|m| {
                labels.iter().all(|(k, v)| {
                    m.label
                        .iter()
                        .any(|l| l.name() == *k && l.value() == *v)
                })
            })
            .and_then(|m| m.counter.as_ref().and_then(|c| c.value))
            .unwrap_or(0.0)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.set_storage_ready(true);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation(Operation::Create, "success", 0.02);
        metrics.record_operation(Operation::Create, "organization_exists", 0.01);
        metrics.record_operation(Operation::Create, "success", 0.03);

        let name = "tenantry_lifecycle_operations_total";
        assert_eq!(
            counter_value(&metrics, name, &[("operation", "create"), ("outcome", "success")]),
            2.0
        );
        assert_eq!(
            counter_value(
                &metrics,
                name,
                &[("operation", "create"), ("outcome", "organization_exists")]
            ),
            1.0
        );
    }

    #[test]
    fn test_record_migration() {
        let metrics = Metrics::new().unwrap();
        metrics.record_migration(10, 10, 0, 2);
        metrics.record_migration(5, 4, 1, 1);

        let docs = "tenantry_region_migration_documents_total";
        assert_eq!(counter_value(&metrics, docs, &[("result", "scanned")]), 15.0);
        assert_eq!(counter_value(&metrics, docs, &[("result", "written")]), 14.0);
        assert_eq!(counter_value(&metrics, docs, &[("result", "failed")]), 1.0);

        let runs = "tenantry_region_migrations_total";
        assert_eq!(counter_value(&metrics, runs, &[("outcome", "complete")]), 1.0);
        assert_eq!(counter_value(&metrics, runs, &[("outcome", "lossy")]), 1.0);
    }

    #[test]
    fn test_record_migration_aborted() {
        let metrics = Metrics::new().unwrap();
        metrics.record_migration_aborted(2, 1, 1, 1);

        assert_eq!(
            counter_value(
                &metrics,
                "tenantry_region_migrations_total",
                &[("outcome", "aborted")]
            ),
            1.0
        );
        assert_eq!(metrics.migration_batches_total.get(), 1.0);
    }

    #[test]
    fn test_record_login() {
        let metrics = Metrics::new().unwrap();
        metrics.record_login("success");
        metrics.record_login("invalid_credentials");
        metrics.record_login("invalid_credentials");

        let name = "tenantry_login_attempts_total";
        assert_eq!(counter_value(&metrics, name, &[("outcome", "success")]), 1.0);
        assert_eq!(
            counter_value(&metrics, name, &[("outcome", "invalid_credentials")]),
            2.0
        );
    }

    #[test]
    fn test_operation_as_str() {
        assert_eq!(Operation::Create.as_str(), "create");
        assert_eq!(Operation::Delete.as_str(), "delete");
    }

    #[test]
    fn test_storage_ready_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_storage_ready(true);
        assert_eq!(metrics.storage_ready.get(), 1.0);
        metrics.set_storage_ready(false);
        assert_eq!(metrics.storage_ready.get(), 0.0);
    }

    #[test]
    fn test_metrics_default() {
        let metrics = Metrics::default();
        metrics.record_login("success");
        assert!(!metrics.registry().gather().is_empty());
    }
}
