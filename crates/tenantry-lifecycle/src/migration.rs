//! Batched region-to-region copy
//!
//! Scans the source region in the store's natural order and writes the
//! documents verbatim, identifiers included, to the destination in bulk
//! inserts of at most `batch_size` documents. The copy is not isolated
//! from concurrent writers: documents written behind the scan position are
//! not copied.

use futures::StreamExt;
use tenantry_core::{BulkInsertOutcome, Document, Error, MigrationReport, RegionStore, Result};

use crate::config::BatchFailurePolicy;

/// One region copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub source: String,
    pub destination: String,
    pub batch_size: usize,
    pub policy: BatchFailurePolicy,
}

impl MigrationPlan {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        batch_size: usize,
        policy: BatchFailurePolicy,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            batch_size: batch_size.max(1),
            policy,
        }
    }
}

/// Copy every document of `plan.source` into `plan.destination`.
///
/// The destination must already exist. Under `Tolerate`, rejected
/// documents are only counted; under `FailFast`, the first batch with a
/// rejection ends the copy with `Error::MigrationAborted`. A scan error
/// ends the copy under either policy.
pub async fn copy_region(store: &dyn RegionStore, plan: &MigrationPlan) -> Result<MigrationReport> {
    let mut report = MigrationReport::new(&plan.source, &plan.destination);
    let mut batch = Vec::with_capacity(plan.batch_size);
    let mut scan = store.scan_all(&plan.source);

    while let Some(document) = scan.next().await {
        let document = document.inspect_err(|e| {
            tracing::warn!(
                source = %plan.source,
                scanned = report.scanned,
                error = %e,
                "Source scan failed, aborting migration"
            );
        })?;
        report.scanned += 1;
        batch.push(document);

        if batch.len() >= plan.batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(plan.batch_size));
            write_batch(store, plan, &mut report, full).await?;
        }
    }

    if !batch.is_empty() {
        write_batch(store, plan, &mut report, batch).await?;
    }

    Ok(report)
}

async fn write_batch(
    store: &dyn RegionStore,
    plan: &MigrationPlan,
    report: &mut MigrationReport,
    batch: Vec<Document>,
) -> Result<()> {
    let size = batch.len() as u64;
    let outcome = match store.bulk_insert(&plan.destination, batch).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(destination = %plan.destination, error = %e, "Bulk insert failed");
            BulkInsertOutcome {
                inserted: 0,
                failed: size,
            }
        }
    };
    report.record_batch(outcome);

    tracing::debug!(
        destination = %plan.destination,
        batch = report.batches,
        batch_size = size,
        inserted = outcome.inserted,
        failed = outcome.failed,
        "Migration batch written"
    );

    if outcome.is_clean() {
        return Ok(());
    }

    match plan.policy {
        BatchFailurePolicy::Tolerate => {
            tracing::warn!(
                destination = %plan.destination,
                batch = report.batches,
                failed = outcome.failed,
                "Documents rejected by destination, continuing"
            );
            Ok(())
        }
        BatchFailurePolicy::FailFast => Err(Error::MigrationAborted(Box::new(report.clone()))),
    }
}
