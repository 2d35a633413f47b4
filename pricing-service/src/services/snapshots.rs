//! Snapshot capture and rebuild.

use crate::error::PricingError;
use crate::models::{
    BatchRebuildReport, PricingConfiguration, PricingRecord, PricingSnapshot, RebuildFailure,
    RebuildOutcome, RebuildSummary,
};
use crate::services::calculator::PricingEngine;
use crate::services::metrics::{record_error, record_rebuild};
use crate::services::store::SnapshotStore;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Commits pricing snapshots to the store.
#[derive(Clone)]
pub struct SnapshotService {
    store: Arc<dyn SnapshotStore>,
    engine: PricingEngine,
    config: Arc<PricingConfiguration>,
}

impl SnapshotService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        engine: PricingEngine,
        config: Arc<PricingConfiguration>,
    ) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Price a new record and persist it with its snapshot.
    #[instrument(skip(self, record), fields(record_id = %record.record_id, kind = record.kind.as_str()))]
    pub async fn capture_snapshot(
        &self,
        mut record: PricingRecord,
    ) -> Result<PricingRecord, PricingError> {
        let snapshot = self.price(&record).await?;
        record.snapshot = Some(snapshot);
        record.snapshot_complete = true;
        self.store.insert_record(&record).await?;

        info!(
            items = record.line_items.len(),
            total = %record.snapshot.as_ref().map(|s| s.total).unwrap_or_default(),
            "Pricing snapshot captured"
        );
        Ok(record)
    }

    /// Recompute and overwrite the snapshot of an existing record.
    #[instrument(skip(self))]
    pub async fn rebuild_snapshot(&self, record_id: Uuid) -> Result<RebuildSummary, PricingError> {
        let result = self.rebuild_record(record_id).await;
        match &result {
            Ok(summary) => {
                record_rebuild(RebuildOutcome::Updated.as_str());
                info!(
                    items = summary.items_count,
                    new_total = %summary.new_total,
                    "{}",
                    summary.message()
                );
            }
            Err(e) => {
                record_rebuild(RebuildOutcome::Failed.as_str());
                record_error(e.error_type());
                error!(error = %e, "Snapshot rebuild failed");
            }
        }
        result
    }

    /// Rebuild every record flagged incomplete, continuing past failures.
    ///
    /// Records that vanished or have no line items are skipped.
    #[instrument(skip(self))]
    pub async fn rebuild_incomplete(&self) -> Result<BatchRebuildReport, PricingError> {
        let record_ids = self.store.list_incomplete().await?;
        info!(candidates = record_ids.len(), "Starting batch snapshot rebuild");

        let mut report = BatchRebuildReport::default();
        for record_id in record_ids {
            let outcome = match self.rebuild_in_batch(record_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(record_id = %record_id, error = %e, "Skipping failed record in batch");
                    record_error(e.error_type());
                    report.failures.push(RebuildFailure {
                        record_id,
                        error: e.to_string(),
                    });
                    RebuildOutcome::Failed
                }
            };
            record_rebuild(outcome.as_str());
            report.record(outcome);
        }

        info!(
            updated = report.updated,
            failed = report.failed,
            skipped = report.skipped,
            "Batch snapshot rebuild finished"
        );
        Ok(report)
    }

    async fn rebuild_in_batch(&self, record_id: Uuid) -> Result<RebuildOutcome, PricingError> {
        let Some(record) = self.store.get_record(record_id).await? else {
            return Ok(RebuildOutcome::Skipped);
        };
        if record.line_items.is_empty() {
            return Ok(RebuildOutcome::Skipped);
        }
        self.write_rebuilt(&record).await?;
        Ok(RebuildOutcome::Updated)
    }

    async fn rebuild_record(&self, record_id: Uuid) -> Result<RebuildSummary, PricingError> {
        let record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or_else(|| PricingError::NotFound(format!("record {} not found", record_id)))?;
        self.write_rebuilt(&record).await
    }

    async fn write_rebuilt(&self, record: &PricingRecord) -> Result<RebuildSummary, PricingError> {
        let snapshot = self.price(record).await?;
        let summary = RebuildSummary {
            record_id: record.record_id,
            kind: record.kind,
            items_count: record.line_items.len(),
            previous_total: record.snapshot.as_ref().map(|s| s.total),
            new_total: snapshot.total,
        };
        self.store
            .save_snapshot(record.record_id, &snapshot, &summary)
            .await?;
        Ok(summary)
    }

    async fn price(&self, record: &PricingRecord) -> Result<PricingSnapshot, PricingError> {
        self.engine
            .calculate_totals(
                &record.line_items,
                &record.adjustments,
                &self.config,
                &record.context,
            )
            .await
    }
}
