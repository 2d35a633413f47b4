//! Snapshot persistence seam.

use crate::error::PricingError;
use crate::models::{PricingRecord, PricingSnapshot, RebuildSummary};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Storage for order/invoice pricing records and their snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert a new record together with its captured snapshot.
    async fn insert_record(&self, record: &PricingRecord) -> Result<(), PricingError>;

    async fn get_record(&self, record_id: Uuid) -> Result<Option<PricingRecord>, PricingError>;

    /// Replace the stored snapshot, mark it complete and keep the audit summary.
    /// Line items and adjustments are left untouched.
    async fn save_snapshot(
        &self,
        record_id: Uuid,
        snapshot: &PricingSnapshot,
        summary: &RebuildSummary,
    ) -> Result<(), PricingError>;

    /// IDs of records whose snapshot is missing or flagged incomplete.
    async fn list_incomplete(&self) -> Result<Vec<Uuid>, PricingError>;

    async fn health_check(&self) -> Result<(), PricingError>;
}

/// Process-local store for tests and single-node development.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    records: RwLock<BTreeMap<Uuid, PricingRecord>>,
    audit: RwLock<Vec<RebuildSummary>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit summaries in write order.
    pub async fn summaries(&self) -> Vec<RebuildSummary> {
        self.audit.read().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn insert_record(&self, record: &PricingRecord) -> Result<(), PricingError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.record_id) {
            return Err(PricingError::Persistence(format!(
                "record {} already exists",
                record.record_id
            )));
        }
        records.insert(record.record_id, record.clone());
        Ok(())
    }

    async fn get_record(&self, record_id: Uuid) -> Result<Option<PricingRecord>, PricingError> {
        Ok(self.records.read().await.get(&record_id).cloned())
    }

    async fn save_snapshot(
        &self,
        record_id: Uuid,
        snapshot: &PricingSnapshot,
        summary: &RebuildSummary,
    ) -> Result<(), PricingError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&record_id)
            .ok_or_else(|| PricingError::NotFound(format!("record {} not found", record_id)))?;
        record.snapshot = Some(snapshot.clone());
        record.snapshot_complete = true;
        self.audit.write().await.push(summary.clone());
        Ok(())
    }

    async fn list_incomplete(&self) -> Result<Vec<Uuid>, PricingError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.needs_rebuild())
            .map(|r| r.record_id)
            .collect())
    }

    async fn health_check(&self) -> Result<(), PricingError> {
        Ok(())
    }
}
