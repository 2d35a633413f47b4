//! Persisted order/invoice pricing records and rebuild reporting.

use super::{CustomAdjustment, LineItem, PricingContext, PricingSnapshot};
use crate::error::PricingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of record a snapshot is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Order,
    Invoice,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Order => "order",
            RecordKind::Invoice => "invoice",
        }
    }

    /// Parse a stored kind. Anything unknown means a corrupt row.
    pub fn parse(s: &str) -> Result<Self, PricingError> {
        match s {
            "order" => Ok(RecordKind::Order),
            "invoice" => Ok(RecordKind::Invoice),
            other => Err(PricingError::Persistence(format!(
                "unknown record kind '{}'",
                other
            ))),
        }
    }
}

/// The pricing inputs and current snapshot of an order or invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRecord {
    pub record_id: Uuid,
    pub kind: RecordKind,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub adjustments: Vec<CustomAdjustment>,
    #[serde(default)]
    pub context: PricingContext,
    #[serde(default)]
    pub snapshot: Option<PricingSnapshot>,
    /// False when the stored snapshot is missing or known to be stale.
    #[serde(default)]
    pub snapshot_complete: bool,
}

impl PricingRecord {
    pub fn new(kind: RecordKind, line_items: Vec<LineItem>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            kind,
            line_items,
            adjustments: Vec::new(),
            context: PricingContext::default(),
            snapshot: None,
            snapshot_complete: false,
        }
    }

    pub fn needs_rebuild(&self) -> bool {
        self.snapshot.is_none() || !self.snapshot_complete
    }
}

/// Audit summary written alongside a rebuilt snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub record_id: Uuid,
    pub kind: RecordKind,
    pub items_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_total: Option<Decimal>,
    pub new_total: Decimal,
}

impl RebuildSummary {
    /// Human-readable line for the audit log.
    pub fn message(&self) -> String {
        format!(
            "Rebuilt {} {} snapshot: {} items, total {}",
            self.kind.as_str(),
            self.record_id,
            self.items_count,
            self.new_total
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Updated,
    Skipped,
    Failed,
}

impl RebuildOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RebuildOutcome::Updated => "updated",
            RebuildOutcome::Skipped => "skipped",
            RebuildOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildFailure {
    pub record_id: Uuid,
    pub error: String,
}

/// Counts from a best-effort batch rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRebuildReport {
    pub updated: u32,
    pub failed: u32,
    pub skipped: u32,
    pub failures: Vec<RebuildFailure>,
}

impl BatchRebuildReport {
    pub fn record(&mut self, outcome: RebuildOutcome) {
        match outcome {
            RebuildOutcome::Updated => self.updated += 1,
            RebuildOutcome::Skipped => self.skipped += 1,
            RebuildOutcome::Failed => self.failed += 1,
        }
    }

    pub fn processed(&self) -> u32 {
        self.updated + self.failed + self.skipped
    }
}
