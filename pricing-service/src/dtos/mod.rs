//! Request and response bodies for the HTTP surface.

use crate::models::{
    CustomAdjustment, LineItem, PricingContext, PricingRecord, PricingSnapshot, RecordKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub adjustments: Vec<CustomAdjustment>,
    #[serde(default)]
    pub context: PricingContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecordRequest {
    /// Generated when absent.
    #[serde(default)]
    pub record_id: Option<Uuid>,
    pub kind: RecordKind,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub adjustments: Vec<CustomAdjustment>,
    #[serde(default)]
    pub context: PricingContext,
}

impl From<CaptureRecordRequest> for PricingRecord {
    fn from(req: CaptureRecordRequest) -> Self {
        let mut record = PricingRecord::new(req.kind, req.line_items);
        if let Some(record_id) = req.record_id {
            record.record_id = record_id;
        }
        record.adjustments = req.adjustments;
        record.context = req.context;
        record
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshotResponse {
    pub record_id: Uuid,
    pub kind: RecordKind,
    pub snapshot: Option<PricingSnapshot>,
}

impl From<PricingRecord> for RecordSnapshotResponse {
    fn from(record: PricingRecord) -> Self {
        Self {
            record_id: record.record_id,
            kind: record.kind,
            snapshot: record.snapshot,
        }
    }
}
