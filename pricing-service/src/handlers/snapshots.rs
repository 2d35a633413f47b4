use crate::dtos::{CaptureRecordRequest, RecordSnapshotResponse};
use crate::error::PricingError;
use crate::models::{BatchRebuildReport, RebuildSummary};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn capture_record(
    State(state): State<AppState>,
    Json(req): Json<CaptureRecordRequest>,
) -> Result<(StatusCode, Json<RecordSnapshotResponse>), AppError> {
    let record = state.snapshots.capture_snapshot(req.into()).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn get_record_snapshot(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<RecordSnapshotResponse>, AppError> {
    let record = state
        .store
        .get_record(record_id)
        .await?
        .ok_or_else(|| PricingError::NotFound(format!("record {} not found", record_id)))?;
    Ok(Json(record.into()))
}

pub async fn rebuild_snapshot(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<RebuildSummary>, AppError> {
    let summary = state.snapshots.rebuild_snapshot(record_id).await?;
    Ok(Json(summary))
}

pub async fn rebuild_incomplete(
    State(state): State<AppState>,
) -> Result<Json<BatchRebuildReport>, AppError> {
    let report = state.snapshots.rebuild_incomplete().await?;
    Ok(Json(report))
}
