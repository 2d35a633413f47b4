use crate::dtos::PreviewRequest;
use crate::models::PricingPreview;
use crate::startup::AppState;
use axum::{extract::State, Json};

/// Live totals for the cart UI. Always 200; failures travel in the body.
pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Json<PricingPreview> {
    let preview = state
        .engine
        .preview_totals(
            &req.line_items,
            &req.adjustments,
            &state.pricing_config,
            &req.context,
        )
        .await;
    Json(preview)
}
