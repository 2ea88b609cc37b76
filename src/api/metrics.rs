//! Frontend metrics endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};

use super::json_body;
use crate::errors::AppError;
use crate::models::{MetricUpdate, MetricsSnapshot};
use crate::AppState;

/// GET /api/metrics - Current counters.
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// POST /api/metrics - Increment one counter.
pub async fn record_metric(
    State(state): State<AppState>,
    body: Result<Json<MetricUpdate>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let update = json_body(body)?;
    state.metrics.record_named(&update.kind, update.value)?;
    Ok(Json(json!({ "success": true })))
}
