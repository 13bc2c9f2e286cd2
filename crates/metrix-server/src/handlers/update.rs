use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use metrix_core::metric::Metric;

use super::{decode_json, ApiResult};
use crate::app_state::AppState;

/// `POST /update/` with a JSON metric; answers with the stored value.
pub async fn update_json(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Metric>> {
    let metric: Metric = decode_json(&body)?;
    let stored = state.store().update(&metric).await?;
    Ok(Json(stored))
}

/// `POST /update/:mtype/:name/:value`.
pub async fn update_path(
    State(state): State<AppState>,
    Path((mtype, name, raw)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let metric = Metric::from_parts(&mtype, &name, &raw)?;
    state.store().update(&metric).await?;
    Ok(StatusCode::OK)
}

/// `POST /updates/` with a JSON array, applied as one batch.
pub async fn updates_json(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let batch: Vec<Metric> = decode_json(&body)?;
    debug!(len = batch.len(), "applying batch");
    state.store().updates(&batch).await?;
    Ok(StatusCode::OK)
}
