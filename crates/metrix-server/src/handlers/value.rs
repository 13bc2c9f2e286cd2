use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use metrix_core::error::MetrixError;
use metrix_core::metric::{Metric, MetricKind};

use super::{decode_json, ApiResult};
use crate::app_state::AppState;

/// `POST /value/` with `{id, type}`; answers with the full metric.
pub async fn value_json(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Metric>> {
    let query: Metric = decode_json(&body)?;
    let kind = query.kind()?;
    let found = state.store().value(&query.id, kind).await?;
    Ok(Json(found))
}

/// `GET /value/:mtype/:name` as plain text.
pub async fn value_path(
    State(state): State<AppState>,
    Path((mtype, name)): Path<(String, String)>,
) -> ApiResult<String> {
    let kind: MetricKind = mtype.parse()?;
    let found = state.store().value(&name, kind).await?;
    let value = found
        .stored_value()
        .ok_or_else(|| MetrixError::Internal(format!("{kind} {name}: store returned no value")))?;
    Ok(value.to_string())
}
