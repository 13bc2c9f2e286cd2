//! Operational HTTP endpoints.
//!
//! - `/ping` : backend reachability (500 when the store cannot be reached)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use crate::app_state::AppState;

pub async fn ping(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            warn!(err = %e, "store ping failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
