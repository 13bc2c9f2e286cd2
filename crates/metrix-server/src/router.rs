//! Axum router wiring.
//!
//! Collection routes are registered with and without the trailing slash.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::{summary, update, value};
use crate::{obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(summary::summary))
        .route("/update", post(update::update_json))
        .route("/update/", post(update::update_json))
        .route("/update/:mtype/:name/:value", post(update::update_path))
        .route("/updates", post(update::updates_json))
        .route("/updates/", post(update::updates_json))
        .route("/value", post(value::value_json))
        .route("/value/", post(value::value_json))
        .route("/value/:mtype/:name", get(value::value_path))
        .route("/ping", get(ops::ping))
        .route("/ping/", get(ops::ping))
        .layer(middleware::from_fn(obs::log_requests))
        .with_state(state)
}
