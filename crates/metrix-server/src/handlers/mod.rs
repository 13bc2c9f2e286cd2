//! HTTP handlers over the metric store.
//!
//! Request bodies are read as raw bytes and decoded here, so a malformed
//! payload is reported through the same error path as a malformed metric.

pub mod summary;
pub mod update;
pub mod value;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use metrix_core::error::{ClientCode, MetrixError, Result};

/// Store error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MetrixError);

impl From<MetrixError> for ApiError {
    fn from(e: MetrixError) -> Self {
        Self(e)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_for(code);
        if status.is_server_error() {
            error!(code = code.as_str(), err = %self.0, "request failed");
        } else {
            debug!(code = code.as_str(), err = %self.0, "request rejected");
        }
        (status, self.0.to_string()).into_response()
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| MetrixError::BadRequest(format!("invalid json: {e}")))
}
