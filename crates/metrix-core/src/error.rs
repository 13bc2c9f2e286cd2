//! Shared error type across metrix crates.

use thiserror::Error;

use crate::metric::MetricKind;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed metric.
    BadRequest,
    /// No value stored for the requested metric.
    NotFound,
    /// Backend temporarily unreachable.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetrixError>;

/// Unified error type used by core, collector, and agent.
#[derive(Debug, Error)]
pub enum MetrixError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown metric type: {0}")]
    InvalidKind(String),
    #[error("{kind} {name}: value is missing")]
    MissingValue { kind: MetricKind, name: String },
    #[error("{kind} {name} not found")]
    NotFound { kind: MetricKind, name: String },
    #[error("backend unreachable: {0}")]
    TransientConnectivity(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("schema bootstrap failed: {0}")]
    SchemaBootstrap(String),
    #[error("report push failed: {0}")]
    ReportPush(String),
    #[error("agent task failed: {0}")]
    AgentTask(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetrixError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MetrixError::BadRequest(_)
            | MetrixError::InvalidKind(_)
            | MetrixError::MissingValue { .. }
            | MetrixError::Config(_) => ClientCode::BadRequest,
            MetrixError::NotFound { .. } => ClientCode::NotFound,
            MetrixError::TransientConnectivity(_) => ClientCode::Unavailable,
            MetrixError::Storage(_)
            | MetrixError::SchemaBootstrap(_)
            | MetrixError::ReportPush(_)
            | MetrixError::AgentTask(_)
            | MetrixError::Internal(_) => ClientCode::Internal,
        }
    }
}
