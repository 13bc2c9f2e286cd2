//! metrix core: the metric value model, wire format, and shared error types.
//!
//! This crate defines the contracts shared by the collector and the reporting
//! agent. It carries no transport or runtime dependencies so both sides (and
//! tests) can depend on it without pulling in tokio, axum, or sqlx.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed metrics surface as `MetrixError` so a bad request can never take
//! the collector down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;

/// Shared result type.
pub use error::{MetrixError, Result};
pub use metric::{Metric, MetricKind, MetricUpdate, MetricValue};
