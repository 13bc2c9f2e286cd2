//! Metrix collector library entry.
//!
//! Holds the store variants, the retry policy the persistent store runs
//! through, and the thin HTTP layer in front of them. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod handlers;
pub mod obs;
pub mod ops;
pub mod retry;
pub mod router;
pub mod store;
