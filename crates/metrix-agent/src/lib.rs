//! Metrix reporting agent.
//!
//! Samples process and host runtime statistics and pushes them to a metrix
//! collector on a fixed schedule.

pub mod agent;
pub mod config;
pub mod runtime_stats;
pub mod sink;
pub mod tasks;

pub use agent::Agent;
pub use sink::{HttpSink, MetricsSink};
pub use tasks::TaskGroup;
