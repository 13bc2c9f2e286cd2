//! Metric storage.
//!
//! `Store` is the capability set the HTTP layer calls into. Two variants exist:
//! [`MemStore`] keeps everything in process memory, [`DbStore`] persists to a
//! relational backend and routes its work through [`RetryPolicy`].
//! The variant is picked once at startup by [`build`].
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

pub mod database;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use metrix_core::error::Result;
use metrix_core::metric::{Metric, MetricKind};

use crate::config::{StorageBackend, StorageConfig};

pub use database::{is_connection_exception, DbPool, DbStore, Dialect};
pub use memory::MemStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Apply one metric (accumulate counter / replace gauge) and return it
    /// carrying the stored value after the update.
    async fn update(&self, metric: &Metric) -> Result<Metric>;

    /// Current stored value; `NotFound` if the metric was never written.
    async fn value(&self, name: &str, kind: MetricKind) -> Result<Metric>;

    async fn get_all_gauges(&self) -> Result<HashMap<String, f64>>;

    async fn get_all_counters(&self) -> Result<HashMap<String, i64>>;

    /// Apply every metric of the batch, or none of them.
    async fn updates(&self, batch: &[Metric]) -> Result<()>;

    /// Backend liveness. Never retried.
    async fn ping(&self) -> Result<()>;
}

/// Build the configured store variant.
pub async fn build(cfg: &StorageConfig) -> Result<Arc<dyn Store>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory metric store");
            Ok(Arc::new(MemStore::new()))
        }
        StorageBackend::Database => {
            let store = DbStore::connect(cfg).await?;
            tracing::info!(dialect = ?store.dialect(), "using database metric store");
            Ok(Arc::new(store))
        }
    }
}
