//! Shared application state for the collector.

use std::sync::Arc;

use metrix_core::error::Result;

use crate::config::ServerConfig;
use crate::store::{self, Store};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
}

impl AppState {
    /// Build state from config: picks and initialises the store variant.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub async fn new(cfg: &ServerConfig) -> Result<Self> {
        let store = store::build(&cfg.storage).await?;
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
