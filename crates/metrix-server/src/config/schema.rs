use serde::Deserialize;
use metrix_core::error::{MetrixError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetrixError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.storage.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Store variant, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Database,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
            retry: RetryConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Database
            && self.database_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(MetrixError::Config(
                "storage.database_url is required when storage.backend is database".into(),
            ));
        }
        if !(1..=100).contains(&self.max_connections) {
            return Err(MetrixError::Config(
                "storage.max_connections must be between 1 and 100".into(),
            ));
        }
        self.retry.validate()
    }
}

/// Linear backoff for transient backend failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first failure; 0 disables retrying.
    #[serde(default = "default_retry_count")]
    pub count: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_delay_increment_ms")]
    pub delay_increment_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            count: default_retry_count(),
            initial_delay_ms: default_initial_delay_ms(),
            delay_increment_ms: default_delay_increment_ms(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count > 10 {
            return Err(MetrixError::Config(
                "storage.retry.count must be at most 10".into(),
            ));
        }
        if self.initial_delay_ms > 60_000 || self.delay_increment_ms > 60_000 {
            return Err(MetrixError::Config(
                "storage.retry delays must be at most 60000ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}
fn default_retry_count() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_delay_increment_ms() -> u64 {
    2000
}
