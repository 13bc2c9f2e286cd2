use std::time::Duration;

use serde::Deserialize;
use metrix_core::error::{MetrixError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub version: u32,

    #[serde(default)]
    pub agent: AgentSection,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetrixError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.agent.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Collector base address; `http://` is assumed when no scheme is given.
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request transport timeout; 0 leaves requests unbounded.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            server: default_server(),
            report_interval_ms: default_report_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AgentSection {
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(MetrixError::Config("agent.server must not be empty".into()));
        }
        if self.report_interval_ms == 0 || self.poll_interval_ms == 0 {
            return Err(MetrixError::Config(
                "agent.report_interval_ms and agent.poll_interval_ms must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn default_server() -> String {
    "http://localhost:8080".into()
}
fn default_report_interval_ms() -> u64 {
    10_000
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
