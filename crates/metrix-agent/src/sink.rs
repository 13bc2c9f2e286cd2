//! Transport from agent to collector.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use metrix_core::error::{MetrixError, Result};
use metrix_core::metric::Metric;

/// Where reports go. Each call is one fallible round trip.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Push a whole report. The reporter sends every tick through this.
    async fn push_batch(&self, batch: &[Metric]) -> Result<()>;

    /// Push one counter on its own. Part of the collector contract for
    /// callers outside the report loop; the reporter carries `PollCount`
    /// inside its batch instead.
    async fn push_counter(&self, name: &str, value: i64) -> Result<()>;
}

/// JSON over HTTP to a metrix collector (`/updates/`, `/update/`).
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    base: String,
}

impl HttpSink {
    pub fn new(server: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| MetrixError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base: base_url(server),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{path}", self.base);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| MetrixError::ReportPush(format!("POST {url}: {e}")))?;

        let status = res.status();
        debug!(%url, %status, "collector answered");
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(MetrixError::ReportPush(format!(
                "POST {url}: {status}: {}",
                text.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for HttpSink {
    async fn push_batch(&self, batch: &[Metric]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.post("/updates/", batch).await
    }

    async fn push_counter(&self, name: &str, value: i64) -> Result<()> {
        self.post("/update/", &Metric::counter(name, value)).await
    }
}

fn base_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("http://{server}")
    }
}
