//! Metrix agent: samples runtime stats and reports them to the collector.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use metrix_agent::{config, Agent, HttpSink};
use metrix_core::error::Result;

const DEFAULT_CONFIG: &str = "metrix-agent.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path)?;

    let sink = HttpSink::new(&cfg.agent.server, cfg.agent.request_timeout())?;
    info!(server = sink.base(), config = %path, "metrix-agent starting");

    let agent = Agent::new(Arc::new(sink), &cfg.agent);
    agent.run().await?;

    info!("metrix-agent stopped");
    Ok(())
}
