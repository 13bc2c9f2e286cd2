//! Sampling and reporting loop.
//!
//! The sampler refreshes the runtime snapshot and bumps the poll counter
//! every `poll_interval`; the reporter pushes the snapshot, a random gauge and
//! the poll counter every `report_interval`. Both stop when the shared token
//! is cancelled. A failed push is logged and skipped.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use metrix_core::error::{MetrixError, Result};
use metrix_core::metric::Metric;

use crate::config::AgentSection;
use crate::runtime_stats::{RuntimeStats, StatsReader};
use crate::sink::MetricsSink;
use crate::tasks::TaskGroup;

pub const POLL_COUNT: &str = "PollCount";
pub const RANDOM_VALUE: &str = "RandomValue";

pub struct Agent {
    report_interval: Duration,
    poll_interval: Duration,
    sink: Arc<dyn MetricsSink>,
    poll_count: AtomicI64,
    stats: RwLock<RuntimeStats>,
    reader: Mutex<StatsReader>,
}

impl Agent {
    /// Seeds the snapshot before any task runs.
    pub fn new(sink: Arc<dyn MetricsSink>, cfg: &AgentSection) -> Self {
        let mut reader = StatsReader::new();
        let stats = reader.read();

        Self {
            report_interval: cfg.report_interval(),
            poll_interval: cfg.poll_interval(),
            sink,
            poll_count: AtomicI64::new(0),
            stats: RwLock::new(stats),
            reader: Mutex::new(reader),
        }
    }

    pub fn poll_count(&self) -> i64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    /// Run until SIGINT/SIGTERM or a task failure.
    pub async fn run(self) -> Result<()> {
        self.run_until_signal(shutdown_signal()).await
    }

    /// Run until `signal` resolves or a task fails. The signal watcher is
    /// stopped either way.
    pub async fn run_until_signal<S>(self, signal: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on(signal, token.clone()));

        let result = self.run_until(token.clone()).await;

        // a task failure only cancels the group's child token
        token.cancel();
        if let Err(e) = watcher.await {
            warn!(err = %e, "signal watcher failed");
        }
        result
    }

    /// Run until `token` is cancelled or a task fails.
    pub async fn run_until(self, token: CancellationToken) -> Result<()> {
        let agent = Arc::new(self);
        let mut group = TaskGroup::new(&token);

        let (a, t) = (Arc::clone(&agent), group.token());
        group.spawn("sampler", async move { a.sample_loop(t).await });

        let (a, t) = (agent, group.token());
        group.spawn("reporter", async move { a.report_loop(t).await });

        group.wait().await
    }

    async fn sample_loop(&self, token: CancellationToken) -> Result<()> {
        info!(interval_ms = self.poll_interval.as_millis() as u64, "sampler started");
        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => self.sample()?,
            }
        }

        info!("sampler stopped");
        Ok(())
    }

    async fn report_loop(&self, token: CancellationToken) -> Result<()> {
        info!(interval_ms = self.report_interval.as_millis() as u64, "reporter started");
        let mut tick = interval(self.report_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => self.report().await?,
            }
        }

        info!("reporter stopped");
        Ok(())
    }

    fn sample(&self) -> Result<()> {
        let fresh = self
            .reader
            .lock()
            .map_err(|_| MetrixError::Internal("stats reader lock poisoned".into()))?
            .read();

        *self
            .stats
            .write()
            .map_err(|_| MetrixError::Internal("stats snapshot lock poisoned".into()))? = fresh;

        let n = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(poll_count = n, "runtime stats sampled");
        Ok(())
    }

    async fn report(&self) -> Result<()> {
        let batch = self.build_batch()?;
        match self.sink.push_batch(&batch).await {
            Ok(()) => debug!(len = batch.len(), "report pushed"),
            Err(e) => warn!(err = %e, len = batch.len(), "report push failed"),
        }
        Ok(())
    }

    /// Snapshot gauges, one random gauge, and the poll counter.
    pub fn build_batch(&self) -> Result<Vec<Metric>> {
        let stats = self
            .stats
            .read()
            .map_err(|_| MetrixError::Internal("stats snapshot lock poisoned".into()))?
            .clone();

        let mut batch: Vec<Metric> = stats
            .gauges()
            .into_iter()
            .map(|(name, v)| Metric::gauge(name, v))
            .collect();
        batch.push(Metric::gauge(RANDOM_VALUE, rand::random::<f64>()));
        batch.push(Metric::counter(POLL_COUNT, self.poll_count()));
        Ok(batch)
    }
}

async fn cancel_on<S: Future<Output = ()>>(signal: S, token: CancellationToken) {
    tokio::select! {
        _ = signal => {
            info!("shutdown signal received");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(err = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(err = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
