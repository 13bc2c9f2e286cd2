//! Sampler/reporter scheduling under paused time.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use metrix_agent::agent::{POLL_COUNT, RANDOM_VALUE};
use metrix_agent::config::AgentSection;
use metrix_agent::runtime_stats::RuntimeStats;
use metrix_agent::{Agent, MetricsSink};
use metrix_core::error::{MetrixError, Result};
use metrix_core::metric::{Metric, MetricKind};

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Metric>>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn batches(&self) -> Vec<Vec<Metric>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn push_batch(&self, batch: &[Metric]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MetrixError::ReportPush("collector unreachable".into()));
        }
        self.batches.lock().unwrap().push(batch.to_vec());
        Ok(())
    }

    async fn push_counter(&self, name: &str, value: i64) -> Result<()> {
        self.push_batch(&[Metric::counter(name, value)]).await
    }
}

fn section(poll_ms: u64, report_ms: u64) -> AgentSection {
    AgentSection {
        poll_interval_ms: poll_ms,
        report_interval_ms: report_ms,
        ..AgentSection::default()
    }
}

async fn run_for(agent: Agent, elapsed: Duration) -> Result<()> {
    let token = CancellationToken::new();
    let run = tokio::spawn(agent.run_until(token.clone()));
    tokio::time::sleep(elapsed).await;
    token.cancel();
    run.await.unwrap()
}

fn poll_counts(batches: &[Vec<Metric>]) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|b| b.iter())
        .filter(|m| m.id == POLL_COUNT)
        .map(|m| m.delta.unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn first_report_carries_one_sample() {
    let sink = Arc::new(RecordingSink::default());
    let agent = Agent::new(sink.clone(), &section(2_000, 3_000));

    run_for(agent, Duration::from_millis(3_500)).await.unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];

    for (name, _) in RuntimeStats::default().gauges() {
        assert!(
            batch
                .iter()
                .any(|m| m.id == name && m.kind().unwrap() == MetricKind::Gauge),
            "missing gauge {name}"
        );
    }
    assert_eq!(batch.iter().filter(|m| m.id == RANDOM_VALUE).count(), 1);

    let counters: Vec<_> = batch
        .iter()
        .filter(|m| m.kind().unwrap() == MetricKind::Counter)
        .collect();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].id, POLL_COUNT);
    assert_eq!(counters[0].delta, Some(1));

    // every metric must be accepted by the collector as-is
    assert!(batch.iter().all(|m| m.to_update().is_ok()));
}

#[tokio::test(start_paused = true)]
async fn poll_count_is_cumulative_across_reports() {
    let sink = Arc::new(RecordingSink::default());
    let agent = Agent::new(sink.clone(), &section(1_000, 2_200));

    run_for(agent, Duration::from_millis(5_000)).await.unwrap();

    assert_eq!(poll_counts(&sink.batches()), vec![2, 4]);
}

#[tokio::test(start_paused = true)]
async fn failed_push_does_not_stop_reporting() {
    let sink = Arc::new(RecordingSink::failing());
    let agent = Agent::new(sink.clone(), &section(500, 1_000));

    run_for(agent, Duration::from_millis(3_500)).await.unwrap();

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
    assert!(sink.batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_first_tick_reports_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let agent = Agent::new(sink.clone(), &section(2_000, 3_000));

    run_for(agent, Duration::from_millis(100)).await.unwrap();

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fresh_agent_has_a_seeded_snapshot() {
    let agent = Agent::new(Arc::new(RecordingSink::default()), &AgentSection::default());
    let batch = agent.build_batch().unwrap();

    assert_eq!(agent.poll_count(), 0);
    let total = batch.iter().find(|m| m.id == "TotalMemory").unwrap();
    assert!(total.value.unwrap() > 0.0);
    assert_eq!(poll_counts(&[batch]), vec![0]);
}

struct PanickingSink;

#[async_trait]
impl MetricsSink for PanickingSink {
    async fn push_batch(&self, _batch: &[Metric]) -> Result<()> {
        panic!("sink blew up");
    }

    async fn push_counter(&self, _name: &str, _value: i64) -> Result<()> {
        panic!("sink blew up");
    }
}

#[tokio::test(start_paused = true)]
async fn signal_stops_the_agent() {
    let sink = Arc::new(RecordingSink::default());
    let agent = Agent::new(sink.clone(), &section(1_000, 2_000));

    agent
        .run_until_signal(tokio::time::sleep(Duration::from_millis(2_500)))
        .await
        .unwrap();

    assert_eq!(sink.batches().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn task_failure_also_stops_the_signal_watcher() {
    let agent = Agent::new(Arc::new(PanickingSink), &section(1_000, 1_000));

    let (held, released) = tokio::sync::oneshot::channel::<()>();
    let signal = async move {
        let _held = held;
        std::future::pending::<()>().await;
    };

    let err = agent.run_until_signal(signal).await.unwrap_err();
    assert!(matches!(err, MetrixError::AgentTask(_)));

    // the watcher dropped the signal future, and with it the sender
    assert!(released.await.is_err());
}
