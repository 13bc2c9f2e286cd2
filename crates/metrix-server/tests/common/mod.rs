//! Behaviour shared by every `Store` variant.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;

use metrix_core::error::MetrixError;
use metrix_core::metric::{Metric, MetricKind};
use metrix_server::store::Store;

pub async fn counter_accumulates(store: &dyn Store) {
    let first = store.update(&Metric::counter("hits", 5)).await.unwrap();
    assert_eq!(first.delta, Some(5));

    let second = store.update(&Metric::counter("hits", 7)).await.unwrap();
    assert_eq!(second.delta, Some(12));

    let got = store.value("hits", MetricKind::Counter).await.unwrap();
    assert_eq!(got.delta, Some(12));
}

pub async fn gauge_last_write_wins(store: &dyn Store) {
    store.update(&Metric::gauge("temp", 3.5)).await.unwrap();
    let out = store.update(&Metric::gauge("temp", 9.1)).await.unwrap();
    assert_eq!(out.value, Some(9.1));

    let got = store.value("temp", MetricKind::Gauge).await.unwrap();
    assert_eq!(got.value, Some(9.1));
}

pub async fn kinds_are_separate_namespaces(store: &dyn Store) {
    store.update(&Metric::counter("load", 2)).await.unwrap();
    store.update(&Metric::gauge("load", 0.75)).await.unwrap();

    assert_eq!(store.value("load", MetricKind::Counter).await.unwrap().delta, Some(2));
    assert_eq!(store.value("load", MetricKind::Gauge).await.unwrap().value, Some(0.75));
}

pub async fn missing_metric_is_not_found(store: &dyn Store) {
    let err = store.value("nope", MetricKind::Gauge).await.unwrap_err();
    assert!(matches!(err, MetrixError::NotFound { kind: MetricKind::Gauge, .. }));
    assert_eq!(err.client_code().as_str(), "NOT_FOUND");
}

pub async fn invalid_updates_are_rejected(store: &dyn Store) {
    let mut bad_kind = Metric::counter("hits", 1);
    bad_kind.mtype = "histogram".into();
    assert!(matches!(
        store.update(&bad_kind).await,
        Err(MetrixError::InvalidKind(_))
    ));

    let no_delta = Metric::query("hits", MetricKind::Counter);
    assert!(matches!(
        store.update(&no_delta).await,
        Err(MetrixError::MissingValue { .. })
    ));

    assert!(store.get_all_counters().await.unwrap().is_empty());
}

pub async fn batch_applies_every_metric(store: &dyn Store) {
    store.update(&Metric::counter("PollCount", 10)).await.unwrap();

    let batch = vec![
        Metric::gauge("Alloc", 1024.0),
        Metric::counter("PollCount", 3),
        Metric::gauge("Alloc", 2048.0),
        Metric::counter("PollCount", 2),
    ];
    store.updates(&batch).await.unwrap();

    assert_eq!(store.value("PollCount", MetricKind::Counter).await.unwrap().delta, Some(15));

    let gauges = store.get_all_gauges().await.unwrap();
    assert_eq!(gauges.len(), 1);
    assert_eq!(gauges["Alloc"], 2048.0);
}

pub async fn malformed_batch_leaves_no_trace(store: &dyn Store) {
    store.update(&Metric::counter("PollCount", 1)).await.unwrap();

    let batch = vec![
        Metric::counter("PollCount", 5),
        Metric::gauge("HeapInuse", 4096.0),
        Metric::query("Broken", MetricKind::Gauge),
        Metric::gauge("RandomValue", 0.25),
    ];
    let err = store.updates(&batch).await.unwrap_err();
    assert!(matches!(err, MetrixError::MissingValue { .. }));

    assert_eq!(store.value("PollCount", MetricKind::Counter).await.unwrap().delta, Some(1));
    assert!(store.get_all_gauges().await.unwrap().is_empty());
}

pub async fn large_counters_round_trip(store: &dyn Store) {
    let big = i64::from(i32::MAX) + 10;
    let first = store.update(&Metric::counter("bytes", big)).await.unwrap();
    assert_eq!(first.delta, Some(big));

    let second = store.update(&Metric::counter("bytes", 1 << 40)).await.unwrap();
    assert_eq!(second.delta, Some(big + (1 << 40)));

    store.updates(&[Metric::counter("max", i64::MAX)]).await.unwrap();

    let got = store.value("bytes", MetricKind::Counter).await.unwrap();
    assert_eq!(got.delta, Some(big + (1 << 40)));

    let all = store.get_all_counters().await.unwrap();
    assert_eq!(all["bytes"], big + (1 << 40));
    assert_eq!(all["max"], i64::MAX);
}

pub async fn overflowing_counter_is_rejected(store: &dyn Store) {
    store.update(&Metric::counter("big", i64::MAX - 1)).await.unwrap();
    store.update(&Metric::counter("low", i64::MIN + 1)).await.unwrap();

    assert!(store.update(&Metric::counter("big", 5)).await.is_err());
    assert!(store.update(&Metric::counter("low", -5)).await.is_err());

    let all = store.get_all_counters().await.unwrap();
    assert_eq!(all["big"], i64::MAX - 1);
    assert_eq!(all["low"], i64::MIN + 1);
}

pub async fn overflowing_batch_is_rejected_whole(store: &dyn Store) {
    store.update(&Metric::counter("big", i64::MAX - 1)).await.unwrap();

    // the overflow sits after statements that already ran in the batch
    let batch = vec![
        Metric::counter("fresh", 5),
        Metric::gauge("side", 1.0),
        Metric::counter("big", 5),
        Metric::gauge("after", 2.0),
    ];
    assert!(store.updates(&batch).await.is_err());

    assert!(store.get_all_gauges().await.unwrap().is_empty());
    let counters = store.get_all_counters().await.unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters["big"], i64::MAX - 1);
    assert!(matches!(
        store.value("fresh", MetricKind::Counter).await,
        Err(MetrixError::NotFound { .. })
    ));
}

pub async fn concurrent_counter_updates_sum(store: Arc<dyn Store>) {
    let mut handles = Vec::new();
    for delta in 1..=20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.update(&Metric::counter("requests", delta)).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let total = store.value("requests", MetricKind::Counter).await.unwrap();
    assert_eq!(total.delta, Some((1..=20).sum()));
}

pub async fn concurrent_gauge_writes_pick_one_writer(store: Arc<dyn Store>) {
    let candidates: Vec<f64> = (0..16).map(|i| i as f64 * 1.5).collect();
    let mut handles = Vec::new();
    for v in candidates.clone() {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.update(&Metric::gauge("cpu", v)).await.unwrap();
            // concurrent reads only ever see a whole written value
            store.value("cpu", MetricKind::Gauge).await.unwrap().value.unwrap()
        }));
    }

    for h in handles {
        let seen = h.await.unwrap();
        assert!(candidates.contains(&seen));
    }

    let last = store.value("cpu", MetricKind::Gauge).await.unwrap().value.unwrap();
    assert!(candidates.contains(&last));
}
