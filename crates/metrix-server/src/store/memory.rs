use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use metrix_core::error::{MetrixError, Result};
use metrix_core::metric::{Metric, MetricKind, MetricUpdate};

use super::Store;

#[derive(Debug, Default)]
struct Tables {
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

impl Tables {
    fn counter_after(&self, name: &str, delta: i64) -> Result<i64> {
        self.counters
            .get(name)
            .copied()
            .unwrap_or(0)
            .checked_add(delta)
            .ok_or_else(|| MetrixError::BadRequest(format!("counter {name} would overflow")))
    }
}

/// Volatile store: both namespaces behind one mutex.
///
/// The lock is held only for the map access itself; nothing awaits while it
/// is taken.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: Mutex<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        // Poisoned mutex means a panic mid-update; surface it instead of panicking again.
        self.tables
            .lock()
            .map_err(|_| MetrixError::Internal("metric store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemStore {
    async fn update(&self, metric: &Metric) -> Result<Metric> {
        let update = metric.to_update()?;
        let mut t = self.lock()?;

        match update {
            MetricUpdate::Counter { name, delta } => {
                let total = t.counter_after(&name, delta)?;
                t.counters.insert(name.clone(), total);
                Ok(Metric::counter(name, total))
            }
            MetricUpdate::Gauge { name, value } => {
                t.gauges.insert(name.clone(), value);
                Ok(Metric::gauge(name, value))
            }
        }
    }

    async fn value(&self, name: &str, kind: MetricKind) -> Result<Metric> {
        let t = self.lock()?;
        let found = match kind {
            MetricKind::Counter => t.counters.get(name).map(|v| Metric::counter(name, *v)),
            MetricKind::Gauge => t.gauges.get(name).map(|v| Metric::gauge(name, *v)),
        };
        found.ok_or_else(|| MetrixError::NotFound {
            kind,
            name: name.to_string(),
        })
    }

    async fn get_all_gauges(&self) -> Result<HashMap<String, f64>> {
        Ok(self.lock()?.gauges.clone())
    }

    async fn get_all_counters(&self) -> Result<HashMap<String, i64>> {
        Ok(self.lock()?.counters.clone())
    }

    async fn updates(&self, batch: &[Metric]) -> Result<()> {
        // validate everything before touching state
        let updates = batch
            .iter()
            .map(Metric::to_update)
            .collect::<Result<Vec<_>>>()?;

        let mut t = self.lock()?;

        // stage counter totals so an overflow rejects the whole batch
        let mut counters: HashMap<&str, i64> = HashMap::new();
        for u in &updates {
            if let MetricUpdate::Counter { name, delta } = u {
                let current = match counters.get(name.as_str()) {
                    Some(v) => *v,
                    None => t.counter_after(name, 0)?,
                };
                let total = current.checked_add(*delta).ok_or_else(|| {
                    MetrixError::BadRequest(format!("counter {name} would overflow"))
                })?;
                counters.insert(name.as_str(), total);
            }
        }

        for (name, total) in counters {
            t.counters.insert(name.to_string(), total);
        }
        for u in updates {
            if let MetricUpdate::Gauge { name, value } = u {
                t.gauges.insert(name, value);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
