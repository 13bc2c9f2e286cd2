//! Metric value model and wire format.
//!
//! Two kinds live in separate namespaces: counters accumulate integer deltas,
//! gauges hold the last written float. `Metric` is the JSON shape exchanged
//! between agent and collector; `MetricUpdate` is its validated form that the
//! stores actually apply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MetrixError, Result};

/// Metric kind. Names are unique per kind, not across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    /// Wire name (`"counter"` / `"gauge"`).
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(MetrixError::InvalidKind(other.to_string())),
        }
    }
}

/// Wire model (JSON).
///
/// `type` is kept as a raw string so an unknown kind is reported as
/// `InvalidKind` by the store instead of failing JSON decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metric {
    /// Metric name.
    pub id: String,
    /// Metric kind (`"counter"` / `"gauge"`).
    #[serde(rename = "type")]
    pub mtype: String,
    /// Counter delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    /// Gauge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Metric {
    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Self {
            id: name.into(),
            mtype: MetricKind::Counter.as_str().to_string(),
            delta: Some(delta),
            value: None,
        }
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            id: name.into(),
            mtype: MetricKind::Gauge.as_str().to_string(),
            delta: None,
            value: Some(value),
        }
    }

    /// Metric reference without a value (used for reads).
    pub fn query(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            id: name.into(),
            mtype: kind.as_str().to_string(),
            delta: None,
            value: None,
        }
    }

    /// Build a metric from the URL form `/{type}/{name}/{value}`.
    pub fn from_parts(mtype: &str, name: &str, raw: &str) -> Result<Self> {
        match mtype.parse::<MetricKind>()? {
            MetricKind::Counter => {
                let delta = raw.parse::<i64>().map_err(|e| {
                    MetrixError::BadRequest(format!("counter {name}: invalid delta {raw:?}: {e}"))
                })?;
                Ok(Self::counter(name, delta))
            }
            MetricKind::Gauge => {
                let value = raw.parse::<f64>().map_err(|e| {
                    MetrixError::BadRequest(format!("gauge {name}: invalid value {raw:?}: {e}"))
                })?;
                Ok(Self::gauge(name, value))
            }
        }
    }

    pub fn kind(&self) -> Result<MetricKind> {
        self.mtype.parse()
    }

    /// The value this metric carries for its own kind, if any.
    pub fn stored_value(&self) -> Option<MetricValue> {
        match self.kind().ok()? {
            MetricKind::Counter => self.delta.map(MetricValue::Counter),
            MetricKind::Gauge => self.value.map(MetricValue::Gauge),
        }
    }

    /// Validate into the form a store applies.
    pub fn to_update(&self) -> Result<MetricUpdate> {
        let kind = self.kind()?;
        if self.id.is_empty() {
            return Err(MetrixError::BadRequest(format!("{kind} name must not be empty")));
        }

        let missing = || MetrixError::MissingValue {
            kind,
            name: self.id.clone(),
        };

        match kind {
            MetricKind::Counter => Ok(MetricUpdate::Counter {
                name: self.id.clone(),
                delta: self.delta.ok_or_else(missing)?,
            }),
            MetricKind::Gauge => {
                let value = self.value.ok_or_else(missing)?;
                if !value.is_finite() {
                    return Err(MetrixError::BadRequest(format!(
                        "gauge {}: value must be finite",
                        self.id
                    )));
                }
                Ok(MetricUpdate::Gauge {
                    name: self.id.clone(),
                    value,
                })
            }
        }
    }
}

/// Validated update: accumulate for counters, replace for gauges.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricUpdate {
    Counter { name: String, delta: i64 },
    Gauge { name: String, value: f64 },
}

impl MetricUpdate {
    pub fn name(&self) -> &str {
        match self {
            MetricUpdate::Counter { name, .. } | MetricUpdate::Gauge { name, .. } => name,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricUpdate::Counter { .. } => MetricKind::Counter,
            MetricUpdate::Gauge { .. } => MetricKind::Gauge,
        }
    }
}

/// Stored value of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(i64),
    Gauge(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(v) => write!(f, "{v}"),
            MetricValue::Gauge(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_is_case_sensitive() {
        assert_eq!("counter".parse::<MetricKind>().ok(), Some(MetricKind::Counter));
        assert!(matches!(
            "Gauge".parse::<MetricKind>(),
            Err(MetrixError::InvalidKind(k)) if k == "Gauge"
        ));
    }

    #[test]
    fn missing_value_is_reported_per_kind() {
        let m = Metric::query("hits", MetricKind::Counter);
        assert!(matches!(
            m.to_update(),
            Err(MetrixError::MissingValue { kind: MetricKind::Counter, .. })
        ));

        // a delta does not satisfy a gauge
        let mut g = Metric::counter("temp", 1);
        g.mtype = "gauge".into();
        assert!(matches!(
            g.to_update(),
            Err(MetrixError::MissingValue { kind: MetricKind::Gauge, .. })
        ));
    }

    #[test]
    fn url_form_parses_by_kind() {
        let c = Metric::from_parts("counter", "hits", "5").unwrap();
        assert_eq!(c.delta, Some(5));

        let g = Metric::from_parts("gauge", "temp", "3.5").unwrap();
        assert_eq!(g.value, Some(3.5));

        assert!(matches!(
            Metric::from_parts("counter", "hits", "1.5"),
            Err(MetrixError::BadRequest(_))
        ));
        assert!(matches!(
            Metric::from_parts("timer", "t", "1"),
            Err(MetrixError::InvalidKind(_))
        ));
    }

    #[test]
    fn non_finite_gauge_is_rejected() {
        assert!(Metric::gauge("temp", f64::NAN).to_update().is_err());
    }

    #[test]
    fn stored_value_follows_kind() {
        assert_eq!(Metric::counter("hits", 3).stored_value(), Some(MetricValue::Counter(3)));
        assert_eq!(Metric::query("temp", MetricKind::Gauge).stored_value(), None);
    }

    #[test]
    fn value_display_matches_plain_text_route() {
        assert_eq!(MetricValue::Counter(12).to_string(), "12");
        assert_eq!(MetricValue::Gauge(9.1).to_string(), "9.1");
    }
}
