// ── Telemetry snapshots and control vocabulary ──

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Which statistics view to fetch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Port,
    Flow,
}

/// Which control sub-state a start/stop request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Transmit,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    Stop,
}

/// Metric name -> value for one entity.
pub type Metrics = BTreeMap<String, Value>;

/// Device-reported metrics at one instant, keyed by entity name.
///
/// Opaque to the session core beyond being handed to a caller predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub kind: TelemetryKind,
    pub rows: BTreeMap<String, Metrics>,
}

impl TelemetrySnapshot {
    pub fn new(kind: TelemetryKind) -> Self {
        Self {
            kind,
            rows: BTreeMap::new(),
        }
    }

    /// Builder-style row insert. Metrics for an existing entity are merged.
    #[must_use]
    pub fn with_metric(
        mut self,
        entity: impl Into<String>,
        metric: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.rows
            .entry(entity.into())
            .or_default()
            .insert(metric.into(), value.into());
        self
    }

    pub fn metric(&self, entity: &str, metric: &str) -> Option<&Value> {
        self.rows.get(entity)?.get(metric)
    }

    pub fn metric_u64(&self, entity: &str, metric: &str) -> Option<u64> {
        self.metric(entity, metric).and_then(Value::as_u64)
    }

    pub fn metric_str(&self, entity: &str, metric: &str) -> Option<&str> {
        self.metric(entity, metric).and_then(Value::as_str)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
