//! # Metrics Store Module
//!
//! Store condiviso delle metriche misurate durante un run.
//!
//! ## Responsabilità:
//! - Definisce `Metric` e `MetricCategory` (unità di misura per il rendering)
//! - `MetricsStore`: mappa nome → metrica, sicura sotto insert concorrenti
//! - `MetricsSnapshot`: copia immutabile presa dopo la barriera di fork-join
//!
//! ## Concorrenza:
//! - Lo store è un handle clonabile (`Arc<Mutex<HashMap>>`), nessuno stato globale
//! - `record` su nomi distinti può essere chiamato da più task in parallelo
//! - `record` concorrente sullo stesso nome è last-writer-wins: accettabile,
//!   nessun percorso del runner scrive lo stesso nome da due job
//! - `increment` è un read-modify-write atomico sotto lock (nessun lost update)
//! - `snapshot` va chiamato solo dopo che `run_batch` è ritornato

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Page load time in seconds
pub const LOAD_TIME: &str = "load_time";
/// Share of optimized images, in percent
pub const IMAGE_OPTIMIZATION: &str = "image_optimization";
/// Total stylesheet weight in KB
pub const CSS_SIZE: &str = "css_size";
/// Total script weight in KB
pub const JS_SIZE: &str = "js_size";

/// Unit family of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Time,
    SizeKb,
    Percentage,
    /// Unitless counter maintained by the orchestrator
    Count,
}

impl MetricCategory {
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Time => "s",
            Self::SizeKb => "KB",
            Self::Percentage => "%",
            Self::Count => "",
        }
    }
}

/// A single named measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub category: MetricCategory,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, category: MetricCategory) -> Self {
        Self {
            name: name.into(),
            value,
            category,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{}", self.name, self.value, self.category.unit())
    }
}

/// Thread-safe, name-keyed store shared by all jobs of a run
#[derive(Clone, Default)]
pub struct MetricsStore {
    inner: Arc<Mutex<HashMap<String, Metric>>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value under `name`, replacing any previous value
    pub async fn record(&self, name: impl Into<String>, value: f64, category: MetricCategory) {
        self.record_metric(Metric::new(name, value, category)).await;
    }

    /// Record an already-built metric
    pub async fn record_metric(&self, metric: Metric) {
        let mut metrics = self.inner.lock().await;
        metrics.insert(metric.name.clone(), metric);
    }

    /// Add `delta` to the counter `name` (created at zero) and return the new value
    pub async fn increment(&self, name: &str, delta: f64, category: MetricCategory) -> f64 {
        let mut metrics = self.inner.lock().await;
        let metric = metrics
            .entry(name.to_string())
            .or_insert_with(|| Metric::new(name, 0.0, category));
        metric.value += delta;
        metric.value
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Immutable point-in-time copy of every recorded metric
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self.inner.lock().await;
        MetricsSnapshot {
            metrics: metrics
                .iter()
                .map(|(name, metric)| (name.clone(), metric.clone()))
                .collect(),
        }
    }
}

/// Read-only view of the store, ordered by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    metrics: BTreeMap<String, Metric>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(|m| m.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.values()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FromIterator<Metric> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().map(|m| (m.name.clone(), m)).collect(),
        }
    }
}
