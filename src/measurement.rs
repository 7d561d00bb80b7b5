//! # Measurement Module
//!
//! Fase di analisi sequenziale: legge le metriche raw da una sorgente
//! pluggable e le registra nel `MetricsStore`.
//!
//! ## Responsabilità:
//! - `MeasurementSource`: trait per sorgenti di misura (stub, profiler, fixture)
//! - `FixedMeasurementSource`: valori costanti, inclusi quelli di riferimento
//! - `analyze`: misura ogni metrica una volta e continua anche se qualcuna
//!   non è disponibile (errore recuperabile)
//!
//! ## Metriche derivate:
//! - `image_optimization` = immagini ottimizzate / immagini totali * 100

use crate::{
    error::OptimizeError,
    metrics::{MetricCategory, MetricsStore, CSS_SIZE, IMAGE_OPTIMIZATION, JS_SIZE, LOAD_TIME},
    report::verdict,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Raw quantities a measurement source can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    LoadTime,
    TotalImages,
    OptimizedImages,
    CssSize,
    JsSize,
}

impl MetricId {
    pub fn key(&self) -> &'static str {
        match self {
            Self::LoadTime => "load_time",
            Self::TotalImages => "total_images_measured",
            Self::OptimizedImages => "optimized_images_measured",
            Self::CssSize => "css_size",
            Self::JsSize => "js_size",
        }
    }
}

/// Supplies raw metric values; expected to return promptly
pub trait MeasurementSource: Send + Sync {
    fn measure(&self, metric: MetricId) -> Result<f64, OptimizeError>;
}

/// Source backed by a fixed table of values
#[derive(Debug, Clone, Default)]
pub struct FixedMeasurementSource {
    values: HashMap<MetricId, f64>,
}

impl FixedMeasurementSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of the reference site: 1.2s load, 12/15 images, 45.2KB CSS, 28.7KB JS
    pub fn reference() -> Self {
        Self::new()
            .with(MetricId::LoadTime, 1.2)
            .with(MetricId::TotalImages, 15.0)
            .with(MetricId::OptimizedImages, 12.0)
            .with(MetricId::CssSize, 45.2)
            .with(MetricId::JsSize, 28.7)
    }

    pub fn with(mut self, metric: MetricId, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    pub fn without(mut self, metric: MetricId) -> Self {
        self.values.remove(&metric);
        self
    }
}

impl MeasurementSource for FixedMeasurementSource {
    fn measure(&self, metric: MetricId) -> Result<f64, OptimizeError> {
        self.values
            .get(&metric)
            .copied()
            .ok_or_else(|| OptimizeError::MeasurementUnavailable {
                metric: metric.key().to_string(),
                reason: "no value configured".to_string(),
            })
    }
}

/// What the analysis phase managed to record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub recorded: Vec<String>,
    pub unavailable: Vec<String>,
}

impl AnalysisOutcome {
    fn note(&mut self, name: &str, result: Result<(), OptimizeError>) {
        match result {
            Ok(()) => self.recorded.push(name.to_string()),
            Err(e) => {
                warn!("⚠️  {}", e);
                self.unavailable.push(name.to_string());
            }
        }
    }
}

/// Measure every metric once and record it into `store`
pub async fn analyze(source: &dyn MeasurementSource, store: &MetricsStore) -> AnalysisOutcome {
    info!("🔍 Analyzing site performance");

    let mut outcome = AnalysisOutcome::default();

    let direct = [
        (MetricId::LoadTime, LOAD_TIME, MetricCategory::Time),
        (MetricId::CssSize, CSS_SIZE, MetricCategory::SizeKb),
        (MetricId::JsSize, JS_SIZE, MetricCategory::SizeKb),
    ];

    for (id, name, category) in direct {
        let result = source.measure(id);
        if let Ok(value) = result {
            store.record(name, value, category).await;
            log_measurement(name, value, category);
        }
        outcome.note(name, result.map(|_| ()));
    }

    let result = image_optimization_rate(source);
    if let Ok(rate) = result {
        store.record(IMAGE_OPTIMIZATION, rate, MetricCategory::Percentage).await;
        log_measurement(IMAGE_OPTIMIZATION, rate, MetricCategory::Percentage);
    }
    outcome.note(IMAGE_OPTIMIZATION, result.map(|_| ()));

    info!(
        "Analysis finished: {} metrics recorded, {} unavailable",
        outcome.recorded.len(),
        outcome.unavailable.len()
    );
    outcome
}

fn image_optimization_rate(source: &dyn MeasurementSource) -> Result<f64, OptimizeError> {
    let total = source.measure(MetricId::TotalImages)?;
    let optimized = source.measure(MetricId::OptimizedImages)?;

    if total.is_nan() || total <= 0.0 {
        return Err(OptimizeError::MeasurementUnavailable {
            metric: IMAGE_OPTIMIZATION.to_string(),
            reason: "no images found".to_string(),
        });
    }

    // moltiplica prima di dividere: 12 su 15 deve dare esattamente 80.0
    Ok(optimized * 100.0 / total)
}

fn log_measurement(name: &str, value: f64, category: MetricCategory) {
    match verdict(name, value) {
        Some(v) if v.ok => info!("  {}: {}{} ✅ {}", name, value, category.unit(), v.text),
        Some(v) => info!("  {}: {}{} ⚠️  {}", name, value, category.unit(), v.text),
        None => info!("  {}: {}{}", name, value, category.unit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_analysis_records_four_metrics() {
        let store = MetricsStore::new();
        let outcome = analyze(&FixedMeasurementSource::reference(), &store).await;

        assert!(outcome.unavailable.is_empty());
        assert_eq!(outcome.recorded.len(), 4);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.value(LOAD_TIME), Some(1.2));
        assert_eq!(snapshot.value(IMAGE_OPTIMIZATION), Some(80.0));
        assert_eq!(snapshot.value(CSS_SIZE), Some(45.2));
        assert_eq!(snapshot.value(JS_SIZE), Some(28.7));
        assert_eq!(snapshot.get(CSS_SIZE).unwrap().category, MetricCategory::SizeKb);
    }

    #[tokio::test]
    async fn test_unavailable_measurement_does_not_abort_analysis() {
        let store = MetricsStore::new();
        let source = FixedMeasurementSource::reference().without(MetricId::JsSize);

        let outcome = analyze(&source, &store).await;

        assert_eq!(outcome.unavailable, vec![JS_SIZE.to_string()]);
        assert_eq!(outcome.recorded.len(), 3);
        let snapshot = store.snapshot().await;
        assert!(!snapshot.contains(JS_SIZE));
        assert!(snapshot.contains(LOAD_TIME));
    }

    #[tokio::test]
    async fn test_zero_images_makes_rate_unavailable() {
        let store = MetricsStore::new();
        let source = FixedMeasurementSource::reference()
            .with(MetricId::TotalImages, 0.0)
            .with(MetricId::OptimizedImages, 0.0);

        let outcome = analyze(&source, &store).await;

        assert_eq!(outcome.unavailable, vec![IMAGE_OPTIMIZATION.to_string()]);
        assert!(!store.snapshot().await.contains(IMAGE_OPTIMIZATION));
    }

    #[tokio::test]
    async fn test_missing_image_count_names_the_measured_quantity() {
        let store = MetricsStore::new();
        let source = FixedMeasurementSource::reference().without(MetricId::OptimizedImages);

        let outcome = analyze(&source, &store).await;

        assert_eq!(outcome.unavailable, vec![IMAGE_OPTIMIZATION.to_string()]);
        let err = source.measure(MetricId::OptimizedImages).unwrap_err();
        assert!(err.to_string().contains("optimized_images_measured"));
        assert_ne!(MetricId::OptimizedImages.key(), crate::job::AssetKind::Image.counter_name());
    }

    #[test]
    fn test_fixed_source_reports_missing_metric() {
        let source = FixedMeasurementSource::new();
        let err = source.measure(MetricId::LoadTime).unwrap_err();
        assert!(matches!(err, OptimizeError::MeasurementUnavailable { ref metric, .. } if metric == "load_time"));
    }
}
