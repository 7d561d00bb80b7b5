//! # Site Optimizer Main Orchestrator
//!
//! Orchestratore principale del run: analisi, fasi di ottimizzazione,
//! scoring e report. Delega la concorrenza al `BatchRunner`.
//!
//! ## Flusso di esecuzione:
//! 1. **Analisi**: misura sequenziale delle metriche nel `MetricsStore`
//! 2. **Immagini**: batch di job Image
//! 3. **Asset**: batch di job Css + Js
//! 4. **Cache**: batch di job CacheResource sulle risorse critiche
//! 5. **Animazioni**: profilo in base al refresh rate
//! 6. **Report**: snapshot → score → sink → storico

use crate::{
    animation::{detect_refresh_rate, AnimationProfile},
    config::Config,
    file_manager::AssetCatalog,
    job::{AssetDescriptor, AssetKind, JobExecutor, SimulatedExecutor},
    json_output::{HistoricalStats, JsonConfig, JsonMessage},
    measurement::{analyze, AnalysisOutcome, FixedMeasurementSource, MeasurementSource},
    metrics::MetricsStore,
    optimizer::{
        batch_runner::{BatchResult, BatchRunner, CancelHandle},
        progress_tracker::ProgressTracker,
    },
    report::{Report, ReportSink},
    scoring::{load_rules, reference_rules, score, ScoreRule},
    state::{HistoryManager, RunRecord},
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Orchestratore principale
pub struct SiteOptimizer {
    config: Config,
    site_dir: PathBuf,
    store: MetricsStore,
    runner: BatchRunner,
    source: Arc<dyn MeasurementSource>,
    rules: Vec<ScoreRule>,
}

impl SiteOptimizer {
    /// Crea nuova istanza: valida la config e carica la tabella di regole
    pub async fn new(site_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        let rules = match config.rules_path {
            Some(ref path) => {
                let rules = load_rules(path).await?;
                info!("Loaded {} score rules from {}", rules.len(), path.display());
                rules
            }
            None => reference_rules(),
        };

        let store = MetricsStore::new();
        let runner = BatchRunner::new(store.clone())
            .with_default_executor(Arc::new(SimulatedExecutor::new(config.simulate_latency)))
            .with_workers(config.workers)
            .with_job_timeout(config.job_timeout());

        Ok(Self {
            config,
            site_dir: site_dir.to_path_buf(),
            store,
            runner,
            source: Arc::new(FixedMeasurementSource::reference()),
            rules,
        })
    }

    pub fn with_measurement_source(mut self, source: Arc<dyn MeasurementSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the executor for one job kind
    pub fn with_executor(mut self, kind: AssetKind, executor: Arc<dyn JobExecutor>) -> Self {
        self.runner = self.runner.with_executor(kind, executor);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.runner.cancel_handle()
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    pub fn rules(&self) -> &[ScoreRule] {
        &self.rules
    }

    /// Fase di analisi sequenziale
    pub async fn analyze(&self) -> AnalysisOutcome {
        analyze(self.source.as_ref(), &self.store).await
    }

    /// Ottimizzazione immagini in parallelo
    pub async fn optimize_images(&self, images: &[String]) -> Result<BatchResult> {
        let assets: Vec<_> = images.iter().map(AssetDescriptor::image).collect();
        let result = self.run_phase("images", &assets).await?;
        info!("✅ {} images optimized", result.succeeded);
        Ok(result)
    }

    /// Compressione CSS e minificazione JS
    pub async fn compress_assets(&self, stylesheets: &[String], scripts: &[String]) -> Result<BatchResult> {
        let assets: Vec<_> = stylesheets
            .iter()
            .map(AssetDescriptor::css)
            .chain(scripts.iter().map(AssetDescriptor::js))
            .collect();
        let result = self.run_phase("assets", &assets).await?;
        info!("✅ {} assets compressed", result.succeeded);
        Ok(result)
    }

    /// Generazione cache per le risorse critiche
    pub async fn generate_cache(&self, resources: &[String]) -> Result<BatchResult> {
        let assets: Vec<_> = resources.iter().map(AssetDescriptor::cache).collect();
        let result = self.run_phase("cache", &assets).await?;
        info!("✅ Cache generated for {} resources", result.succeeded);
        Ok(result)
    }

    /// Profilo animazioni dal refresh rate configurato o rilevato
    pub fn tune_animations(&self) -> AnimationProfile {
        let refresh_rate = self.config.refresh_rate_hz.unwrap_or_else(detect_refresh_rate);
        let profile = AnimationProfile::for_refresh_rate(refresh_rate);
        info!(
            "🎬 Animations: {}Hz → {:?} ({} particles, {:?} scroll)",
            refresh_rate, profile.mode, profile.particle_count, profile.scroll_quality
        );
        profile
    }

    /// Snapshot + score: va chiamato solo dopo che tutte le fasi sono tornate
    pub async fn build_report(&self, jobs: &BatchResult) -> Report {
        let snapshot = self.store.snapshot().await;
        let result = score(&snapshot, &self.rules);
        Report::new(snapshot, result, &self.rules, jobs)
    }

    /// Esegue il run completo e consegna il report a `sink`
    pub async fn run(&self, catalog: &AssetCatalog, sink: &dyn ReportSink) -> Result<Report> {
        let start_time = Instant::now();

        self.emit_start_message(catalog);

        let analysis = self.analyze().await;
        if !analysis.unavailable.is_empty() {
            warn!("Scoring without: {}", analysis.unavailable.join(", "));
        }

        let mut jobs = BatchResult::default();
        jobs.merge(self.optimize_images(&catalog.images).await?);
        jobs.merge(self.compress_assets(&catalog.stylesheets, &catalog.scripts).await?);
        jobs.merge(self.generate_cache(&catalog.critical_resources).await?);

        let profile = self.tune_animations();
        let report = self.build_report(&jobs).await.with_animation(profile);

        sink.deliver(&report)?;

        let historical_stats = self.record_history(&report).await;

        if self.config.json_output {
            JsonMessage::complete(start_time.elapsed().as_secs_f64(), historical_stats).emit();
        } else {
            info!("🚀 Optimization finished in {:.2}s", start_time.elapsed().as_secs_f64());
            if let Some(stats) = historical_stats {
                info!("--- Historical Stats ---");
                info!("Runs recorded: {}", stats.total_runs);
                info!("Average score: {:.1}", stats.average_score);
                info!("Best score: {}", stats.best_score);
            }
        }

        Ok(report)
    }

    async fn run_phase(&self, phase: &str, assets: &[AssetDescriptor]) -> Result<BatchResult> {
        if assets.is_empty() {
            info!("No {} to process", phase);
            return Ok(BatchResult::default());
        }

        if !self.config.json_output {
            info!("Processing {} {} jobs", assets.len(), phase);
        }

        let tracker = ProgressTracker::new(phase, assets.len(), self.config.json_output);
        let result = self.runner.run_batch_tracked(assets, Some(&tracker)).await?;
        tracker.finish(&result.format_summary());

        if self.config.json_output {
            JsonMessage::batch_complete(phase, &result).emit();
        }

        Ok(result)
    }

    fn emit_start_message(&self, catalog: &AssetCatalog) {
        if self.config.json_output {
            JsonMessage::start(
                self.site_dir.clone(),
                catalog.total_jobs(),
                JsonConfig::from(&self.config),
            )
            .emit();
        } else {
            info!("Starting site optimization for: {}", self.site_dir.display());
            match self.config.workers {
                Some(workers) => info!("Workers: {}", workers),
                None => info!("Workers: one task per job"),
            }
            if let Some(timeout) = self.config.job_timeout() {
                info!("Per-job timeout: {:?}", timeout);
            }
            info!("Found {} jobs to run", catalog.total_jobs());
        }
    }

    /// Lo storico è best-effort: un errore qui non invalida il report già consegnato
    async fn record_history(&self, report: &Report) -> Option<HistoricalStats> {
        if !self.config.record_history {
            return None;
        }

        let outcome: Result<HistoricalStats> = async {
            let mut history = HistoryManager::new(&self.site_dir).await?;
            history
                .record_run(RunRecord::new(&report.score, report.jobs_failed)?)
                .await?;
            Ok(history.get_stats())
        }
        .await;

        match outcome {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Could not update run history: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Outcome;
    use crate::measurement::MetricId;
    use crate::metrics::{IMAGE_OPTIMIZATION, JS_SIZE};
    use crate::optimizer::batch_runner::JobFailure;
    use crate::scoring::Rating;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        delivered: Mutex<Vec<Report>>,
    }

    impl ReportSink for MemorySink {
        fn deliver(&self, report: &Report) -> Result<(), crate::error::OptimizeError> {
            self.delivered.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    struct RejectSvg;

    #[async_trait]
    impl JobExecutor for RejectSvg {
        async fn execute(&self, asset: &AssetDescriptor) -> Outcome {
            if asset.asset_id.ends_with(".svg") {
                Outcome::Failed("unsupported format".to_string())
            } else {
                Outcome::Succeeded(None)
            }
        }
    }

    fn quiet_config() -> Config {
        Config {
            simulate_latency: false,
            record_history: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reference_run_scores_ninety() {
        let optimizer = SiteOptimizer::new(Path::new("."), quiet_config()).await.unwrap();
        let sink = MemorySink::default();

        let report = optimizer.run(&AssetCatalog::reference(), &sink).await.unwrap();

        assert_eq!(report.score.total, 90);
        assert_eq!(report.score.max_possible, 100);
        assert_eq!(report.rating, Rating::Exceptional);
        assert_eq!(report.jobs_succeeded, 5 + 2 + 4);
        assert_eq!(report.jobs_failed, 0);
        assert!(report.missing_metrics.is_empty());
        assert_eq!(report.metrics.value("optimized_images"), Some(5.0));
        assert_eq!(report.metrics.value("cached_resources"), Some(4.0));
        assert_eq!(report.metrics.value("reduction:styles.css"), Some(25.0));
        assert_eq!(sink.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_jobs_and_missing_metrics_reach_the_report() {
        let optimizer = SiteOptimizer::new(Path::new("."), quiet_config())
            .await
            .unwrap()
            .with_executor(AssetKind::CacheResource, Arc::new(RejectSvg))
            .with_measurement_source(Arc::new(
                FixedMeasurementSource::reference().without(MetricId::JsSize),
            ));
        let sink = MemorySink::default();

        let report = optimizer.run(&AssetCatalog::reference(), &sink).await.unwrap();

        assert_eq!(report.jobs_failed, 1);
        assert_eq!(report.failures, vec![JobFailure::new("logo.svg", "unsupported format")]);
        assert_eq!(report.missing_metrics, vec![JS_SIZE.to_string()]);
        assert_eq!(report.score.breakdown[JS_SIZE], 0);
        assert_eq!(report.score.total, 65);
        assert_eq!(report.metrics.value(IMAGE_OPTIMIZATION), Some(80.0));
        assert_eq!(report.metrics.value("cached_resources"), Some(3.0));
    }

    #[tokio::test]
    async fn test_cancelled_run_still_reports() {
        let optimizer = SiteOptimizer::new(Path::new("."), quiet_config()).await.unwrap();
        optimizer.cancel_handle().cancel();
        let sink = MemorySink::default();

        let report = optimizer.run(&AssetCatalog::reference(), &sink).await.unwrap();

        assert_eq!(report.jobs_succeeded, 0);
        assert_eq!(report.jobs_failed, 11);
        assert_eq!(report.score.total, 90);
    }

    #[tokio::test]
    async fn test_empty_catalog_skips_phases() {
        let optimizer = SiteOptimizer::new(Path::new("."), quiet_config()).await.unwrap();
        let sink = MemorySink::default();

        let report = optimizer.run(&AssetCatalog::default(), &sink).await.unwrap();

        assert_eq!(report.jobs_succeeded + report.jobs_failed, 0);
        assert_eq!(report.metrics.len(), 4);
    }

    #[tokio::test]
    async fn test_animation_profile_uses_configured_rate() {
        let config = Config {
            refresh_rate_hz: Some(144),
            ..quiet_config()
        };
        let optimizer = SiteOptimizer::new(Path::new("."), config).await.unwrap();
        assert_eq!(optimizer.tune_animations().particle_count, 100);
        assert_eq!(optimizer.tune_animations().mode.target_fps(), 120);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = Config {
            workers: Some(0),
            ..quiet_config()
        };
        assert!(SiteOptimizer::new(Path::new("."), config).await.is_err());
    }
}
