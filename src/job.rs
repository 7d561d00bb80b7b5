//! # Job Module
//!
//! Tipi condivisi tra orchestratore ed executor.
//!
//! ## Responsabilità:
//! - `AssetDescriptor`: asset da ottimizzare (id + tipo di job)
//! - `Job`: stato di un job dispatchato (Pending → Running → Succeeded | Failed)
//! - `JobExecutor`: trait pluggable che esegue una singola ottimizzazione
//! - `SimulatedExecutor`: executor di riferimento (nessuna trasformazione reale)
//!
//! ## Ciclo di vita del job:
//! - Creato `Pending` dall'orchestratore al dispatch
//! - Mutato solo dal task che lo possiede
//! - Terminale una volta `Succeeded` o `Failed`, le transizioni successive sono ignorate

use crate::metrics::{Metric, MetricCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Kind of optimization a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Css,
    Js,
    CacheResource,
}

impl AssetKind {
    /// Counter bumped when a job of this kind succeeds without reporting a metric
    pub fn counter_name(&self) -> &'static str {
        match self {
            Self::Image => "optimized_images",
            Self::Css => "compressed_stylesheets",
            Self::Js => "minified_scripts",
            Self::CacheResource => "cached_resources",
        }
    }

    fn accepts(&self, asset_id: &str) -> bool {
        let ext = Path::new(asset_id)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match self {
            Self::Image => matches!(ext.as_deref(), Some("jpg" | "jpeg" | "png" | "webp" | "svg")),
            Self::Css => ext.as_deref() == Some("css"),
            Self::Js => matches!(ext.as_deref(), Some("js" | "mjs")),
            Self::CacheResource => true,
        }
    }

    /// Simulated work time, matching what each transformation costs on the reference site
    fn reference_latency(&self) -> Duration {
        match self {
            Self::Image => Duration::from_millis(200),
            Self::Css => Duration::from_millis(100),
            Self::Js => Duration::from_millis(80),
            Self::CacheResource => Duration::from_millis(50),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Image => "image",
            Self::Css => "css",
            Self::Js => "js",
            Self::CacheResource => "cache resource",
        };
        f.write_str(label)
    }
}

/// One asset to dispatch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub asset_id: String,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    pub fn new(asset_id: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
        }
    }

    pub fn image(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, AssetKind::Image)
    }

    pub fn css(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, AssetKind::Css)
    }

    pub fn js(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, AssetKind::Js)
    }

    pub fn cache(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, AssetKind::CacheResource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A dispatched job and its current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub asset_id: String,
    pub kind: AssetKind,
    status: JobStatus,
    error_detail: Option<String>,
}

impl Job {
    pub(crate) fn new(asset: &AssetDescriptor) -> Self {
        Self {
            asset_id: asset.asset_id.clone(),
            kind: asset.kind,
            status: JobStatus::Pending,
            error_detail: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub(crate) fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    pub(crate) fn succeed(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Succeeded;
        }
    }

    pub(crate) fn fail(&mut self, detail: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
            self.error_detail = Some(detail.into());
        }
    }
}

/// Result of one executor invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Optionally carries the metric the job measured; `None` bumps the kind's counter
    Succeeded(Option<Metric>),
    Failed(String),
}

/// Performs a single optimization; must be safe to call concurrently for different assets
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, asset: &AssetDescriptor) -> Outcome;
}

/// Reference executor: validates the asset format and simulates the work
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor {
    simulate_latency: bool,
}

impl SimulatedExecutor {
    pub fn new(simulate_latency: bool) -> Self {
        Self { simulate_latency }
    }

    /// No sleeping, useful for tests and dry runs
    pub fn instant() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn execute(&self, asset: &AssetDescriptor) -> Outcome {
        if !asset.kind.accepts(&asset.asset_id) {
            return Outcome::Failed(format!("unsupported format for {} job", asset.kind));
        }

        if self.simulate_latency {
            tokio::time::sleep(asset.kind.reference_latency()).await;
        }

        // CSS -25%, JS -30%: guadagni di riferimento
        match asset.kind {
            AssetKind::Css => Outcome::Succeeded(Some(Metric::new(
                format!("reduction:{}", asset.asset_id),
                25.0,
                MetricCategory::Percentage,
            ))),
            AssetKind::Js => Outcome::Succeeded(Some(Metric::new(
                format!("reduction:{}", asset.asset_id),
                30.0,
                MetricCategory::Percentage,
            ))),
            AssetKind::Image | AssetKind::CacheResource => Outcome::Succeeded(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle_is_terminal_once_finished() {
        let mut job = Job::new(&AssetDescriptor::image("hero-bg.jpg"));
        assert_eq!(job.status(), JobStatus::Pending);

        job.start();
        assert_eq!(job.status(), JobStatus::Running);

        job.fail("unsupported format");
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error_detail(), Some("unsupported format"));

        job.succeed();
        assert_eq!(job.status(), JobStatus::Failed);
        job.fail("second failure");
        assert_eq!(job.error_detail(), Some("unsupported format"));
    }

    #[tokio::test]
    async fn test_simulated_executor_accepts_reference_formats() {
        let executor = SimulatedExecutor::instant();

        for image in ["hero-bg.jpg", "mayu-avatar.PNG", "logo.svg", "photo.webp"] {
            assert_eq!(
                executor.execute(&AssetDescriptor::image(image)).await,
                Outcome::Succeeded(None),
                "{image}"
            );
        }
        assert_eq!(
            executor.execute(&AssetDescriptor::cache("anything.bin")).await,
            Outcome::Succeeded(None)
        );
    }

    #[tokio::test]
    async fn test_simulated_executor_reports_reductions() {
        let executor = SimulatedExecutor::instant();

        let css = executor.execute(&AssetDescriptor::css("styles.css")).await;
        assert_eq!(
            css,
            Outcome::Succeeded(Some(Metric::new("reduction:styles.css", 25.0, MetricCategory::Percentage)))
        );

        let js = executor.execute(&AssetDescriptor::js("script.js")).await;
        assert_eq!(
            js,
            Outcome::Succeeded(Some(Metric::new("reduction:script.js", 30.0, MetricCategory::Percentage)))
        );
    }

    #[tokio::test]
    async fn test_simulated_executor_rejects_unsupported_formats() {
        let executor = SimulatedExecutor::instant();

        assert!(matches!(
            executor.execute(&AssetDescriptor::image("clip.gif")).await,
            Outcome::Failed(_)
        ));
        assert!(matches!(
            executor.execute(&AssetDescriptor::css("script.js")).await,
            Outcome::Failed(_)
        ));
        assert!(matches!(
            executor.execute(&AssetDescriptor::js("README")).await,
            Outcome::Failed(_)
        ));
    }
}
