//! # Batch Runner Module
//!
//! Orchestratore fork-join: un task tokio per ogni job, barriera su tutti.
//!
//! ## Responsabilità:
//! - Dispatch concorrente di ogni `AssetDescriptor` verso il suo executor
//! - Barriera: `run_batch` ritorna solo quando ogni job è terminale
//! - Isolamento dei fallimenti: errori, timeout e panic restano del singolo job
//! - Scrittura degli esiti nel `MetricsStore` (una metrica o un contatore per job riuscito)
//!
//! ## Estensioni opzionali:
//! - `workers`: semaforo che limita i job concorrenti (default: illimitato)
//! - `job_timeout`: timeout per singolo job, mai per l'intero batch
//! - `CancelHandle`: i job non ancora partiti falliscono con "cancelled before start",
//!   quelli già in esecuzione terminano normalmente
//!
//! ## Ordine dei risultati:
//! - `failures` segue l'ordine di completamento (raccolto da un canale mpsc)
//! - `jobs` segue l'ordine di dispatch

use crate::{
    error::OptimizeError,
    job::{AssetDescriptor, AssetKind, Job, JobExecutor, Outcome},
    metrics::{MetricCategory, MetricsStore},
    optimizer::progress_tracker::ProgressTracker,
};
use anyhow::Result;
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, warn};

/// One failed job as surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub asset_id: String,
    pub detail: String,
}

impl JobFailure {
    pub fn new(asset_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            detail: detail.into(),
        }
    }
}

/// Aggregated outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    /// In completion order
    pub failures: Vec<JobFailure>,
    /// Terminal job records, in dispatch order
    pub jobs: Vec<Job>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Fold another batch into this one (used to summarise a whole run)
    pub fn merge(&mut self, other: BatchResult) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.failures.extend(other.failures);
        self.jobs.extend(other.jobs);
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Jobs: {} | Succeeded: {} | Failed: {}",
            self.total(),
            self.succeeded,
            self.failed
        )
    }

    fn absorb(&mut self, job: &Job) {
        match job.error_detail() {
            Some(detail) => {
                self.failed += 1;
                self.failures.push(JobFailure::new(&job.asset_id, detail));
            }
            None => self.succeeded += 1,
        }
    }
}

/// Cooperative cancellation shared between the caller and the runner
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fork-join dispatcher for optimization jobs
#[derive(Clone)]
pub struct BatchRunner {
    store: MetricsStore,
    executors: HashMap<AssetKind, Arc<dyn JobExecutor>>,
    fallback: Option<Arc<dyn JobExecutor>>,
    workers: Option<usize>,
    job_timeout: Option<Duration>,
    cancel: CancelHandle,
}

impl BatchRunner {
    pub fn new(store: MetricsStore) -> Self {
        Self {
            store,
            executors: HashMap::new(),
            fallback: None,
            workers: None,
            job_timeout: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Executor for one job kind
    pub fn with_executor(mut self, kind: AssetKind, executor: Arc<dyn JobExecutor>) -> Self {
        self.executors.insert(kind, executor);
        self
    }

    /// Executor used for kinds without a dedicated one
    pub fn with_default_executor(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.fallback = Some(executor);
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    fn executor_for(&self, kind: AssetKind) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(&kind).or(self.fallback.as_ref()).cloned()
    }

    /// Dispatch every asset concurrently and wait for all of them
    pub async fn run_batch(&self, assets: &[AssetDescriptor]) -> Result<BatchResult> {
        self.run_batch_tracked(assets, None).await
    }

    /// Same as `run_batch`, reporting each completion to a progress tracker
    pub async fn run_batch_tracked(
        &self,
        assets: &[AssetDescriptor],
        tracker: Option<&ProgressTracker>,
    ) -> Result<BatchResult> {
        if assets.is_empty() {
            warn!("Empty batch submitted, nothing to dispatch");
            return Ok(BatchResult::default());
        }

        let semaphore = self.workers.map(|n| Arc::new(Semaphore::new(n)));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Job)>();
        let mut handles = Vec::with_capacity(assets.len());

        // Fork: un task per job
        for (index, asset) in assets.iter().enumerate() {
            let task = JobTask {
                job: Job::new(asset),
                asset: asset.clone(),
                executor: self.executor_for(asset.kind),
                store: self.store.clone(),
                semaphore: semaphore.clone(),
                cancel: self.cancel.clone(),
                timeout: self.job_timeout,
            };
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let job = task.run().await?;
                // il receiver vive fino alla fine della barriera
                let _ = tx.send((index, job));
                Ok::<(), OptimizeError>(())
            }));
        }
        drop(tx);

        let mut result = BatchResult::default();
        let mut slots: Vec<Option<Job>> = vec![None; assets.len()];

        // Completamenti nell'ordine in cui arrivano
        while let Some((index, job)) = rx.recv().await {
            result.absorb(&job);
            if let Some(tracker) = tracker {
                tracker.handle_job_completion(&job).await;
            }
            slots[index] = Some(job);
        }

        // Join: ogni sender è stato droppato, resta solo da raccogliere panic ed errori
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Orchestration failed while running {}: {}", assets[index].asset_id, e);
                    return Err(e.into());
                }
                Err(join_error) => {
                    error!("Job for {} did not complete: {}", assets[index].asset_id, join_error);
                    let mut job = Job::new(&assets[index]);
                    job.fail(format!("task aborted: {join_error}"));
                    result.absorb(&job);
                    if let Some(tracker) = tracker {
                        tracker.handle_job_completion(&job).await;
                    }
                    slots[index] = Some(job);
                }
            }
        }

        result.jobs = slots.into_iter().flatten().collect();
        debug!("Batch finished: {}", result.format_summary());

        Ok(result)
    }
}

/// Everything one spawned task owns
struct JobTask {
    job: Job,
    asset: AssetDescriptor,
    executor: Option<Arc<dyn JobExecutor>>,
    store: MetricsStore,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancelHandle,
    timeout: Option<Duration>,
}

impl JobTask {
    async fn run(self) -> Result<Job, OptimizeError> {
        let JobTask {
            mut job,
            asset,
            executor,
            store,
            semaphore,
            cancel,
            timeout,
        } = self;

        let _permit = match semaphore {
            Some(semaphore) => Some(
                semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| OptimizeError::Orchestration(format!("worker pool closed: {e}")))?,
            ),
            None => None,
        };

        if cancel.is_cancelled() {
            job.fail("cancelled before start");
            return Ok(job);
        }

        let Some(executor) = executor else {
            job.fail(format!("no executor registered for {} jobs", asset.kind));
            return Ok(job);
        };

        job.start();
        debug!("Running {} job: {}", asset.kind, asset.asset_id);

        // il panic diventa un fallimento del job, consegnato nel suo ordine di completamento
        let guarded = AssertUnwindSafe(executor.execute(&asset))
            .catch_unwind()
            .map(|caught| caught.unwrap_or_else(|_| Outcome::Failed("executor panicked".to_string())));

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => Outcome::Failed(format!("timed out after {limit:?}")),
            },
            None => guarded.await,
        };

        match outcome {
            Outcome::Succeeded(Some(metric)) => {
                store.record_metric(metric).await;
                job.succeed();
            }
            Outcome::Succeeded(None) => {
                store
                    .increment(asset.kind.counter_name(), 1.0, MetricCategory::Count)
                    .await;
                job.succeed();
            }
            Outcome::Failed(detail) => {
                warn!("❌ {} job failed for {}: {}", asset.kind, asset.asset_id, detail);
                job.fail(detail);
            }
        }

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::metrics::Metric;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Barrier;

    /// Succeeds for every asset except the scripted failures
    #[derive(Default)]
    struct ScriptedExecutor {
        failures: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        metric: bool,
    }

    impl ScriptedExecutor {
        fn failing(mut self, asset_id: &str, detail: &str) -> Self {
            self.failures.insert(asset_id.to_string(), detail.to_string());
            self
        }

        fn delayed(mut self, asset_id: &str, delay: Duration) -> Self {
            self.delays.insert(asset_id.to_string(), delay);
            self
        }

        fn reporting_metrics(mut self) -> Self {
            self.metric = true;
            self
        }
    }

    #[async_trait]
    impl JobExecutor for ScriptedExecutor {
        async fn execute(&self, asset: &AssetDescriptor) -> Outcome {
            if let Some(delay) = self.delays.get(&asset.asset_id) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(detail) = self.failures.get(&asset.asset_id) {
                return Outcome::Failed(detail.clone());
            }
            if self.metric {
                Outcome::Succeeded(Some(Metric::new(
                    format!("saved:{}", asset.asset_id),
                    12.5,
                    MetricCategory::SizeKb,
                )))
            } else {
                Outcome::Succeeded(None)
            }
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl JobExecutor for PanickingExecutor {
        async fn execute(&self, asset: &AssetDescriptor) -> Outcome {
            if asset.asset_id == "boom.png" {
                panic!("decoder exploded");
            }
            Outcome::Succeeded(None)
        }
    }

    /// Only completes once `parties` jobs are running at the same time
    struct RendezvousExecutor {
        barrier: Barrier,
    }

    #[async_trait]
    impl JobExecutor for RendezvousExecutor {
        async fn execute(&self, _asset: &AssetDescriptor) -> Outcome {
            self.barrier.wait().await;
            Outcome::Succeeded(None)
        }
    }

    /// Cancels the run as soon as it executes a job
    struct CancellingExecutor {
        cancel: CancelHandle,
    }

    #[async_trait]
    impl JobExecutor for CancellingExecutor {
        async fn execute(&self, _asset: &AssetDescriptor) -> Outcome {
            self.cancel.cancel();
            Outcome::Succeeded(None)
        }
    }

    fn images(names: &[&str]) -> Vec<AssetDescriptor> {
        names.iter().map(|n| AssetDescriptor::image(*n)).collect()
    }

    fn runner_with(executor: impl JobExecutor + 'static) -> BatchRunner {
        BatchRunner::new(MetricsStore::new()).with_default_executor(Arc::new(executor))
    }

    #[tokio::test]
    async fn test_all_successful_batch() {
        let runner = runner_with(ScriptedExecutor::default());
        let assets = images(&["hero-bg.jpg", "portfolio-1.jpg", "portfolio-2.jpg", "mayu-avatar.png", "jack-avatar.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 5);
        assert_eq!(result.failed, 0);
        assert!(result.failures.is_empty());
        assert_eq!(result.jobs.len(), 5);
        assert!(result.jobs.iter().all(|j| j.status() == JobStatus::Succeeded));

        let snapshot = runner.store().snapshot().await;
        assert_eq!(snapshot.value("optimized_images"), Some(5.0));
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_sibling_metric_kept() {
        let runner = runner_with(
            ScriptedExecutor::default()
                .failing("logo.svg", "unsupported format")
                .reporting_metrics(),
        );
        let assets = images(&["hero-bg.jpg", "logo.svg"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures, vec![JobFailure::new("logo.svg", "unsupported format")]);

        let snapshot = runner.store().snapshot().await;
        assert_eq!(snapshot.value("saved:hero-bg.jpg"), Some(12.5));
        assert!(!snapshot.contains("saved:logo.svg"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_does_not_block_siblings() {
        let runner = runner_with(ScriptedExecutor::default().failing("a.png", "corrupt header"));
        let assets = images(&["a.png", "b.png", "c.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.total(), assets.len());
        let status_of = |id: &str| result.jobs.iter().find(|j| j.asset_id == id).unwrap().status();
        assert_eq!(status_of("a.png"), JobStatus::Failed);
        assert_eq!(status_of("b.png"), JobStatus::Succeeded);
        assert_eq!(status_of("c.png"), JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_failures_follow_completion_order() {
        let runner = runner_with(
            ScriptedExecutor::default()
                .failing("slow.png", "too slow")
                .delayed("slow.png", Duration::from_millis(100))
                .failing("fast.png", "too fast"),
        );
        let assets = images(&["slow.png", "fast.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        let order: Vec<&str> = result.failures.iter().map(|f| f.asset_id.as_str()).collect();
        assert_eq!(order, vec!["fast.png", "slow.png"]);
        // jobs restano in ordine di dispatch
        assert_eq!(result.jobs[0].asset_id, "slow.png");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unbounded_fan_out_runs_every_job_concurrently() {
        let runner = runner_with(RendezvousExecutor { barrier: Barrier::new(6) });
        let assets = images(&["1.png", "2.png", "3.png", "4.png", "5.png", "6.png"]);

        let result = tokio::time::timeout(Duration::from_secs(5), runner.run_batch(&assets))
            .await
            .expect("jobs were not dispatched concurrently")
            .unwrap();

        assert_eq!(result.succeeded, 6);
    }

    #[tokio::test]
    async fn test_worker_cap_still_completes_every_job() {
        let runner = runner_with(ScriptedExecutor::default().delayed("1.png", Duration::from_millis(20)))
            .with_workers(Some(2));
        let assets = images(&["1.png", "2.png", "3.png", "4.png", "5.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 5);
    }

    #[tokio::test]
    async fn test_per_job_timeout_fails_only_that_job() {
        let runner = runner_with(ScriptedExecutor::default().delayed("huge.png", Duration::from_secs(30)))
            .with_job_timeout(Some(Duration::from_millis(50)));
        let assets = images(&["huge.png", "tiny.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures[0].asset_id, "huge.png");
        assert!(result.failures[0].detail.starts_with("timed out after"));
    }

    #[tokio::test]
    async fn test_panicking_executor_is_isolated() {
        let runner = runner_with(PanickingExecutor);
        let assets = images(&["boom.png", "fine.png"]);

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failures, vec![JobFailure::new("boom.png", "executor panicked")]);
        assert_eq!(result.jobs.len(), 2);
        assert_eq!(result.jobs[0].status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_panicked_job_keeps_its_completion_order() {
        let runner = runner_with(
            ScriptedExecutor::default()
                .failing("slow.png", "too slow")
                .delayed("slow.png", Duration::from_millis(200)),
        )
        .with_executor(AssetKind::Css, Arc::new(PanickingExecutor));
        let assets = vec![AssetDescriptor::image("slow.png"), AssetDescriptor::css("boom.png")];

        let result = runner.run_batch(&assets).await.unwrap();

        let order: Vec<&str> = result.failures.iter().map(|f| f.asset_id.as_str()).collect();
        assert_eq!(order, vec!["boom.png", "slow.png"]);
        assert_eq!(result.failures[0].detail, "executor panicked");
    }

    #[tokio::test]
    async fn test_cancel_before_run_fails_every_job() {
        let runner = runner_with(ScriptedExecutor::default());
        runner.cancel_handle().cancel();

        let result = runner.run_batch(&images(&["a.png", "b.png"])).await.unwrap();

        assert_eq!(result.failed, 2);
        assert!(result.failures.iter().all(|f| f.detail == "cancelled before start"));
        assert!(runner.store().is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_reaches_only_jobs_not_yet_started() {
        let cancel = CancelHandle::new();
        let runner = runner_with(CancellingExecutor { cancel: cancel.clone() })
            .with_cancel_handle(cancel)
            .with_workers(Some(1));

        let result = runner.run_batch(&images(&["a.png", "b.png", "c.png"])).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 2);
        assert_eq!(result.total(), 3);
    }

    #[tokio::test]
    async fn test_missing_executor_fails_job() {
        let runner = BatchRunner::new(MetricsStore::new())
            .with_executor(AssetKind::Image, Arc::new(ScriptedExecutor::default()));
        let assets = vec![AssetDescriptor::image("hero-bg.jpg"), AssetDescriptor::css("styles.css")];

        let result = runner.run_batch(&assets).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(
            result.failures,
            vec![JobFailure::new("styles.css", "no executor registered for css jobs")]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let runner = runner_with(ScriptedExecutor::default());
        let result = runner.run_batch(&[]).await.unwrap();
        assert_eq!(result, BatchResult::default());
    }

    #[test]
    fn test_merge_and_summary() {
        let mut run = BatchResult {
            succeeded: 5,
            ..Default::default()
        };
        run.merge(BatchResult {
            succeeded: 1,
            failed: 1,
            failures: vec![JobFailure::new("styles.css", "not found")],
            jobs: Vec::new(),
        });

        assert_eq!(run.total(), 7);
        assert!(!run.is_clean());
        assert_eq!(run.format_summary(), "Jobs: 7 | Succeeded: 6 | Failed: 1");
    }
}
