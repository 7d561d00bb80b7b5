//! # Progress Tracking Module
//!
//! Tracker thread-safe per i completamenti di un batch.
//! Gestisce sia output JSON che progress bar tradizionale.

use crate::{
    job::Job,
    json_output::JsonMessage,
    progress::ProgressManager,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-batch tracker fed by the batch runner as jobs complete
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_jobs: usize,
    phase: String,
    json_output: bool,
    finished: Arc<Mutex<usize>>,
    succeeded: Arc<Mutex<usize>>,
    failed: Arc<Mutex<usize>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    /// Crea un nuovo tracker per la fase `phase`
    pub fn new(phase: &str, total_jobs: usize, json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden(total_jobs as u64)
        } else {
            ProgressManager::new(total_jobs as u64, phase)
        };

        Self {
            total_jobs,
            phase: phase.to_string(),
            json_output,
            finished: Arc::new(Mutex::new(0)),
            succeeded: Arc::new(Mutex::new(0)),
            failed: Arc::new(Mutex::new(0)),
            progress_manager,
        }
    }

    /// Invia evento JSON di progresso
    pub async fn emit_progress(&self) {
        if self.json_output {
            let finished = *self.finished.lock().await;
            let succeeded = *self.succeeded.lock().await;
            let failed = *self.failed.lock().await;

            JsonMessage::progress(&self.phase, finished, self.total_jobs, succeeded, failed).emit();
        }
    }

    /// Gestisce il completamento di un job
    pub async fn handle_job_completion(&self, job: &Job) {
        *self.finished.lock().await += 1;

        let message = match job.error_detail() {
            None => {
                *self.succeeded.lock().await += 1;
                format!("[OK] {}", job.asset_id)
            }
            Some(detail) => {
                *self.failed.lock().await += 1;
                format!("[ERROR] {}: {}", job.asset_id, detail)
            }
        };

        if self.json_output {
            JsonMessage::job_complete(&self.phase, job).emit();
            self.emit_progress().await;
        }

        self.progress_manager.update(&message);
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    /// (finished, succeeded, failed)
    pub async fn counts(&self) -> (usize, usize, usize) {
        (
            *self.finished.lock().await,
            *self.succeeded.lock().await,
            *self.failed.lock().await,
        )
    }
}
