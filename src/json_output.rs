//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico
//! (CI, dashboard, wrapper di altri linguaggi).
//!
//! ## Responsabilità:
//! - Emette messaggi JSON strutturati, uno per riga, su stdout
//! - Riutilizza le strutture esistenti (`Job`, `BatchResult`, `Report`)
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del run
//! - `progress`: Progresso corrente di una fase
//! - `job_complete`: Fine di un singolo job
//! - `batch_complete`: Fine di una fase (barriera superata)
//! - `report`: Report finale (snapshot + score)
//! - `complete`: Fine del run con durata e statistiche storiche
//! - `error`: Errore fatale

use crate::{
    config::Config,
    job::{AssetKind, Job, JobStatus},
    optimizer::batch_runner::{BatchResult, JobFailure},
    report::Report,
};
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        site_dir: PathBuf,
        total_jobs: usize,
        config: JsonConfig,
    },

    #[serde(rename = "progress")]
    Progress {
        phase: String,
        current: usize,
        total: usize,
        percentage: f64,
        succeeded: usize,
        failed: usize,
    },

    #[serde(rename = "job_complete")]
    JobComplete {
        phase: String,
        asset_id: String,
        kind: AssetKind,
        status: JobStatus,
        error: Option<String>,
    },

    #[serde(rename = "batch_complete")]
    BatchComplete {
        phase: String,
        succeeded: usize,
        failed: usize,
        failures: Vec<JobFailure>,
    },

    #[serde(rename = "report")]
    Report { report: Report },

    #[serde(rename = "complete")]
    Complete {
        duration_seconds: f64,
        historical_stats: Option<HistoricalStats>,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub workers: Option<usize>,
    pub job_timeout_secs: Option<u64>,
    pub simulate_latency: bool,
    pub refresh_rate_hz: Option<u32>,
    pub custom_rules: bool,
}

/// Statistiche storiche
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalStats {
    pub total_runs: usize,
    pub average_score: f64,
    pub best_score: u32,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(site_dir: PathBuf, total_jobs: usize, config: JsonConfig) -> Self {
        Self::Start {
            site_dir,
            total_jobs,
            config,
        }
    }

    pub fn progress(phase: &str, current: usize, total: usize, succeeded: usize, failed: usize) -> Self {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::Progress {
            phase: phase.to_string(),
            current,
            total,
            percentage,
            succeeded,
            failed,
        }
    }

    pub fn job_complete(phase: &str, job: &Job) -> Self {
        Self::JobComplete {
            phase: phase.to_string(),
            asset_id: job.asset_id.clone(),
            kind: job.kind,
            status: job.status(),
            error: job.error_detail().map(str::to_string),
        }
    }

    pub fn batch_complete(phase: &str, result: &BatchResult) -> Self {
        Self::BatchComplete {
            phase: phase.to_string(),
            succeeded: result.succeeded,
            failed: result.failed,
            failures: result.failures.clone(),
        }
    }

    pub fn report(report: &Report) -> Self {
        Self::Report {
            report: report.clone(),
        }
    }

    pub fn complete(duration_seconds: f64, historical_stats: Option<HistoricalStats>) -> Self {
        Self::Complete {
            duration_seconds,
            historical_stats,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            job_timeout_secs: config.job_timeout_secs,
            simulate_latency: config.simulate_latency,
            refresh_rate_hz: config.refresh_rate_hz,
            custom_rules: config.rules_path.is_some(),
        }
    }
}
