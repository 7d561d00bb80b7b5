//! # Run History Module
//!
//! Questo modulo tiene lo storico degli score per ogni sito analizzato.
//!
//! ## Responsabilità:
//! - Appende lo score di ogni run a un file JSON per sito
//! - Fornisce statistiche storiche (numero run, media, miglior score)
//!
//! ## Strategia di persistence:
//! - Un file JSON per directory del sito (hash del path canonico)
//! - Salvataggio in `~/.site-optimizer/history_<hash>.json`
//! - Lo storico è solo reporting: non rientra mai nello scoring
//!
//! ## Esempio struttura history file:
//! ```json
//! {
//!   "runs": [
//!     { "total": 90, "max_possible": 100, "jobs_failed": 0, "recorded_at": 1642680000 }
//!   ]
//! }
//! ```

use crate::{error::OptimizeError, json_output::HistoricalStats, scoring::ScoreResult};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::warn;

/// One past run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub total: u32,
    pub max_possible: u32,
    pub jobs_failed: usize,
    pub recorded_at: u64,
}

impl RunRecord {
    pub fn new(score: &ScoreResult, jobs_failed: usize) -> Result<Self> {
        Ok(Self {
            total: score.total,
            max_possible: score.max_possible,
            jobs_failed,
            recorded_at: SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?.as_secs(),
        })
    }
}

/// History file content
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct HistoryFile {
    pub runs: Vec<RunRecord>,
}

/// Reads and appends the per-site run history
pub struct HistoryManager {
    history_file_path: PathBuf,
    history: HistoryFile,
}

impl HistoryManager {
    /// History for `site_dir` under `~/.site-optimizer`
    pub async fn new(site_dir: &Path) -> Result<Self> {
        let state_dir = dirs::home_dir()
            .ok_or_else(|| OptimizeError::State("Could not find home directory".to_string()))?
            .join(".site-optimizer");

        Self::in_dir(&state_dir, site_dir).await
    }

    /// History for `site_dir` stored under an explicit state directory
    pub async fn in_dir(state_dir: &Path, site_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir).await?;

        // stesso sito, stesso file: `./site` e `/srv/site/.` devono coincidere
        let site_dir = site_dir.canonicalize().unwrap_or_else(|_| site_dir.to_path_buf());

        let mut hasher = Sha256::new();
        hasher.update(site_dir.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize())[..16].to_string();

        let history_file_path = state_dir.join(format!("history_{}.json", hash));

        let history = if history_file_path.exists() {
            let content = fs::read_to_string(&history_file_path).await?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable history file {}: {}", history_file_path.display(), e);
                HistoryFile::default()
            })
        } else {
            HistoryFile::default()
        };

        Ok(Self {
            history_file_path,
            history,
        })
    }

    pub fn path(&self) -> &Path {
        &self.history_file_path
    }

    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.history)?;
        fs::write(&self.history_file_path, content).await?;
        Ok(())
    }

    /// Append a run and persist immediately
    pub async fn record_run(&mut self, record: RunRecord) -> Result<()> {
        self.history.runs.push(record);
        self.save().await
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.history.runs
    }

    pub fn get_stats(&self) -> HistoricalStats {
        let runs = &self.history.runs;
        let average_score = if runs.is_empty() {
            0.0
        } else {
            runs.iter().map(|r| f64::from(r.total)).sum::<f64>() / runs.len() as f64
        };

        HistoricalStats {
            total_runs: runs.len(),
            average_score,
            best_score: runs.iter().map(|r| r.total).max().unwrap_or(0),
        }
    }
}
