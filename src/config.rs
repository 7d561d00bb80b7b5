//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del runner.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di orchestrazione e scoring
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `workers`: Limite di job concorrenti (default: None = fan-out illimitato)
//! - `job_timeout_secs`: Timeout per singolo job (default: None = nessun timeout)
//! - `simulate_latency`: Latenza simulata degli executor di riferimento (default: true)
//! - `refresh_rate_hz`: Refresh rate per il profilo animazioni (default: None = detect)
//! - `rules_path`: File JSON con la tabella delle regole di scoring (default: None = tabella di riferimento)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//! - `record_history`: Salva lo score di ogni run nello storico (default: true)
//!
//! ## Validazione:
//! - `workers`, se presente, deve essere > 0
//! - `job_timeout_secs`, se presente, deve essere > 0
//! - `refresh_rate_hz`, se presente, deve essere > 0
//! - `rules_path`, se presente, deve esistere
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     workers: Some(8),
//!     job_timeout_secs: Some(30),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a site optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of concurrent jobs (None = one task per job, unbounded)
    pub workers: Option<usize>,
    /// Per-job timeout in seconds (None = jobs run to completion)
    pub job_timeout_secs: Option<u64>,
    /// Whether the reference executors sleep to simulate real work
    pub simulate_latency: bool,
    /// Display refresh rate used for the animation profile (None = detect)
    pub refresh_rate_hz: Option<u32>,
    /// JSON file holding a custom score rule table
    pub rules_path: Option<PathBuf>,
    /// Output progress and report as JSON lines for programmatic use
    pub json_output: bool,
    /// Append every run's score to the per-site history file
    pub record_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: None,
            job_timeout_secs: None,
            simulate_latency: true,
            refresh_rate_hz: None,
            rules_path: None,
            json_output: false,
            record_history: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.job_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Job timeout must be greater than 0 seconds"));
        }

        if self.refresh_rate_hz == Some(0) {
            return Err(anyhow::anyhow!("Refresh rate must be greater than 0 Hz"));
        }

        if let Some(ref rules_path) = self.rules_path {
            if !rules_path.is_file() {
                return Err(anyhow::anyhow!("Score rules file does not exist: {}", rules_path.display()));
            }
        }

        Ok(())
    }

    /// Per-job timeout as a `Duration`
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
