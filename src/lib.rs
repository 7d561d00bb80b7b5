//! # Site Asset Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `metrics`: Metriche e store concorrente
//! - `measurement`: Fase di analisi sequenziale
//! - `job`: Job, stati ed executor pluggable
//! - `optimizer`: Batch runner concorrente e orchestratore del run
//! - `scoring`: Tabella di regole e punteggio
//! - `report`: Rendering del report e sink
//! - `animation`: Profilo animazioni dal refresh rate
//! - `file_manager`: Discovery degli asset del sito
//! - `state`: Storico degli score per sito
//! - `progress` / `json_output`: Output verso l'utente
//!
//! ## Utilizzo:
//! ```rust,no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use site_asset_optimizer::{AssetCatalog, Config, ConsoleSink, SiteOptimizer};
//! use std::path::Path;
//!
//! let optimizer = SiteOptimizer::new(Path::new("."), Config::default()).await?;
//! let report = optimizer.run(&AssetCatalog::reference(), &ConsoleSink).await?;
//! println!("{}/{}", report.score.total, report.score.max_possible);
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod job;
pub mod json_output;
pub mod measurement;
pub mod metrics;
pub mod optimizer;
pub mod progress;
pub mod report;
pub mod scoring;
pub mod state;

pub use config::Config;
pub use error::OptimizeError;
pub use file_manager::AssetCatalog;
pub use job::{AssetDescriptor, AssetKind, JobExecutor, Outcome, SimulatedExecutor};
pub use metrics::{Metric, MetricCategory, MetricsSnapshot, MetricsStore};
pub use optimizer::{BatchResult, BatchRunner, CancelHandle, SiteOptimizer};
pub use report::{ConsoleSink, JsonSink, Report, ReportSink};
pub use scoring::{score, Rating, ScoreResult, ScoreRule};
