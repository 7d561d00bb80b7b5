//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `site_optimizer`: Orchestratore principale del run
//! - `batch_runner`: Fork-join concorrente dei job di una fase
//! - `progress_tracker`: Gestione progress unificata (barra o JSON)

pub mod batch_runner;
pub mod progress_tracker;
pub mod site_optimizer;

pub use batch_runner::{BatchResult, BatchRunner, CancelHandle, JobFailure};
pub use progress_tracker::ProgressTracker;
pub use site_optimizer::SiteOptimizer;
