//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (config, history, discovery)
//! - `Json`: Errori di (de)serializzazione
//! - `MeasurementUnavailable`: La sorgente di misura non ha un valore
//! - `Orchestration`: Il meccanismo di fork-join stesso ha fallito
//! - `State`: Errori di gestione file di history
//! - `Validation`: Errori di validazione config / tabella regole
//!
//! ## Nota:
//! Il fallimento di un singolo job NON è un errore: è un dato riportato in
//! `BatchResult::failures`. Lo stesso vale per una metrica mancante durante
//! lo scoring (0 punti).
//!
//! ## Esempio:
//! ```rust,ignore
//! if total_images <= 0.0 {
//!     return Err(OptimizeError::MeasurementUnavailable {
//!         metric: "image_optimization".to_string(),
//!         reason: "no images found".to_string(),
//!     });
//! }
//! ```

/// Custom error types for site asset optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Measurement unavailable for {metric}: {reason}")]
    MeasurementUnavailable { metric: String, reason: String },

    #[error("Orchestration failure: {0}")]
    Orchestration(String),

    #[error("History file error: {0}")]
    State(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
