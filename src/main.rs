//! # Site Asset Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON + override da CLI)
//! - Discovery degli asset e avvio del run
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, workers, timeout, regole, etc.)
//! 2. Configura il logging (INFO o DEBUG, su stderr in modalità JSON)
//! 3. Carica la config e applica gli override
//! 4. Costruisce il catalogo asset (directory del sito o lista di riferimento)
//! 5. Istanzia SiteOptimizer, collega Ctrl-C alla cancellazione e avvia il run
//!
//! ## Esempio di utilizzo:
//! ```bash
//! site-optimizer ./public --workers 4 --timeout 10 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, warn};

use site_asset_optimizer::{
    json_output::JsonMessage, AssetCatalog, Config, ConsoleSink, JsonSink, ReportSink, SiteOptimizer,
};

#[derive(Parser)]
#[command(name = "site-optimizer")]
#[command(about = "Analyze, optimize and score the assets of a static website")]
struct Args {
    /// Site directory to scan for assets (reference asset list if omitted)
    site_directory: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent jobs
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-job timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Display refresh rate in Hz for the animation profile
    #[arg(long)]
    refresh_rate: Option<u32>,

    /// JSON file with a custom score rule table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Run the reference executors without simulated latency
    #[arg(long)]
    no_latency: bool,

    /// Output progress and report as JSON lines
    #[arg(long)]
    json: bool,

    /// Do not append this run to the score history
    #[arg(long)]
    no_history: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON lines in json mode
    let builder = tracing_subscriber::fmt().with_max_level(if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    });
    if args.json {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let json = args.json;
    if let Err(e) = run(args).await {
        if json {
            JsonMessage::error("Optimization failed".to_string(), Some(format!("{:#}", e))).emit();
        } else {
            error!("Optimization failed: {:#}", e);
        }
        return Err(e);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if args.workers.is_some() {
        config.workers = args.workers;
    }
    if args.timeout.is_some() {
        config.job_timeout_secs = args.timeout;
    }
    if args.refresh_rate.is_some() {
        config.refresh_rate_hz = args.refresh_rate;
    }
    if args.rules.is_some() {
        config.rules_path = args.rules;
    }
    if args.no_latency {
        config.simulate_latency = false;
    }
    if args.json {
        config.json_output = true;
    }
    if args.no_history {
        config.record_history = false;
    }

    let (site_dir, catalog) = match args.site_directory {
        Some(dir) => {
            let catalog = AssetCatalog::discover(&dir)?;
            if catalog.is_empty() {
                warn!("No assets found in {}", dir.display());
            }
            (dir, catalog)
        }
        None => (PathBuf::from("."), AssetCatalog::reference()),
    };

    let sink: Box<dyn ReportSink> = if config.json_output {
        Box::new(JsonSink)
    } else {
        Box::new(ConsoleSink)
    };

    let optimizer = SiteOptimizer::new(&site_dir, config).await?;

    let cancel = optimizer.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, jobs not yet started will be cancelled");
            cancel.cancel();
        }
    });

    optimizer.run(&catalog, sink.as_ref()).await?;

    Ok(())
}
