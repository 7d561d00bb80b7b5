//! # Report Module
//!
//! Rendering del report finale e sink pluggable.
//!
//! ## Responsabilità:
//! - `Report`: snapshot + score + job falliti + metriche mancanti, tutto immutabile
//! - `render`: testo leggibile con unità per categoria (s, KB, %)
//! - `verdict`: giudizio per singola metrica (stesse soglie della fase di analisi)
//! - `ReportSink`: destinazione del report (`ConsoleSink`, `JsonSink`)
//!
//! ## Garanzie:
//! - Il report si renderizza sempre, anche con job falliti o metriche mancanti
//! - Job falliti e metriche mancanti sono elencati esplicitamente, mai omessi

use crate::{
    animation::AnimationProfile,
    error::OptimizeError,
    json_output::JsonMessage,
    metrics::{MetricsSnapshot, CSS_SIZE, IMAGE_OPTIMIZATION, JS_SIZE, LOAD_TIME},
    optimizer::batch_runner::{BatchResult, JobFailure},
    scoring::{Rating, ScoreResult, ScoreRule},
};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::info;

/// Per-metric judgement shown next to a measured value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub text: &'static str,
}

/// Verdict for the reference metrics; `None` for anything else
pub fn verdict(metric_name: &str, value: f64) -> Option<Verdict> {
    let (ok, good, bad) = match metric_name {
        LOAD_TIME => (value < 2.0, "excellent", "needs improvement"),
        IMAGE_OPTIMIZATION => (value > 80.0, "very good", "needs optimization"),
        CSS_SIZE => (value < 50.0, "optimized", "compression recommended"),
        JS_SIZE => (value < 30.0, "optimized", "minification recommended"),
        _ => return None,
    };

    Some(Verdict {
        ok,
        text: if ok { good } else { bad },
    })
}

/// Everything the report generator consumes, frozen after the last barrier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metrics: MetricsSnapshot,
    pub score: ScoreResult,
    pub rating: Rating,
    pub jobs_succeeded: usize,
    pub jobs_failed: usize,
    pub failures: Vec<JobFailure>,
    /// Rule metrics absent from the snapshot (scored as zero)
    pub missing_metrics: Vec<String>,
    pub animation: Option<AnimationProfile>,
}

impl Report {
    pub fn new(metrics: MetricsSnapshot, score: ScoreResult, rules: &[ScoreRule], jobs: &BatchResult) -> Self {
        let missing_metrics = rules
            .iter()
            .filter(|rule| !metrics.contains(&rule.metric_name))
            .map(|rule| rule.metric_name.clone())
            .collect();

        Self {
            rating: Rating::from_score(&score),
            metrics,
            score,
            jobs_succeeded: jobs.succeeded,
            jobs_failed: jobs.failed,
            failures: jobs.failures.clone(),
            missing_metrics,
            animation: None,
        }
    }

    pub fn with_animation(mut self, profile: AnimationProfile) -> Self {
        self.animation = Some(profile);
        self
    }

    /// Human-readable rendering
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "📊 PERFORMANCE REPORT");
        let _ = writeln!(out, "========================");

        for metric in self.metrics.iter() {
            let _ = write!(out, "• {}", metric);
            if let Some(v) = verdict(&metric.name, metric.value) {
                let _ = write!(out, " ({})", v.text);
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Score breakdown:");
        for (name, points) in &self.score.breakdown {
            let _ = writeln!(out, "  {}: {} pts", name, points);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "🎯 Global score: {}/{}", self.score.total, self.score.max_possible);
        let _ = writeln!(out, "{}", self.rating.message());

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Jobs: {} succeeded, {} failed",
            self.jobs_succeeded, self.jobs_failed
        );
        if !self.failures.is_empty() {
            let _ = writeln!(out, "Failed jobs:");
            for failure in &self.failures {
                let _ = writeln!(out, "  ✗ {}: {}", failure.asset_id, failure.detail);
            }
        }

        if !self.missing_metrics.is_empty() {
            let _ = writeln!(out, "Metrics missing from scoring (0 pts):");
            for name in &self.missing_metrics {
                let _ = writeln!(out, "  - {}", name);
            }
        }

        if let Some(profile) = &self.animation {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "🎬 Animations: {:?} mode at {}Hz ({} fps target), {} particles, {:?} scroll quality",
                profile.mode,
                profile.refresh_rate_hz,
                profile.mode.target_fps(),
                profile.particle_count,
                profile.scroll_quality
            );
        }

        out
    }
}

/// Destination of a rendered report
pub trait ReportSink: Send + Sync {
    fn deliver(&self, report: &Report) -> Result<(), OptimizeError>;
}

/// Logs the text rendering line by line through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn deliver(&self, report: &Report) -> Result<(), OptimizeError> {
        for line in report.render().lines() {
            info!("{}", line);
        }
        Ok(())
    }
}

/// Emits the report as a single JSON line on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink;

impl ReportSink for JsonSink {
    fn deliver(&self, report: &Report) -> Result<(), OptimizeError> {
        JsonMessage::report(report).emit();
        Ok(())
    }
}
