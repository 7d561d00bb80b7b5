//! # Progress Bar Module
//!
//! Progress bar visuale con `indicatif` per ogni fase del run.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ images [00:00:01] [========================================] 5/5 (100%) [OK] hero-bg.jpg
//! ```
//!
//! In modalità JSON la barra è nascosta: stdout è riservato ai messaggi JSON.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages the progress bar of one batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a visible progress bar for `total_jobs` jobs
    pub fn new(total_jobs: u64, phase: &str) -> Self {
        let bar = ProgressBar::new(total_jobs);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.set_prefix(phase.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A bar that never draws
    pub fn hidden(total_jobs: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_jobs);
        Self { bar }
    }

    /// Advance by one job and show `message`
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_counts_updates() {
        let progress = ProgressManager::hidden(3);
        progress.update("[OK] a.png");
        progress.update("[OK] b.png");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }
}
