//! # Scoring Engine Module
//!
//! Calcola lo score composito di "readiness" a partire da uno snapshot delle
//! metriche e da una tabella di regole a soglie.
//!
//! ## Responsabilità:
//! - `ScoreRule`: tabella ordinata di soglie (dati, non codice)
//! - `score`: funzione pura e deterministica, nessun I/O
//! - Validazione e caricamento da JSON di tabelle custom
//! - `Rating`: giudizio finale in base alla percentuale ottenuta
//!
//! ## Valutazione delle soglie:
//! - Le soglie sono valutate nell'ordine dichiarato, vince la prima soddisfatta
//! - Confronti stretti: `LowerIsBetter` vuol dire `value < boundary`,
//!   `HigherIsBetter` vuol dire `value > boundary`
//! - Nessuna soglia soddisfatta → `fallback_points`
//! - Metrica assente dallo snapshot → 0 punti (mai un errore)
//!
//! ## Tabella di riferimento (max 100):
//! ```text
//! load_time           < 2.0 → 30   < 3.0 → 20   else 10
//! image_optimization  > 80  → 25   > 60  → 15   else 5
//! css_size            < 50  → 20   < 100 → 15   else 5
//! js_size             < 30  → 25   < 50  → 20   else 10
//! ```

use crate::{
    error::OptimizeError,
    metrics::{MetricsSnapshot, CSS_SIZE, IMAGE_OPTIMIZATION, JS_SIZE, LOAD_TIME},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Direction {
    /// Strict comparison: a value equal to the boundary never satisfies the tier
    pub fn satisfies(&self, value: f64, boundary: f64) -> bool {
        match self {
            Self::LowerIsBetter => value < boundary,
            Self::HigherIsBetter => value > boundary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub boundary: f64,
    pub points: u32,
}

/// Tiered points table for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRule {
    pub metric_name: String,
    pub direction: Direction,
    pub tiers: Vec<Tier>,
    /// Awarded when the metric is present but matches no tier
    #[serde(default)]
    pub fallback_points: u32,
}

impl ScoreRule {
    pub fn new(metric_name: impl Into<String>, direction: Direction, tiers: &[(f64, u32)], fallback_points: u32) -> Self {
        Self {
            metric_name: metric_name.into(),
            direction,
            tiers: tiers
                .iter()
                .map(|&(boundary, points)| Tier { boundary, points })
                .collect(),
            fallback_points,
        }
    }

    pub fn lower_is_better(metric_name: impl Into<String>, tiers: &[(f64, u32)], fallback_points: u32) -> Self {
        Self::new(metric_name, Direction::LowerIsBetter, tiers, fallback_points)
    }

    pub fn higher_is_better(metric_name: impl Into<String>, tiers: &[(f64, u32)], fallback_points: u32) -> Self {
        Self::new(metric_name, Direction::HigherIsBetter, tiers, fallback_points)
    }

    /// Points for a present value: first satisfied tier wins
    pub fn points_for(&self, value: f64) -> u32 {
        self.tiers
            .iter()
            .find(|tier| self.direction.satisfies(value, tier.boundary))
            .map_or(self.fallback_points, |tier| tier.points)
    }

    /// Highest points this rule can award
    pub fn max_points(&self) -> u32 {
        self.tiers
            .iter()
            .map(|tier| tier.points)
            .chain(std::iter::once(self.fallback_points))
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.metric_name.trim().is_empty() {
            return Err(OptimizeError::Validation("score rule has an empty metric name".to_string()));
        }

        if self.tiers.is_empty() {
            return Err(OptimizeError::Validation(format!(
                "score rule for {} has no tiers",
                self.metric_name
            )));
        }

        if let Some(tier) = self.tiers.iter().find(|t| !t.boundary.is_finite()) {
            return Err(OptimizeError::Validation(format!(
                "score rule for {} has a non-finite boundary ({})",
                self.metric_name, tier.boundary
            )));
        }

        // ogni soglia successiva deve essere più permissiva della precedente
        let monotone = self.tiers.windows(2).all(|pair| match self.direction {
            Direction::LowerIsBetter => pair[0].boundary < pair[1].boundary,
            Direction::HigherIsBetter => pair[0].boundary > pair[1].boundary,
        });
        if !monotone {
            return Err(OptimizeError::Validation(format!(
                "score rule for {} has boundaries out of order for {:?}",
                self.metric_name, self.direction
            )));
        }

        Ok(())
    }
}

/// The reference rule table (max 100 points)
pub fn reference_rules() -> Vec<ScoreRule> {
    vec![
        ScoreRule::lower_is_better(LOAD_TIME, &[(2.0, 30), (3.0, 20)], 10),
        ScoreRule::higher_is_better(IMAGE_OPTIMIZATION, &[(80.0, 25), (60.0, 15)], 5),
        ScoreRule::lower_is_better(CSS_SIZE, &[(50.0, 20), (100.0, 15)], 5),
        ScoreRule::lower_is_better(JS_SIZE, &[(30.0, 25), (50.0, 20)], 10),
    ]
}

/// Check a whole table: non-empty, one rule per metric, every rule valid
pub fn validate_rules(rules: &[ScoreRule]) -> Result<(), OptimizeError> {
    if rules.is_empty() {
        return Err(OptimizeError::Validation("score rule table is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for rule in rules {
        rule.validate()?;
        if !seen.insert(rule.metric_name.as_str()) {
            return Err(OptimizeError::Validation(format!(
                "metric {} has more than one score rule",
                rule.metric_name
            )));
        }
    }

    Ok(())
}

/// Load and validate a rule table from a JSON file
pub async fn load_rules(path: &Path) -> Result<Vec<ScoreRule>, OptimizeError> {
    let content = tokio::fs::read_to_string(path).await?;
    let rules: Vec<ScoreRule> = serde_json::from_str(&content)?;
    validate_rules(&rules)?;
    Ok(rules)
}

/// Composite score, recomputed on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub total: u32,
    pub max_possible: u32,
    pub breakdown: BTreeMap<String, u32>,
}

impl ScoreResult {
    pub fn percent(&self) -> f64 {
        if self.max_possible == 0 {
            0.0
        } else {
            f64::from(self.total) * 100.0 / f64::from(self.max_possible)
        }
    }
}

/// Score a snapshot against a rule table
pub fn score(snapshot: &MetricsSnapshot, rules: &[ScoreRule]) -> ScoreResult {
    let mut result = ScoreResult::default();

    for rule in rules {
        let points = snapshot
            .value(&rule.metric_name)
            .map_or(0, |value| rule.points_for(value));

        *result.breakdown.entry(rule.metric_name.clone()).or_insert(0) += points;
        result.total += points;
        result.max_possible += rule.max_points();
    }

    result
}

/// Overall verdict on a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Exceptional,
    Good,
    NeedsImprovement,
}

impl Rating {
    pub fn from_score(score: &ScoreResult) -> Self {
        let percent = score.percent();
        if percent >= 90.0 {
            Self::Exceptional
        } else if percent >= 75.0 {
            Self::Good
        } else {
            Self::NeedsImprovement
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Exceptional => "🌟 Exceptional performance!",
            Self::Good => "✅ Good performance",
            Self::NeedsImprovement => "⚠️  Improvements recommended",
        }
    }
}
