//! Mastery scoring.
//!
//! `compute_score` is the single source of truth for lesson grading. It is a
//! pure function of the rule set and the arrangement: no clock, no randomness,
//! no shared state. Client-computed scores are never trusted.

use crate::error::ScoringError;
use crate::model::{Arrangement, GradingRuleSet};
use crate::results::{ScoringResult, ValidatorResult};
use crate::validator::evaluate;

/// Score an arrangement against a grading rule set.
///
/// With `normalize_weights` the score is `earned / total * 100`. Without it,
/// weights are taken as fractions and the score is `earned * 100`; no clamping
/// is applied, so such a rule set can score above 100.
pub fn compute_score(
    rule_set: &GradingRuleSet,
    arrangement: &Arrangement,
) -> Result<ScoringResult, ScoringError> {
    // Zero weight is reported for any arrangement, duplicates included.
    let total_weight = rule_set.total_weight();
    if total_weight == 0.0 {
        return Err(ScoringError::ZeroTotalWeight {
            version: rule_set.version.clone(),
        });
    }

    if let Some(placeholder) = arrangement.duplicate_placeholder() {
        return Err(ScoringError::DuplicatePlacement(placeholder.to_string()));
    }

    let validator_results: Vec<ValidatorResult> = rule_set
        .validators
        .iter()
        .map(|v| ValidatorResult {
            validator_id: v.id.clone(),
            passed: evaluate(v, arrangement),
            weight: v.weight,
        })
        .collect();

    let earned_weight: f64 = validator_results
        .iter()
        .filter(|r| r.passed)
        .fold(0.0, |acc, r| acc + r.weight);

    let rules = &rule_set.scoring_rules;
    let raw_score = if rules.normalize_weights {
        earned_weight / total_weight * 100.0
    } else {
        earned_weight * 100.0
    };

    let mastery_percent = round_half_up(raw_score, rules.precision);

    Ok(ScoringResult {
        mastery_percent,
        passed: mastery_percent >= rules.pass_threshold,
        total_weight,
        validator_results,
    })
}

/// Round to `precision` decimal places, ties away from zero.
///
/// Ties are judged on the binary value: `1.005` is stored just below the
/// midpoint, so it rounds to `1.0` at two places.
pub fn round_half_up(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(15) as i32);
    (value * factor).round() / factor
}
