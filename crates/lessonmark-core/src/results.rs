//! Output types produced by scoring, scheduling, and grading.
//!
//! Every value here is built fresh per call and never mutated afterwards.
//! Persisting them is the storage collaborator's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::QuestionOption;

/// Outcome of one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorResult {
    pub validator_id: String,
    pub passed: bool,
    pub weight: f64,
}

/// The canonical, server-computed verdict for one arrangement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Rounded to the rule set's precision.
    pub mastery_percent: f64,
    pub passed: bool,
    /// Literal sum of all validator weights.
    pub total_weight: f64,
    pub validator_results: Vec<ValidatorResult>,
}

/// Diagnostic label for a spawn decision. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnReason {
    /// No adjustment applied.
    BaseRate,
    /// Recent attempts were mostly below the mastery threshold.
    StrugglingLearner,
    /// A checkpoint was spawned within the cooldown window.
    Cooldown,
}

impl std::fmt::Display for SpawnReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpawnReason::BaseRate => write!(f, "base_rate"),
            SpawnReason::StrugglingLearner => write!(f, "struggling_learner"),
            SpawnReason::Cooldown => write!(f, "cooldown"),
        }
    }
}

/// Whether to interject a checkpoint, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDecision {
    pub should_spawn: bool,
    /// Effective probability after adjustments.
    pub probability: f64,
    pub reason: SpawnReason,
    /// Deterministic draw in `[0, 1)` compared against `probability`.
    pub draw: f64,
    /// `floor(unix_ms / 3_600_000)` the draw was seeded with.
    pub hour_bucket: i64,
}

/// A question as presented in one checkpoint instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuestion {
    /// Base question id, kept across variations.
    pub id: String,
    pub stem: String,
    pub options: Vec<QuestionOption>,
    pub answer: String,
    pub timer_seconds: u32,
    /// Index of the substituted variation, `None` for the base phrasing.
    #[serde(default)]
    pub variation: Option<usize>,
}

/// A spawned checkpoint with its questions snapshotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInstance {
    pub id: Uuid,
    pub user_id: String,
    pub module_id: String,
    pub questions: Vec<ResolvedQuestion>,
    pub probability: f64,
    pub created_at: DateTime<Utc>,
    /// `created_at` plus the sum of question timers.
    pub expires_at: DateTime<Utc>,
}

/// A learner's chosen option for one checkpoint question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub question_id: String,
    pub option_id: String,
}

/// Result of grading a checkpoint submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointGrade {
    pub correct: u32,
    pub total: u32,
    pub percent: f64,
    /// Submitted after `expires_at`.
    pub late: bool,
}

/// Where a learner goes after passing a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextItem {
    /// Next lesson in the same module.
    Lesson { module_id: String, lesson_id: String },
    /// First lesson of the following module.
    Module { module_id: String, lesson_id: String },
    CourseComplete,
}
