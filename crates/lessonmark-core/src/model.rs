//! Core data model types for lessonmark.
//!
//! These are the inputs to scoring and scheduling: the grading rule set a
//! lesson author writes, the arrangement a student submits, the checkpoint
//! question pool, and the recent-progress summary the scheduler reads.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// One draggable dropped into one placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// The placeholder (slot) the item was dropped into.
    pub placeholder_id: String,
    /// Stable identifier of the draggable item.
    pub draggable_id: String,
    /// Semantic value carried by the draggable, if any.
    #[serde(default)]
    pub payload: Option<String>,
}

/// The complete set of placements a student submits for one check attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arrangement {
    pub placements: Vec<Placement>,
}

impl Arrangement {
    pub fn new(placements: Vec<Placement>) -> Self {
        Self { placements }
    }

    /// Find the placement for a placeholder.
    pub fn placement_for(&self, placeholder_id: &str) -> Option<&Placement> {
        self.placements
            .iter()
            .find(|p| p.placeholder_id == placeholder_id)
    }

    /// Returns the first placeholder id that appears in more than one placement.
    pub fn duplicate_placeholder(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.placements
            .iter()
            .map(|p| p.placeholder_id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

// ---------------------------------------------------------------------------
// Grading rule sets
// ---------------------------------------------------------------------------

/// How a validator judges its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Equals,
    Contains,
    Regex,
    #[serde(alias = "orderMatch")]
    OrderMatch,
    Custom,
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorKind::Equals => write!(f, "equals"),
            ValidatorKind::Contains => write!(f, "contains"),
            ValidatorKind::Regex => write!(f, "regex"),
            ValidatorKind::OrderMatch => write!(f, "order_match"),
            ValidatorKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for ValidatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ValidatorKind::Equals),
            "contains" => Ok(ValidatorKind::Contains),
            "regex" => Ok(ValidatorKind::Regex),
            "order_match" | "orderMatch" => Ok(ValidatorKind::OrderMatch),
            "custom" => Ok(ValidatorKind::Custom),
            other => Err(format!("unknown validator kind: {other}")),
        }
    }
}

/// A single grading rule that judges one placeholder's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Unique within its rule set.
    pub id: String,
    pub kind: ValidatorKind,
    /// Placeholder this validator judges.
    pub target: String,
    /// Acceptable values; meaning depends on `kind`.
    #[serde(default)]
    pub expected: Vec<String>,
    /// Relative contribution to the total score.
    pub weight: f64,
}

/// How validator outcomes turn into a mastery percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Divide earned weight by total weight before scaling to 100.
    #[serde(default = "default_true")]
    pub normalize_weights: bool,
    /// Decimal places kept in `mastery_percent`.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Minimum mastery percent that counts as a pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            normalize_weights: true,
            precision: default_precision(),
            pass_threshold: default_pass_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_precision() -> u32 {
    2
}

fn default_pass_threshold() -> f64 {
    98.0
}

/// The grading configuration attached to a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRuleSet {
    /// Opaque schema version tag.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub scoring_rules: ScoringRules,
    /// Evaluation order does not affect the score.
    #[serde(default)]
    pub validators: Vec<Validator>,
}

impl GradingRuleSet {
    /// Sum of all validator weights.
    pub fn total_weight(&self) -> f64 {
        self.validators.iter().fold(0.0, |acc, v| acc + v.weight)
    }
}

/// An authored lesson: its interactive placeholders and its rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub module_id: String,
    /// Placeholders declared by the interactivity definition. Empty means undeclared.
    #[serde(default)]
    pub placeholders: Vec<String>,
    pub grading: GradingRuleSet,
}

// ---------------------------------------------------------------------------
// Checkpoint questions
// ---------------------------------------------------------------------------

/// One multiple-choice option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// Alternate phrasing of a question for the same underlying concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionVariation {
    pub stem: String,
    pub options: Vec<QuestionOption>,
    /// Id of the correct option within `options`.
    pub answer: String,
}

/// A base checkpoint question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub stem: String,
    pub options: Vec<QuestionOption>,
    /// Id of the correct option within `options`.
    pub answer: String,
    #[serde(default = "default_timer_seconds")]
    pub timer_seconds: u32,
    #[serde(default)]
    pub variations: Vec<QuestionVariation>,
}

fn default_timer_seconds() -> u32 {
    30
}

/// Candidate questions for a module's checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPool {
    #[serde(default)]
    pub module_id: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionPool {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Progress and course structure
// ---------------------------------------------------------------------------

/// One scored lesson attempt from the recent-progress summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonAttempt {
    pub lesson_id: String,
    pub mastery_percent: f64,
    pub completed_at: DateTime<Utc>,
}

/// Ordered lessons of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub id: String,
    #[serde(default)]
    pub lessons: Vec<String>,
}

/// Ordered modules of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub id: String,
    #[serde(default)]
    pub modules: Vec<ModuleOutline>,
}
