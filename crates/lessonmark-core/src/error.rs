//! Scoring and engine error types.
//!
//! `ScoringError` is what the pure scoring functions can return. A 0% score
//! is a valid outcome and never an error; these variants mean the rule set or
//! the submission cannot be graded at all. `EngineError` wraps them together
//! with storage failures so callers can tell authoring bugs from outages.

use thiserror::Error;

/// Generic text shown to learners when a lesson cannot be graded.
pub const CONFIGURATION_USER_MESSAGE: &str = "lesson configuration error, contact support";

/// Errors raised by `compute_score`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Every validator in the rule set has weight zero.
    #[error("grading rule set {version:?} has zero total validator weight")]
    ZeroTotalWeight { version: String },

    /// The arrangement holds more than one placement for the same placeholder.
    #[error("arrangement has more than one placement for placeholder {0:?}")]
    DuplicatePlacement(String),
}

impl ScoringError {
    /// Returns `true` if the rule set itself is broken (an authoring bug).
    pub fn is_configuration(&self) -> bool {
        matches!(self, ScoringError::ZeroTotalWeight { .. })
    }
}

/// Errors raised by the `LessonEngine`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submission could not be scored.
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// A lesson, pool, outline, or checkpoint does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A storage collaborator failed or timed out.
    #[error("data unavailable: {0:#}")]
    Unavailable(#[source] anyhow::Error),
}

impl EngineError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_))
    }

    /// The message that may be shown to an end user.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Scoring(e) if e.is_configuration() => {
                CONFIGURATION_USER_MESSAGE.to_string()
            }
            EngineError::Scoring(ScoringError::DuplicatePlacement(_)) => {
                "each slot can hold only one item, please resubmit".to_string()
            }
            EngineError::Scoring(_) => CONFIGURATION_USER_MESSAGE.to_string(),
            EngineError::NotFound { kind, .. } => format!("{kind} not found"),
            EngineError::Unavailable(_) => {
                "service temporarily unavailable, please retry".to_string()
            }
        }
    }
}
