//! Storage collaborator traits.
//!
//! The core never talks to a database directly. These async traits are what
//! the `LessonEngine` needs from the surrounding application; the
//! `lessonmark-store` crate provides an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CourseOutline, LessonAttempt, LessonDefinition, QuestionPool};
use crate::results::CheckpointInstance;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Read access to authored content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a lesson with its grading rule set.
    async fn lesson(&self, lesson_id: &str) -> anyhow::Result<Option<LessonDefinition>>;

    /// Fetch the checkpoint question pool for a module.
    async fn question_pool(&self, module_id: &str) -> anyhow::Result<Option<QuestionPool>>;

    /// Fetch the outline of the course containing a lesson.
    async fn outline_for_lesson(&self, lesson_id: &str) -> anyhow::Result<Option<CourseOutline>>;
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// What a progress row is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ProgressTarget {
    Lesson(String),
    Module(String),
    Checkpoint(Uuid),
}

/// A scored attempt to upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub user_id: String,
    pub target: ProgressTarget,
    pub mastery_percent: f64,
    pub passed: bool,
    pub recorded_at: DateTime<Utc>,
}

/// A durable progress row keyed by `(user_id, target)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub target: ProgressTarget,
    /// Number of recorded attempts, including this one.
    pub attempts: u32,
    /// Mastery of the latest attempt.
    pub mastery_percent: f64,
    /// Best mastery over all attempts.
    pub best_percent: f64,
    /// Sticky once any attempt passes.
    pub passed: bool,
    pub unlocked: bool,
    pub updated_at: DateTime<Utc>,
}

/// Read/write access to learner progress.
///
/// Implementations must make `record_attempt` an idempotent upsert keyed by
/// `(user_id, target)` whose `attempts` counter is incremented atomically, so
/// that concurrent submissions for one lesson cannot lose an increment.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Upsert progress for a scored attempt and return the updated row.
    async fn record_attempt(&self, update: ProgressUpdate) -> anyhow::Result<ProgressRecord>;

    /// Most recent lesson attempts for a user, newest first.
    async fn recent_attempts(&self, user_id: &str, limit: usize)
        -> anyhow::Result<Vec<LessonAttempt>>;

    /// Mark a target as unlocked for a user.
    async fn unlock(&self, user_id: &str, target: ProgressTarget) -> anyhow::Result<()>;

    /// Creation time of the user's latest checkpoint, if any.
    async fn latest_checkpoint_at(&self, user_id: &str) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Persist a spawned checkpoint instance.
    async fn save_checkpoint(&self, instance: &CheckpointInstance) -> anyhow::Result<()>;

    /// Load a checkpoint instance snapshot.
    async fn checkpoint(&self, id: Uuid) -> anyhow::Result<Option<CheckpointInstance>>;
}
