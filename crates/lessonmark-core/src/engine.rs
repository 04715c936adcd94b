//! Lesson and checkpoint orchestration.
//!
//! Connects the pure scoring and scheduling functions to the storage
//! collaborators: fetch content, compute, persist, unlock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkpoint::{
    decide_spawn_at, grade_checkpoint, new_instance, select_questions_with, shuffle_options,
};
use crate::config::LessonmarkConfig;
use crate::error::EngineError;
use crate::model::{Arrangement, QuestionPool};
use crate::results::{
    CheckpointDecision, CheckpointGrade, CheckpointInstance, CheckpointResponse, NextItem,
    ResolvedQuestion, ScoringResult,
};
use crate::scoring::compute_score;
use crate::traits::{ContentStore, ProgressRecord, ProgressStore, ProgressTarget, ProgressUpdate};
use crate::unlock::resolve_next;

/// Result of a lesson completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonOutcome {
    pub result: ScoringResult,
    pub record: ProgressRecord,
    /// What was unlocked, if the lesson was passed and sits in an outline.
    /// `None` also when the unlock write failed; the attempt is still recorded.
    pub next: Option<NextItem>,
}

/// Result of a checkpoint spawn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckpointOutcome {
    NotSpawned {
        decision: CheckpointDecision,
    },
    /// The draw said spawn but the module has no questions.
    EmptyPool {
        decision: CheckpointDecision,
    },
    Spawned {
        decision: CheckpointDecision,
        instance: CheckpointInstance,
    },
}

impl CheckpointOutcome {
    pub fn decision(&self) -> &CheckpointDecision {
        match self {
            CheckpointOutcome::NotSpawned { decision }
            | CheckpointOutcome::EmptyPool { decision }
            | CheckpointOutcome::Spawned { decision, .. } => decision,
        }
    }

    pub fn instance(&self) -> Option<&CheckpointInstance> {
        match self {
            CheckpointOutcome::Spawned { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// Result of a checkpoint submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSubmission {
    pub grade: CheckpointGrade,
    /// On time and at or above the configured pass percent.
    pub passed: bool,
    pub record: ProgressRecord,
}

/// The lesson engine.
pub struct LessonEngine {
    content: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressStore>,
    config: LessonmarkConfig,
}

impl LessonEngine {
    pub fn new(
        content: Arc<dyn ContentStore>,
        progress: Arc<dyn ProgressStore>,
        config: LessonmarkConfig,
    ) -> Self {
        Self {
            content,
            progress,
            config,
        }
    }

    pub fn config(&self) -> &LessonmarkConfig {
        &self.config
    }

    /// Score a submitted arrangement, record progress, and unlock on pass.
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        lesson_id: &str,
        arrangement: &Arrangement,
    ) -> Result<LessonOutcome, EngineError> {
        self.complete_lesson_at(user_id, lesson_id, arrangement, Utc::now())
            .await
    }

    #[tracing::instrument(level = "info", skip(self, arrangement, now), fields(placements = arrangement.placements.len()))]
    pub async fn complete_lesson_at(
        &self,
        user_id: &str,
        lesson_id: &str,
        arrangement: &Arrangement,
        now: DateTime<Utc>,
    ) -> Result<LessonOutcome, EngineError> {
        let lesson = self
            .content
            .lesson(lesson_id)
            .await
            .map_err(EngineError::Unavailable)?
            .ok_or_else(|| EngineError::NotFound {
                kind: "lesson",
                id: lesson_id.to_string(),
            })?;

        let result = compute_score(&lesson.grading, arrangement).inspect_err(|e| {
            if e.is_configuration() {
                tracing::error!(lesson_id, error = %e, "lesson grading is misconfigured");
            }
        })?;

        let record = self
            .progress
            .record_attempt(ProgressUpdate {
                user_id: user_id.to_string(),
                target: ProgressTarget::Lesson(lesson_id.to_string()),
                mastery_percent: result.mastery_percent,
                passed: result.passed,
                recorded_at: now,
            })
            .await
            .map_err(EngineError::Unavailable)?;

        // The attempt is already stored, so unlock failures are logged, not returned.
        let next = if result.passed {
            match self.unlock_after(user_id, lesson_id).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(lesson_id, error = %e, "unlock after pass failed");
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            mastery = result.mastery_percent,
            passed = result.passed,
            attempts = record.attempts,
            "lesson attempt recorded"
        );

        Ok(LessonOutcome {
            result,
            record,
            next,
        })
    }

    async fn unlock_after(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<NextItem>, EngineError> {
        let Some(outline) = self
            .content
            .outline_for_lesson(lesson_id)
            .await
            .map_err(EngineError::Unavailable)?
        else {
            tracing::warn!(lesson_id, "lesson is not part of any course outline");
            return Ok(None);
        };

        let next = resolve_next(&outline, lesson_id);
        match &next {
            Some(NextItem::Lesson { lesson_id, .. }) => {
                self.progress
                    .unlock(user_id, ProgressTarget::Lesson(lesson_id.clone()))
                    .await
                    .map_err(EngineError::Unavailable)?;
            }
            Some(NextItem::Module {
                module_id,
                lesson_id,
            }) => {
                self.progress
                    .unlock(user_id, ProgressTarget::Module(module_id.clone()))
                    .await
                    .map_err(EngineError::Unavailable)?;
                self.progress
                    .unlock(user_id, ProgressTarget::Lesson(lesson_id.clone()))
                    .await
                    .map_err(EngineError::Unavailable)?;
            }
            Some(NextItem::CourseComplete) | None => {}
        }
        Ok(next)
    }

    /// Decide whether to spawn a checkpoint and, if so, create one.
    pub async fn spawn_checkpoint(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<CheckpointOutcome, EngineError> {
        self.spawn_checkpoint_at(user_id, module_id, Utc::now())
            .await
    }

    #[tracing::instrument(level = "info", skip(self, now))]
    pub async fn spawn_checkpoint_at(
        &self,
        user_id: &str,
        module_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckpointOutcome, EngineError> {
        let (recent, last_checkpoint) = futures::try_join!(
            self.progress
                .recent_attempts(user_id, self.config.checkpoint.history_limit),
            self.progress.latest_checkpoint_at(user_id),
        )
        .map_err(EngineError::Unavailable)?;

        let decision = decide_spawn_at(
            user_id,
            module_id,
            &recent,
            last_checkpoint,
            &self.config.scheduler,
            now,
        );
        if !decision.should_spawn {
            return Ok(CheckpointOutcome::NotSpawned { decision });
        }

        let pool = self
            .content
            .question_pool(module_id)
            .await
            .map_err(EngineError::Unavailable)?
            .unwrap_or_default();
        let questions = self.pick_questions(&pool);
        if questions.is_empty() {
            tracing::warn!(module_id, "checkpoint due but question pool is empty");
            return Ok(CheckpointOutcome::EmptyPool { decision });
        }

        let instance = new_instance(user_id, module_id, questions, decision.probability, now);
        self.progress
            .save_checkpoint(&instance)
            .await
            .map_err(EngineError::Unavailable)?;

        tracing::info!(
            checkpoint_id = %instance.id,
            questions = instance.questions.len(),
            reason = %decision.reason,
            "checkpoint spawned"
        );

        Ok(CheckpointOutcome::Spawned { decision, instance })
    }

    fn pick_questions(&self, pool: &QuestionPool) -> Vec<ResolvedQuestion> {
        let mut rng = rand::thread_rng();
        let mut questions =
            select_questions_with(pool, self.config.checkpoint.question_count, &mut rng);
        if self.config.checkpoint.shuffle_options {
            shuffle_options(&mut questions, &mut rng);
        }
        questions
    }

    /// Grade a checkpoint submission against its snapshot and record it.
    pub async fn submit_checkpoint(
        &self,
        user_id: &str,
        checkpoint_id: Uuid,
        responses: &[CheckpointResponse],
    ) -> Result<CheckpointSubmission, EngineError> {
        self.submit_checkpoint_at(user_id, checkpoint_id, responses, Utc::now())
            .await
    }

    #[tracing::instrument(level = "info", skip(self, responses, now))]
    pub async fn submit_checkpoint_at(
        &self,
        user_id: &str,
        checkpoint_id: Uuid,
        responses: &[CheckpointResponse],
        now: DateTime<Utc>,
    ) -> Result<CheckpointSubmission, EngineError> {
        let instance = self
            .progress
            .checkpoint(checkpoint_id)
            .await
            .map_err(EngineError::Unavailable)?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| EngineError::NotFound {
                kind: "checkpoint",
                id: checkpoint_id.to_string(),
            })?;

        let grade = grade_checkpoint(&instance, responses, now);
        let passed = !grade.late && grade.percent >= self.config.checkpoint.pass_percent;

        let record = self
            .progress
            .record_attempt(ProgressUpdate {
                user_id: user_id.to_string(),
                target: ProgressTarget::Checkpoint(checkpoint_id),
                mastery_percent: grade.percent,
                passed,
                recorded_at: now,
            })
            .await
            .map_err(EngineError::Unavailable)?;

        tracing::info!(
            correct = grade.correct,
            total = grade.total,
            late = grade.late,
            passed,
            "checkpoint graded"
        );

        Ok(CheckpointSubmission {
            grade,
            passed,
            record,
        })
    }
}
