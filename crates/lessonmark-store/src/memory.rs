//! In-memory content and progress store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use lessonmark_core::model::{CourseOutline, LessonAttempt, LessonDefinition, QuestionPool};
use lessonmark_core::results::CheckpointInstance;
use lessonmark_core::traits::{
    ContentStore, ProgressRecord, ProgressStore, ProgressTarget, ProgressUpdate,
};

/// Lesson attempts kept per user; older ones are dropped first.
pub const HISTORY_CAP: usize = 256;

#[derive(Default)]
struct State {
    lessons: HashMap<String, LessonDefinition>,
    pools: HashMap<String, QuestionPool>,
    outlines: Vec<CourseOutline>,
    records: HashMap<(String, ProgressTarget), ProgressRecord>,
    /// Lesson attempts in insertion order, per user, at most `HISTORY_CAP`.
    history: HashMap<String, Vec<LessonAttempt>>,
    checkpoints: HashMap<Uuid, CheckpointInstance>,
}

/// A store that keeps everything in process memory.
///
/// All progress writes for a key happen under one lock, so concurrent
/// `record_attempt` calls never lose an `attempts` increment.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// When set, every call fails as if the backing service were down.
    offline: AtomicBool,
    /// When set, `unlock` fails while every other call succeeds.
    fail_unlocks: AtomicBool,
    /// Number of `record_attempt` calls made.
    write_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(self, lesson: LessonDefinition) -> Self {
        self.insert_lesson(lesson);
        self
    }

    pub fn with_pool(self, pool: QuestionPool) -> Self {
        self.state_mut().pools.insert(pool.module_id.clone(), pool);
        self
    }

    pub fn with_outline(self, outline: CourseOutline) -> Self {
        self.state_mut().outlines.push(outline);
        self
    }

    /// Add or replace a lesson.
    pub fn insert_lesson(&self, lesson: LessonDefinition) {
        self.state_mut().lessons.insert(lesson.id.clone(), lesson);
    }

    /// Simulate the backing service going down or coming back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make `unlock` fail, or succeed again.
    pub fn set_unlocks_failing(&self, failing: bool) {
        self.fail_unlocks.store(failing, Ordering::Relaxed);
    }

    /// Number of `record_attempt` calls made.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Current progress row for a user and target.
    pub fn progress_for(&self, user_id: &str, target: &ProgressTarget) -> Option<ProgressRecord> {
        self.state_mut()
            .records
            .get(&(user_id.to_string(), target.clone()))
            .cloned()
    }

    /// Whether a target has been unlocked for a user.
    pub fn is_unlocked(&self, user_id: &str, target: &ProgressTarget) -> bool {
        self.progress_for(user_id, target)
            .is_some_and(|record| record.unlocked)
    }

    /// A poisoned lock is recovered: no code path panics with `State` half
    /// written.
    fn state_mut(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, State>> {
        if self.offline.load(Ordering::Relaxed) {
            anyhow::bail!("memory store is offline");
        }
        Ok(self.state_mut())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn lesson(&self, lesson_id: &str) -> anyhow::Result<Option<LessonDefinition>> {
        Ok(self.lock()?.lessons.get(lesson_id).cloned())
    }

    async fn question_pool(&self, module_id: &str) -> anyhow::Result<Option<QuestionPool>> {
        Ok(self.lock()?.pools.get(module_id).cloned())
    }

    async fn outline_for_lesson(&self, lesson_id: &str) -> anyhow::Result<Option<CourseOutline>> {
        let state = self.lock()?;
        Ok(state
            .outlines
            .iter()
            .find(|o| {
                o.modules
                    .iter()
                    .any(|m| m.lessons.iter().any(|l| l == lesson_id))
            })
            .cloned())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn record_attempt(&self, update: ProgressUpdate) -> anyhow::Result<ProgressRecord> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock()?;

        if let ProgressTarget::Lesson(lesson_id) = &update.target {
            let history = state.history.entry(update.user_id.clone()).or_default();
            history.push(LessonAttempt {
                lesson_id: lesson_id.clone(),
                mastery_percent: update.mastery_percent,
                completed_at: update.recorded_at,
            });
            if history.len() > HISTORY_CAP {
                let excess = history.len() - HISTORY_CAP;
                history.drain(..excess);
            }
        }

        let key = (update.user_id.clone(), update.target.clone());
        let record = state
            .records
            .entry(key)
            .or_insert_with(|| ProgressRecord {
                user_id: update.user_id.clone(),
                target: update.target.clone(),
                attempts: 0,
                mastery_percent: 0.0,
                best_percent: 0.0,
                passed: false,
                unlocked: false,
                updated_at: update.recorded_at,
            });

        record.attempts += 1;
        record.mastery_percent = update.mastery_percent;
        record.best_percent = record.best_percent.max(update.mastery_percent);
        record.passed |= update.passed;
        record.updated_at = update.recorded_at;

        tracing::debug!(
            user_id = %record.user_id,
            attempts = record.attempts,
            "progress upserted"
        );
        Ok(record.clone())
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<LessonAttempt>> {
        let state = self.lock()?;
        let mut attempts: Vec<LessonAttempt> = state
            .history
            .get(user_id)
            .map(|h| h.iter().rev().cloned().collect())
            .unwrap_or_default();
        // Stable sort keeps later insertions first among equal timestamps.
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn unlock(&self, user_id: &str, target: ProgressTarget) -> anyhow::Result<()> {
        if self.fail_unlocks.load(Ordering::Relaxed) {
            anyhow::bail!("memory store rejected unlock");
        }
        let mut state = self.lock()?;
        let now = Utc::now();
        state
            .records
            .entry((user_id.to_string(), target.clone()))
            .or_insert_with(|| ProgressRecord {
                user_id: user_id.to_string(),
                target,
                attempts: 0,
                mastery_percent: 0.0,
                best_percent: 0.0,
                passed: false,
                unlocked: false,
                updated_at: now,
            })
            .unlocked = true;
        Ok(())
    }

    async fn latest_checkpoint_at(&self, user_id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let state = self.lock()?;
        Ok(state
            .checkpoints
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.created_at)
            .max())
    }

    async fn save_checkpoint(&self, instance: &CheckpointInstance) -> anyhow::Result<()> {
        self.lock()?
            .checkpoints
            .insert(instance.id, instance.clone());
        Ok(())
    }

    async fn checkpoint(&self, id: Uuid) -> anyhow::Result<Option<CheckpointInstance>> {
        Ok(self.lock()?.checkpoints.get(&id).cloned())
    }
}
