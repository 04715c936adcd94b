//! Checkpoint scheduling: spawn decisions, question selection, grading.
//!
//! The spawn *decision* is deterministic per (user, module, hour): retries
//! inside the same clock hour see the same answer, and no seed is stored.
//! The spawn *content* is intentionally random per instance and is not
//! reproducible.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{LessonAttempt, QuestionPool};
use crate::results::{
    CheckpointDecision, CheckpointGrade, CheckpointInstance, CheckpointResponse,
    ResolvedQuestion, SpawnReason,
};
use crate::scoring::round_half_up;

const MS_PER_HOUR: i64 = 3_600_000;

/// Tunables for the spawn decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Probability before any adjustment.
    #[serde(default = "default_base_probability")]
    pub base_probability: f64,
    /// How many of the most recent attempts are inspected.
    #[serde(default = "default_struggle_window")]
    pub struggle_window: usize,
    /// Fraction of failing attempts above which the learner is struggling.
    #[serde(default = "default_struggle_ratio")]
    pub struggle_ratio: f64,
    /// Mastery percent below which an attempt counts as failing.
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f64,
    #[serde(default = "default_struggle_boost")]
    pub struggle_boost: f64,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
    #[serde(default = "default_cooldown_penalty")]
    pub cooldown_penalty: f64,
    /// Clamp the adjusted probability to `[0, 1]`.
    #[serde(default = "default_true")]
    pub clamp_probability: bool,
}

fn default_base_probability() -> f64 {
    0.12
}
fn default_struggle_window() -> usize {
    5
}
fn default_struggle_ratio() -> f64 {
    0.4
}
fn default_mastery_threshold() -> f64 {
    98.0
}
fn default_struggle_boost() -> f64 {
    0.15
}
fn default_cooldown_minutes() -> i64 {
    120
}
fn default_cooldown_penalty() -> f64 {
    0.08
}
fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_probability: default_base_probability(),
            struggle_window: default_struggle_window(),
            struggle_ratio: default_struggle_ratio(),
            mastery_threshold: default_mastery_threshold(),
            struggle_boost: default_struggle_boost(),
            cooldown_minutes: default_cooldown_minutes(),
            cooldown_penalty: default_cooldown_penalty(),
            clamp_probability: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Spawn decision
// ---------------------------------------------------------------------------

/// Hour bucket of a timestamp: `floor(unix_ms / 3_600_000)`.
pub fn hour_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().div_euclid(MS_PER_HOUR)
}

/// Map a seed string to a pseudo-uniform float in `[0, 1)`.
///
/// SHA-256 of the seed; the first 8 hex digits are read as a `u32` and divided
/// by `2^32`.
pub fn seed_to_unit(seed: &str) -> f64 {
    let digest = hex::encode(Sha256::digest(seed.as_bytes()));
    // A SHA-256 hex digest is 64 ASCII hex digits, so the prefix always parses.
    let prefix = u32::from_str_radix(&digest[..8], 16).unwrap_or(0);
    f64::from(prefix) / (f64::from(u32::MAX) + 1.0)
}

/// Decide whether to spawn a checkpoint now.
pub fn decide_spawn(
    user_id: &str,
    module_id: &str,
    recent: &[LessonAttempt],
    last_checkpoint: Option<DateTime<Utc>>,
    config: &SchedulerConfig,
) -> CheckpointDecision {
    decide_spawn_at(user_id, module_id, recent, last_checkpoint, config, Utc::now())
}

/// Decide whether to spawn a checkpoint at a given instant.
///
/// `recent` is ordered most recent first.
pub fn decide_spawn_at(
    user_id: &str,
    module_id: &str,
    recent: &[LessonAttempt],
    last_checkpoint: Option<DateTime<Utc>>,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> CheckpointDecision {
    let mut probability = config.base_probability;
    let mut reason = SpawnReason::BaseRate;

    let window = &recent[..recent.len().min(config.struggle_window)];
    if !window.is_empty() {
        let failing = window
            .iter()
            .filter(|a| a.mastery_percent < config.mastery_threshold)
            .count();
        if failing as f64 / window.len() as f64 > config.struggle_ratio {
            probability += config.struggle_boost;
            reason = SpawnReason::StrugglingLearner;
        }
    }

    if let Some(last) = last_checkpoint {
        // A window too large for `Duration` covers every past checkpoint.
        let in_cooldown = match Duration::try_minutes(config.cooldown_minutes) {
            Some(window) => now - last < window,
            None => true,
        };
        if in_cooldown {
            probability -= config.cooldown_penalty;
            reason = SpawnReason::Cooldown;
        }
    }

    if config.clamp_probability {
        probability = probability.clamp(0.0, 1.0);
    }

    let bucket = hour_bucket(now);
    let draw = seed_to_unit(&format!("{user_id}:{module_id}:{bucket}"));
    let should_spawn = draw < probability;

    tracing::debug!(
        user_id,
        module_id,
        probability,
        draw,
        %reason,
        should_spawn,
        "checkpoint spawn decision"
    );

    CheckpointDecision {
        should_spawn,
        probability,
        reason,
        draw,
        hour_bucket: bucket,
    }
}

// ---------------------------------------------------------------------------
// Question selection
// ---------------------------------------------------------------------------

/// Sample up to `count` questions from a pool using the thread RNG.
pub fn select_questions(pool: &QuestionPool, count: usize) -> Vec<ResolvedQuestion> {
    select_questions_with(pool, count, &mut rand::thread_rng())
}

/// Sample up to `count` questions without replacement, resolving variations.
///
/// Each selected question with variations has an even chance of being
/// replaced by one of them, chosen uniformly. The base id and timer are kept.
/// An empty pool yields an empty list.
pub fn select_questions_with<R: Rng + ?Sized>(
    pool: &QuestionPool,
    count: usize,
    rng: &mut R,
) -> Vec<ResolvedQuestion> {
    let take = count.min(pool.len());
    let mut candidates: Vec<usize> = (0..pool.len()).collect();
    let mut selected = Vec::with_capacity(take);

    for _ in 0..take {
        let pick = rng.gen_range(0..candidates.len());
        let question = &pool.questions[candidates.swap_remove(pick)];

        let variation = if !question.variations.is_empty() && rng.gen_bool(0.5) {
            let index = rng.gen_range(0..question.variations.len());
            Some(index)
        } else {
            None
        };

        let resolved = match variation.map(|i| (i, &question.variations[i])) {
            Some((index, v)) => ResolvedQuestion {
                id: question.id.clone(),
                stem: v.stem.clone(),
                options: v.options.clone(),
                answer: v.answer.clone(),
                timer_seconds: question.timer_seconds,
                variation: Some(index),
            },
            None => ResolvedQuestion {
                id: question.id.clone(),
                stem: question.stem.clone(),
                options: question.options.clone(),
                answer: question.answer.clone(),
                timer_seconds: question.timer_seconds,
                variation: None,
            },
        };
        selected.push(resolved);
    }

    selected
}

/// Shuffle the option order of each question in place.
///
/// Answers reference option ids, so grading is unaffected.
pub fn shuffle_options<R: Rng + ?Sized>(questions: &mut [ResolvedQuestion], rng: &mut R) {
    for q in questions {
        q.options.shuffle(rng);
    }
}

// ---------------------------------------------------------------------------
// Instances and grading
// ---------------------------------------------------------------------------

/// Build a checkpoint instance, snapshotting the selected questions.
pub fn new_instance(
    user_id: &str,
    module_id: &str,
    questions: Vec<ResolvedQuestion>,
    probability: f64,
    created_at: DateTime<Utc>,
) -> CheckpointInstance {
    let time_limit: i64 = questions.iter().map(|q| i64::from(q.timer_seconds)).sum();
    CheckpointInstance {
        id: uuid::Uuid::new_v4(),
        user_id: user_id.to_string(),
        module_id: module_id.to_string(),
        questions,
        probability,
        created_at,
        expires_at: created_at + Duration::seconds(time_limit),
    }
}

/// Grade responses against the questions embedded in the instance.
///
/// Responses for unknown question ids are ignored; a question with no
/// response counts as wrong. If a question is answered twice the last
/// response wins.
pub fn grade_checkpoint(
    instance: &CheckpointInstance,
    responses: &[CheckpointResponse],
    submitted_at: DateTime<Utc>,
) -> CheckpointGrade {
    let chosen: HashMap<&str, &str> = responses
        .iter()
        .map(|r| (r.question_id.as_str(), r.option_id.as_str()))
        .collect();

    let total = instance.questions.len() as u32;
    let correct = instance
        .questions
        .iter()
        .filter(|q| chosen.get(q.id.as_str()) == Some(&q.answer.as_str()))
        .count() as u32;

    let percent = if total == 0 {
        0.0
    } else {
        round_half_up(f64::from(correct) / f64::from(total) * 100.0, 2)
    };

    CheckpointGrade {
        correct,
        total,
        percent,
        late: submitted_at > instance.expires_at,
    }
}
