//! End-to-end engine tests against the in-memory store.
//!
//! These tests verify the lesson pipeline (fetch → score → persist → unlock)
//! and the checkpoint pipeline (decide → select → snapshot → grade).

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use lessonmark_core::config::LessonmarkConfig;
use lessonmark_core::engine::{CheckpointOutcome, LessonEngine};
use lessonmark_core::error::{EngineError, CONFIGURATION_USER_MESSAGE};
use lessonmark_core::model::{
    Arrangement, CourseOutline, GradingRuleSet, LessonDefinition, ModuleOutline, Placement,
    Question, QuestionOption, QuestionPool, ScoringRules, Validator, ValidatorKind,
};
use lessonmark_core::results::{CheckpointResponse, NextItem, SpawnReason};
use lessonmark_core::traits::{ProgressStore, ProgressTarget};
use lessonmark_store::MemoryStore;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 14, 15, 10, 0).unwrap()
}

fn lesson(id: &str, module_id: &str, weight: f64) -> LessonDefinition {
    LessonDefinition {
        id: id.into(),
        title: id.into(),
        module_id: module_id.into(),
        placeholders: vec!["ph1".into()],
        grading: GradingRuleSet {
            version: "1".into(),
            scoring_rules: ScoringRules::default(),
            validators: vec![Validator {
                id: "root".into(),
                kind: ValidatorKind::Equals,
                target: "ph1".into(),
                expected: vec!["<html>".into()],
                weight,
            }],
        },
    }
}

fn outline() -> CourseOutline {
    CourseOutline {
        id: "web-101".into(),
        modules: vec![
            ModuleOutline {
                id: "html".into(),
                lessons: vec!["tags".into(), "attributes".into()],
            },
            ModuleOutline {
                id: "css".into(),
                lessons: vec!["selectors".into()],
            },
        ],
    }
}

fn pool(module_id: &str, n: usize) -> QuestionPool {
    QuestionPool {
        module_id: module_id.into(),
        questions: (0..n)
            .map(|i| Question {
                id: format!("q{i}"),
                stem: format!("question {i}"),
                options: vec![
                    QuestionOption {
                        id: "a".into(),
                        text: "right".into(),
                    },
                    QuestionOption {
                        id: "b".into(),
                        text: "wrong".into(),
                    },
                ],
                answer: "a".into(),
                timer_seconds: 30,
                variations: vec![],
            })
            .collect(),
    }
}

fn answer(payload: &str) -> Arrangement {
    Arrangement::new(vec![Placement {
        placeholder_id: "ph1".into(),
        draggable_id: "d1".into(),
        payload: Some(payload.into()),
    }])
}

fn store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_lesson(lesson("tags", "html", 1.0))
            .with_lesson(lesson("attributes", "html", 1.0))
            .with_lesson(lesson("selectors", "css", 1.0))
            .with_lesson(lesson("broken", "html", 0.0))
            .with_outline(outline())
            .with_pool(pool("html", 5))
            .with_pool(pool("css", 0)),
    )
}

fn engine(store: &Arc<MemoryStore>, config: LessonmarkConfig) -> LessonEngine {
    LessonEngine::new(store.clone(), store.clone(), config)
}

fn always_spawn() -> LessonmarkConfig {
    let mut config = LessonmarkConfig::default();
    config.scheduler.base_probability = 1.0;
    config
}

// --- Lessons ---

#[tokio::test]
async fn passing_lesson_unlocks_next_in_module() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    let outcome = engine
        .complete_lesson_at("u1", "tags", &answer("<html>"), now())
        .await
        .unwrap();

    assert_eq!(outcome.result.mastery_percent, 100.0);
    assert!(outcome.result.passed);
    assert_eq!(outcome.record.attempts, 1);
    assert_eq!(
        outcome.next,
        Some(NextItem::Lesson {
            module_id: "html".into(),
            lesson_id: "attributes".into(),
        })
    );
    assert!(store.is_unlocked("u1", &ProgressTarget::Lesson("attributes".into())));
}

#[tokio::test]
async fn last_lesson_in_module_unlocks_next_module() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    let outcome = engine
        .complete_lesson_at("u1", "attributes", &answer("<html>"), now())
        .await
        .unwrap();

    assert!(matches!(outcome.next, Some(NextItem::Module { .. })));
    assert!(store.is_unlocked("u1", &ProgressTarget::Module("css".into())));
    assert!(store.is_unlocked("u1", &ProgressTarget::Lesson("selectors".into())));
}

#[tokio::test]
async fn failing_lesson_records_attempt_without_unlock() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    engine
        .complete_lesson_at("u1", "tags", &answer("<body>"), now())
        .await
        .unwrap();
    let outcome = engine
        .complete_lesson_at("u1", "tags", &answer("<div>"), now())
        .await
        .unwrap();

    assert_eq!(outcome.result.mastery_percent, 0.0);
    assert!(!outcome.result.passed);
    assert_eq!(outcome.record.attempts, 2);
    assert!(outcome.next.is_none());
    assert!(!store.is_unlocked("u1", &ProgressTarget::Lesson("attributes".into())));
}

#[tokio::test]
async fn zero_weight_lesson_is_configuration_error() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    let err = engine
        .complete_lesson_at("u1", "broken", &answer("<html>"), now())
        .await
        .unwrap_err();

    assert!(matches!(&err, EngineError::Scoring(e) if e.is_configuration()));
    assert!(!err.is_retryable());
    assert_eq!(err.user_message(), CONFIGURATION_USER_MESSAGE);
    assert_eq!(store.write_count(), 0, "nothing persisted for a broken lesson");
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    let err = engine
        .complete_lesson_at("u1", "missing", &answer("<html>"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "lesson", .. }));
}

#[tokio::test]
async fn storage_outage_is_retryable() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());
    store.set_offline(true);

    let err = engine
        .complete_lesson_at("u1", "tags", &answer("<html>"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unavailable(_)));
    assert!(err.is_retryable());

    let err = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn failed_unlock_still_returns_recorded_attempt() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());
    store.set_unlocks_failing(true);

    let outcome = engine
        .complete_lesson_at("u1", "tags", &answer("<html>"), now())
        .await
        .unwrap();
    assert!(outcome.result.passed);
    assert_eq!(outcome.record.attempts, 1);
    assert!(outcome.next.is_none());
    assert_eq!(store.write_count(), 1);
    assert!(!store.is_unlocked("u1", &ProgressTarget::Lesson("attributes".into())));

    // Once unlocks work again, passing unlocks the next lesson.
    store.set_unlocks_failing(false);
    let outcome = engine
        .complete_lesson_at("u1", "tags", &answer("<html>"), now())
        .await
        .unwrap();
    assert_eq!(outcome.record.attempts, 2);
    assert!(store.is_unlocked("u1", &ProgressTarget::Lesson("attributes".into())));
}

#[tokio::test]
async fn concurrent_submissions_do_not_lose_attempts() {
    let store = store();
    let engine = Arc::new(engine(&store, LessonmarkConfig::default()));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let payload = if i % 2 == 0 { "<html>" } else { "<p>" };
                engine
                    .complete_lesson_at("u1", "tags", &answer(payload), now())
                    .await
                    .map(|o| o.record.attempts)
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let record = store
        .progress_for("u1", &ProgressTarget::Lesson("tags".into()))
        .unwrap();
    assert_eq!(record.attempts, 20);
    assert!(record.passed);
}

// --- Checkpoints ---

#[tokio::test]
async fn spawn_snapshots_selected_questions() {
    let store = store();
    let engine = engine(&store, always_spawn());

    let outcome = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap();
    let CheckpointOutcome::Spawned { decision, instance } = outcome else {
        panic!("expected a spawned checkpoint");
    };

    assert!(decision.should_spawn);
    assert_eq!(decision.probability, 1.0);
    assert_eq!(instance.questions.len(), 3);
    assert_eq!(instance.expires_at, now() + Duration::seconds(90));

    let latest = store.latest_checkpoint_at("u1").await.unwrap();
    assert_eq!(latest, Some(now()));
}

#[tokio::test]
async fn spawn_decision_is_stable_within_the_hour() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    let first = engine.spawn_checkpoint_at("u7", "css", now()).await.unwrap();
    let later = engine
        .spawn_checkpoint_at("u7", "css", now() + Duration::minutes(30))
        .await
        .unwrap();

    assert_eq!(first.decision().should_spawn, later.decision().should_spawn);
    assert_eq!(first.decision().draw, later.decision().draw);
}

#[tokio::test]
async fn empty_pool_cannot_spawn() {
    let store = store();
    let engine = engine(&store, always_spawn());

    let outcome = engine.spawn_checkpoint_at("u1", "css", now()).await.unwrap();
    assert!(matches!(outcome, CheckpointOutcome::EmptyPool { .. }));

    let outcome = engine.spawn_checkpoint_at("u1", "unknown", now()).await.unwrap();
    assert!(matches!(outcome, CheckpointOutcome::EmptyPool { .. }));
    assert!(store.latest_checkpoint_at("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn zero_probability_never_spawns() {
    let store = store();
    let mut config = LessonmarkConfig::default();
    config.scheduler.base_probability = 0.0;
    let engine = engine(&store, config);

    let outcome = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap();
    assert!(matches!(outcome, CheckpointOutcome::NotSpawned { .. }));
    assert!(outcome.instance().is_none());
}

#[tokio::test]
async fn recent_checkpoint_triggers_cooldown() {
    let store = store();
    let mut config = always_spawn();
    config.scheduler.cooldown_penalty = 1.0;
    let engine = engine(&store, config);

    let first = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap();
    assert!(first.instance().is_some());

    let second = engine
        .spawn_checkpoint_at("u1", "html", now() + Duration::minutes(10))
        .await
        .unwrap();
    assert!(matches!(second, CheckpointOutcome::NotSpawned { .. }));
    assert_eq!(second.decision().reason, SpawnReason::Cooldown);
    assert_eq!(second.decision().probability, 0.0);
}

#[tokio::test]
async fn struggling_history_raises_probability() {
    let store = store();
    let engine = engine(&store, LessonmarkConfig::default());

    for _ in 0..3 {
        engine
            .complete_lesson_at("u1", "tags", &answer("<p>"), now())
            .await
            .unwrap();
    }

    let outcome = engine.spawn_checkpoint_at("u1", "css", now()).await.unwrap();
    assert_eq!(outcome.decision().reason, SpawnReason::StrugglingLearner);
    assert!((outcome.decision().probability - 0.27).abs() < 1e-9);
}

#[tokio::test]
async fn submit_grades_against_snapshot() {
    let store = store();
    let engine = engine(&store, always_spawn());

    let outcome = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap();
    let instance = outcome.instance().unwrap().clone();
    let responses: Vec<CheckpointResponse> = instance
        .questions
        .iter()
        .map(|q| CheckpointResponse {
            question_id: q.id.clone(),
            option_id: q.answer.clone(),
        })
        .collect();

    let on_time = engine
        .submit_checkpoint_at("u1", instance.id, &responses, now() + Duration::seconds(45))
        .await
        .unwrap();
    assert_eq!(on_time.grade.correct, 3);
    assert_eq!(on_time.grade.percent, 100.0);
    assert!(on_time.passed);
    assert_eq!(on_time.record.target, ProgressTarget::Checkpoint(instance.id));

    let late = engine
        .submit_checkpoint_at("u1", instance.id, &responses, now() + Duration::minutes(5))
        .await
        .unwrap();
    assert!(late.grade.late);
    assert!(!late.passed);
    assert_eq!(late.record.attempts, 2);
}

#[tokio::test]
async fn submit_for_another_user_is_not_found() {
    let store = store();
    let engine = engine(&store, always_spawn());

    let outcome = engine.spawn_checkpoint_at("u1", "html", now()).await.unwrap();
    let id = outcome.instance().unwrap().id;

    let err = engine
        .submit_checkpoint_at("u2", id, &[], now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "checkpoint", .. }));
}
