//! TOML lesson and question pool parser.
//!
//! Loads authored lessons and checkpoint pools from TOML files and
//! directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{GradingRuleSet, LessonDefinition, QuestionPool, ValidatorKind};

/// Intermediate TOML structure for lesson files.
#[derive(Debug, Deserialize)]
struct TomlLessonFile {
    lesson: TomlLessonHeader,
    #[serde(default)]
    placeholders: Vec<String>,
    grading: GradingRuleSet,
}

#[derive(Debug, Deserialize)]
struct TomlLessonHeader {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    module_id: String,
}

/// Intermediate TOML structure for question pool files.
#[derive(Debug, Deserialize)]
struct TomlPoolFile {
    pool: TomlPoolHeader,
    #[serde(default)]
    questions: Vec<crate::model::Question>,
}

#[derive(Debug, Deserialize)]
struct TomlPoolHeader {
    module_id: String,
}

/// Parse a single TOML lesson file.
pub fn parse_lesson(path: &Path) -> Result<LessonDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read lesson file: {}", path.display()))?;

    parse_lesson_str(&content, path)
}

/// Parse a TOML string into a `LessonDefinition`.
pub fn parse_lesson_str(content: &str, source_path: &Path) -> Result<LessonDefinition> {
    let parsed: TomlLessonFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(LessonDefinition {
        id: parsed.lesson.id,
        title: parsed.lesson.title,
        module_id: parsed.lesson.module_id,
        placeholders: parsed.placeholders,
        grading: parsed.grading,
    })
}

/// Parse a single TOML question pool file.
pub fn parse_question_pool(path: &Path) -> Result<QuestionPool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question pool file: {}", path.display()))?;

    parse_question_pool_str(&content, path)
}

/// Parse a TOML string into a `QuestionPool`.
pub fn parse_question_pool_str(content: &str, source_path: &Path) -> Result<QuestionPool> {
    let parsed: TomlPoolFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(QuestionPool {
        module_id: parsed.pool.module_id,
        questions: parsed.questions,
    })
}

/// Recursively load all `.toml` lesson files from a directory.
///
/// Files that are not lessons (pools, configs) are skipped with a warning.
pub fn load_lesson_directory(dir: &Path) -> Result<Vec<LessonDefinition>> {
    let mut lessons = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            lessons.extend(load_lesson_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_lesson(&path) {
                Ok(lesson) => lessons.push(lesson),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(lessons)
}

/// A warning from lesson or pool validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The validator or question ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn item(id: &str, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn global(message: impl Into<String>) -> Self {
        Self {
            item_id: None,
            message: message.into(),
        }
    }
}

/// Validate a lesson's grading rule set for common authoring issues.
pub fn validate_lesson(lesson: &LessonDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let grading = &lesson.grading;

    let mut seen_ids = HashSet::new();
    for v in &grading.validators {
        if !seen_ids.insert(&v.id) {
            warnings.push(ValidationWarning::item(
                &v.id,
                format!("duplicate validator ID: {}", v.id),
            ));
        }
    }

    for v in &grading.validators {
        if v.weight < 0.0 || !v.weight.is_finite() {
            warnings.push(ValidationWarning::item(
                &v.id,
                format!("weight must be a non-negative number, got {}", v.weight),
            ));
        }
    }

    if grading.total_weight() == 0.0 {
        warnings.push(ValidationWarning::global(
            "total validator weight is zero; scoring will fail",
        ));
    }

    let threshold = grading.scoring_rules.pass_threshold;
    if !(0.0..=100.0).contains(&threshold) {
        warnings.push(ValidationWarning::global(format!(
            "pass_threshold {threshold} is outside 0..=100"
        )));
    }

    for v in &grading.validators {
        match v.kind {
            ValidatorKind::Regex => match v.expected.first() {
                None => warnings.push(ValidationWarning::item(
                    &v.id,
                    "regex validator has no pattern and will never pass",
                )),
                Some(pattern) => {
                    if let Err(e) = regex::Regex::new(pattern) {
                        warnings.push(ValidationWarning::item(
                            &v.id,
                            format!("regex pattern does not compile and will never pass: {e}"),
                        ));
                    }
                }
            },
            ValidatorKind::OrderMatch => warnings.push(ValidationWarning::item(
                &v.id,
                "order_match is not yet implemented and always passes",
            )),
            ValidatorKind::Custom => warnings.push(ValidationWarning::item(
                &v.id,
                "custom validators are not yet implemented and never pass",
            )),
            ValidatorKind::Equals | ValidatorKind::Contains => {
                if v.expected.is_empty() {
                    warnings.push(ValidationWarning::item(
                        &v.id,
                        "no expected values; validator will never pass",
                    ));
                }
            }
        }
    }

    if !lesson.placeholders.is_empty() {
        let declared: HashSet<&str> = lesson.placeholders.iter().map(String::as_str).collect();
        for v in &grading.validators {
            if !declared.contains(v.target.as_str()) {
                warnings.push(ValidationWarning::item(
                    &v.id,
                    format!("target {:?} is not a declared placeholder", v.target),
                ));
            }
        }
    }

    warnings
}

/// Validate a question pool for common authoring issues.
pub fn validate_question_pool(pool: &QuestionPool) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if pool.is_empty() {
        warnings.push(ValidationWarning::global(
            "pool has no questions; checkpoints cannot spawn",
        ));
    }

    let mut seen_ids = HashSet::new();
    for q in &pool.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning::item(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }

        if q.options.is_empty() {
            warnings.push(ValidationWarning::item(&q.id, "question has no options"));
        } else if !q.options.iter().any(|o| o.id == q.answer) {
            warnings.push(ValidationWarning::item(
                &q.id,
                format!("answer {:?} is not one of the options", q.answer),
            ));
        }

        if q.timer_seconds == 0 {
            warnings.push(ValidationWarning::item(&q.id, "timer_seconds is zero"));
        }

        for (i, v) in q.variations.iter().enumerate() {
            if !v.options.iter().any(|o| o.id == v.answer) {
                warnings.push(ValidationWarning::item(
                    &q.id,
                    format!("variation {i} answer {:?} is not one of its options", v.answer),
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_LESSON: &str = r#"
placeholders = ["ph1", "ph2"]

[lesson]
id = "html-skeleton"
title = "The HTML skeleton"
module_id = "html"

[grading]
version = "2"

[grading.scoring_rules]
normalize_weights = true
precision = 2
pass_threshold = 98.0

[[grading.validators]]
id = "open-tag"
kind = "equals"
target = "ph1"
expected = ["<html>"]
weight = 0.5

[[grading.validators]]
id = "body-tag"
kind = "contains"
target = "ph2"
expected = ["body"]
weight = 0.5
"#;

    const VALID_POOL: &str = r#"
[pool]
module_id = "html"

[[questions]]
id = "q-root"
stem = "Which element wraps an entire page?"
answer = "a"
timer_seconds = 20

[[questions.options]]
id = "a"
text = "<html>"

[[questions.options]]
id = "b"
text = "<div>"

[[questions.variations]]
stem = "What is the root element of an HTML document?"
answer = "y"

[[questions.variations.options]]
id = "x"
text = "<head>"

[[questions.variations.options]]
id = "y"
text = "<html>"
"#;

    fn lesson_from(toml: &str) -> LessonDefinition {
        parse_lesson_str(toml, &PathBuf::from("test.toml")).unwrap()
    }

    #[test]
    fn parse_valid_lesson() {
        let lesson = lesson_from(VALID_LESSON);
        assert_eq!(lesson.id, "html-skeleton");
        assert_eq!(lesson.module_id, "html");
        assert_eq!(lesson.placeholders, vec!["ph1", "ph2"]);
        assert_eq!(lesson.grading.version, "2");
        assert_eq!(lesson.grading.validators.len(), 2);
        assert_eq!(lesson.grading.validators[1].kind, ValidatorKind::Contains);
        assert!(validate_lesson(&lesson).is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let lesson = lesson_from(
            r#"
[lesson]
id = "minimal"

[grading]

[[grading.validators]]
id = "v1"
kind = "equals"
target = "ph1"
expected = ["x"]
weight = 1.0
"#,
        );
        assert!(lesson.placeholders.is_empty());
        assert!(lesson.grading.scoring_rules.normalize_weights);
        assert_eq!(lesson.grading.scoring_rules.precision, 2);
        assert_eq!(lesson.grading.scoring_rules.pass_threshold, 98.0);
    }

    #[test]
    fn parse_unknown_validator_kind_fails() {
        let bad = VALID_LESSON.replace("kind = \"contains\"", "kind = \"fuzzy\"");
        assert!(parse_lesson_str(&bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let result = parse_lesson_str("this is not [valid toml }{", &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_flags_authoring_issues() {
        let lesson = lesson_from(
            r#"
placeholders = ["ph1"]

[lesson]
id = "broken"

[grading.scoring_rules]
pass_threshold = 120.0

[[grading.validators]]
id = "dup"
kind = "regex"
target = "ph1"
expected = ["[unclosed"]
weight = 0.0

[[grading.validators]]
id = "dup"
kind = "custom"
target = "ph9"
weight = 0.0
"#,
        );
        let warnings = validate_lesson(&lesson);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate validator ID"));
        assert!(has("total validator weight is zero"));
        assert!(has("pass_threshold"));
        assert!(has("does not compile"));
        assert!(has("custom validators"));
        assert!(has("not a declared placeholder"));
    }

    #[test]
    fn validate_negative_weight() {
        let mut lesson = lesson_from(VALID_LESSON);
        lesson.grading.validators[0].weight = -1.0;
        let warnings = validate_lesson(&lesson);
        assert!(warnings.iter().any(|w| w.message.contains("non-negative")
            && w.item_id.as_deref() == Some("open-tag")));
    }

    #[test]
    fn targets_unchecked_without_declared_placeholders() {
        let mut lesson = lesson_from(VALID_LESSON);
        lesson.placeholders.clear();
        lesson.grading.validators[0].target = "elsewhere".into();
        assert!(validate_lesson(&lesson).is_empty());
    }

    #[test]
    fn parse_valid_pool() {
        let pool = parse_question_pool_str(VALID_POOL, &PathBuf::from("pool.toml")).unwrap();
        assert_eq!(pool.module_id, "html");
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.questions[0].options.len(), 2);
        assert_eq!(pool.questions[0].variations.len(), 1);
        assert_eq!(pool.questions[0].variations[0].answer, "y");
        assert!(validate_question_pool(&pool).is_empty());
    }

    #[test]
    fn validate_pool_issues() {
        let mut pool = parse_question_pool_str(VALID_POOL, &PathBuf::from("pool.toml")).unwrap();
        let mut copy = pool.questions[0].clone();
        copy.answer = "z".into();
        copy.timer_seconds = 0;
        copy.variations[0].answer = "nope".into();
        pool.questions.push(copy);

        let warnings = validate_question_pool(&pool);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate question ID"));
        assert!(has("is not one of the options"));
        assert!(has("timer_seconds is zero"));
        assert!(has("variation 0 answer"));
    }

    #[test]
    fn validate_empty_pool() {
        let warnings = validate_question_pool(&QuestionPool::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn load_directory_skips_non_lessons() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lesson.toml"), VALID_LESSON).unwrap();
        std::fs::write(dir.path().join("pool.toml"), VALID_POOL).unwrap();
        std::fs::write(dir.path().join("notes.md"), "# notes").unwrap();

        let lessons = load_lesson_directory(dir.path()).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, "html-skeleton");
    }
}
