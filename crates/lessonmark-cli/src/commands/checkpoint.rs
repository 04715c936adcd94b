//! The `lessonmark checkpoint` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use lessonmark_core::checkpoint::decide_spawn_at;
use lessonmark_core::config::load_config_from;
use lessonmark_core::model::LessonAttempt;

pub fn execute(
    user: String,
    module: String,
    history_path: Option<PathBuf>,
    last_checkpoint: Option<String>,
    at: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let history: Vec<LessonAttempt> = match &history_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read history file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse history: {}", path.display()))?
        }
        None => Vec::new(),
    };

    let last_checkpoint = last_checkpoint
        .as_deref()
        .map(|s| parse_timestamp(s, "--last-checkpoint"))
        .transpose()?;
    let now = match at.as_deref() {
        Some(s) => parse_timestamp(s, "--at")?,
        None => Utc::now(),
    };

    let decision = decide_spawn_at(
        &user,
        &module,
        &history,
        last_checkpoint,
        &config.scheduler,
        now,
    );

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn parse_timestamp(value: &str, flag: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("{flag} must be an RFC 3339 timestamp, got {value:?}"))
}
