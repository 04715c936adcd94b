//! lessonmark configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::checkpoint::SchedulerConfig;

/// Checkpoint content settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Questions drawn per checkpoint instance.
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Recent lesson attempts fetched for the spawn decision.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Shuffle option order inside each selected question.
    #[serde(default)]
    pub shuffle_options: bool,
    /// Minimum percent for an on-time checkpoint submission to pass.
    #[serde(default = "default_pass_percent")]
    pub pass_percent: f64,
}

fn default_question_count() -> usize {
    3
}
fn default_history_limit() -> usize {
    5
}
fn default_pass_percent() -> f64 {
    80.0
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            history_limit: default_history_limit(),
            shuffle_options: false,
            pass_percent: default_pass_percent(),
        }
    }
}

/// Top-level lessonmark configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonmarkConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `lessonmark.toml` in the current directory
/// 2. `~/.config/lessonmark/config.toml`
///
/// Environment variable overrides: `LESSONMARK_BASE_PROBABILITY`,
/// `LESSONMARK_QUESTION_COUNT`.
pub fn load_config() -> Result<LessonmarkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LessonmarkConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("lessonmark.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LessonmarkConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Upper bound for `scheduler.cooldown_minutes` (about 100 years).
pub const MAX_COOLDOWN_MINUTES: i64 = 100 * 366 * 24 * 60;

/// Parse a TOML config string.
pub fn parse_config_str(content: &str) -> Result<LessonmarkConfig> {
    let config: LessonmarkConfig = toml::from_str(content)?;
    anyhow::ensure!(
        config.scheduler.base_probability.is_finite(),
        "scheduler.base_probability must be a finite number"
    );
    anyhow::ensure!(
        config.scheduler.cooldown_minutes >= 0,
        "scheduler.cooldown_minutes must not be negative"
    );
    anyhow::ensure!(
        config.scheduler.cooldown_minutes <= MAX_COOLDOWN_MINUTES,
        "scheduler.cooldown_minutes must be at most {MAX_COOLDOWN_MINUTES}"
    );
    Ok(config)
}

fn apply_env_overrides(config: &mut LessonmarkConfig) -> Result<()> {
    if let Ok(value) = std::env::var("LESSONMARK_BASE_PROBABILITY") {
        config.scheduler.base_probability = value
            .parse()
            .with_context(|| format!("invalid LESSONMARK_BASE_PROBABILITY: {value}"))?;
    }
    if let Ok(value) = std::env::var("LESSONMARK_QUESTION_COUNT") {
        config.checkpoint.question_count = value
            .parse()
            .with_context(|| format!("invalid LESSONMARK_QUESTION_COUNT: {value}"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lessonmark"))
}
