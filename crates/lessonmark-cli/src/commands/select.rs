//! The `lessonmark select` command.

use std::path::PathBuf;

use anyhow::Result;

use lessonmark_core::checkpoint::{select_questions_with, shuffle_options};
use lessonmark_core::config::load_config_from;
use lessonmark_core::parser;

pub fn execute(pool_path: PathBuf, count: Option<usize>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let pool = parser::parse_question_pool(&pool_path)?;

    let count = count.unwrap_or(config.checkpoint.question_count);
    let mut rng = rand::thread_rng();
    let mut questions = select_questions_with(&pool, count, &mut rng);
    if config.checkpoint.shuffle_options {
        shuffle_options(&mut questions, &mut rng);
    }

    if questions.is_empty() {
        tracing::warn!("question pool {} is empty", pool.module_id);
    }

    println!("{}", serde_json::to_string_pretty(&questions)?);
    Ok(())
}
