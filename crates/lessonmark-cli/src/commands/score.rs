//! The `lessonmark score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use lessonmark_core::model::Arrangement;
use lessonmark_core::parser;
use lessonmark_core::scoring::compute_score;

pub fn execute(lesson_path: PathBuf, arrangement_path: PathBuf, format: String) -> Result<()> {
    let lesson = parser::parse_lesson(&lesson_path)?;

    let content = std::fs::read_to_string(&arrangement_path).with_context(|| {
        format!(
            "failed to read arrangement file: {}",
            arrangement_path.display()
        )
    })?;
    let arrangement: Arrangement = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse arrangement: {}", arrangement_path.display()))?;

    let result = compute_score(&lesson.grading, &arrangement)
        .with_context(|| format!("cannot score lesson {}", lesson.id))?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            let mut table = Table::new();
            table.set_header(vec!["Validator", "Kind", "Target", "Weight", "Result"]);
            for (validator, outcome) in lesson
                .grading
                .validators
                .iter()
                .zip(&result.validator_results)
            {
                table.add_row(vec![
                    validator.id.clone(),
                    validator.kind.to_string(),
                    validator.target.clone(),
                    format!("{}", outcome.weight),
                    if outcome.passed { "PASS" } else { "FAIL" }.to_string(),
                ]);
            }
            println!("Lesson: {} ({})", lesson.title, lesson.id);
            println!("{table}");

            let precision = lesson.grading.scoring_rules.precision as usize;
            println!(
                "Mastery: {:.precision$}% (threshold {}%) {}",
                result.mastery_percent,
                lesson.grading.scoring_rules.pass_threshold,
                if result.passed { "PASSED" } else { "NOT PASSED" }
            );
        }
    }

    Ok(())
}
