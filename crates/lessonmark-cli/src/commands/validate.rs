//! The `lessonmark validate` command.

use std::path::PathBuf;

use anyhow::Result;

use lessonmark_core::parser::{self, ValidationWarning};

pub fn execute(path: Option<PathBuf>, pool_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(
        path.is_some() || pool_path.is_some(),
        "nothing to validate: pass --path and/or --pool"
    );

    let mut total_warnings = 0;

    if let Some(path) = path {
        let lessons = if path.is_dir() {
            parser::load_lesson_directory(&path)?
        } else {
            vec![parser::parse_lesson(&path)?]
        };

        for lesson in &lessons {
            println!(
                "Lesson: {} ({} validators)",
                lesson.id,
                lesson.grading.validators.len()
            );
            let warnings = parser::validate_lesson(lesson);
            print_warnings(&warnings);
            total_warnings += warnings.len();
        }
    }

    if let Some(pool_path) = pool_path {
        let pool = parser::parse_question_pool(&pool_path)?;
        println!(
            "Question pool: {} ({} questions)",
            pool.module_id,
            pool.questions.len()
        );
        let warnings = parser::validate_question_pool(&pool);
        print_warnings(&warnings);
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All files valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

fn print_warnings(warnings: &[ValidationWarning]) {
    for w in warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }
}
