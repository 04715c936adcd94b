//! The `lessonmark init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("lessonmark.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("lessons")?;
    write_if_missing(Path::new("lessons/example.toml"), EXAMPLE_LESSON)?;
    write_if_missing(Path::new("lessons/example-pool.toml"), EXAMPLE_POOL)?;

    println!("\nNext steps:");
    println!("  1. Tune the scheduler in lessonmark.toml");
    println!("  2. Run: lessonmark validate --path lessons/example.toml --pool lessons/example-pool.toml");
    println!("  3. Run: lessonmark select --pool lessons/example-pool.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lessonmark configuration

[scheduler]
base_probability = 0.12
struggle_window = 5
struggle_ratio = 0.4
mastery_threshold = 98.0
struggle_boost = 0.15
cooldown_minutes = 120
cooldown_penalty = 0.08
clamp_probability = true

[checkpoint]
question_count = 3
history_limit = 5
shuffle_options = false
pass_percent = 80.0
"#;

const EXAMPLE_LESSON: &str = r#"placeholders = ["doctype", "root", "body"]

[lesson]
id = "html-skeleton"
title = "The HTML skeleton"
module_id = "html-basics"

[grading]
version = "1"

[grading.scoring_rules]
normalize_weights = true
precision = 2
pass_threshold = 98.0

[[grading.validators]]
id = "doctype"
kind = "equals"
target = "doctype"
expected = ["doctype-html"]
weight = 1.0

[[grading.validators]]
id = "root-element"
kind = "regex"
target = "root"
expected = ["^<html( lang=\"[a-z]+\")?>$"]
weight = 1.0

[[grading.validators]]
id = "body-element"
kind = "contains"
target = "body"
expected = ["body"]
weight = 2.0
"#;

const EXAMPLE_POOL: &str = r#"[pool]
module_id = "html-basics"

[[questions]]
id = "root-element"
stem = "Which element wraps an entire HTML page?"
answer = "html"
timer_seconds = 30

[[questions.options]]
id = "html"
text = "<html>"

[[questions.options]]
id = "div"
text = "<div>"

[[questions.options]]
id = "main"
text = "<main>"

[[questions]]
id = "doctype"
stem = "What does <!DOCTYPE html> declare?"
answer = "html5"
timer_seconds = 30

[[questions.options]]
id = "html5"
text = "The document is HTML5"

[[questions.options]]
id = "xml"
text = "The document is XML"

[[questions]]
id = "head-purpose"
stem = "Which element holds the page title and metadata?"
answer = "head"
timer_seconds = 20

[[questions.options]]
id = "head"
text = "<head>"

[[questions.options]]
id = "header"
text = "<header>"
"#;
