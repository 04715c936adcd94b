//! lessonmark CLI: the operator-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lessonmark", version, about = "Lesson scoring and checkpoint tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an arrangement against a lesson's grading rules
    Score {
        /// Path to the lesson .toml file
        #[arg(long)]
        lesson: PathBuf,

        /// Path to the arrangement JSON (array of placements)
        #[arg(long)]
        arrangement: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate lesson and question pool TOML files
    Validate {
        /// Path to a lesson file or directory of lessons
        #[arg(long)]
        path: Option<PathBuf>,

        /// Path to a question pool file
        #[arg(long)]
        pool: Option<PathBuf>,
    },

    /// Decide whether a checkpoint would spawn for a learner now
    Checkpoint {
        /// Learner id
        #[arg(long)]
        user: String,

        /// Module id
        #[arg(long)]
        module: String,

        /// Recent lesson attempts JSON, newest first
        #[arg(long)]
        history: Option<PathBuf>,

        /// Creation time of the learner's last checkpoint (RFC 3339)
        #[arg(long)]
        last_checkpoint: Option<String>,

        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long)]
        at: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Draw a random question selection from a pool
    Select {
        /// Path to the question pool .toml file
        #[arg(long)]
        pool: PathBuf,

        /// Number of questions (default: from config)
        #[arg(long)]
        count: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config, example lesson, and example pool
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lessonmark=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            lesson,
            arrangement,
            format,
        } => commands::score::execute(lesson, arrangement, format),
        Commands::Validate { path, pool } => commands::validate::execute(path, pool),
        Commands::Checkpoint {
            user,
            module,
            history,
            last_checkpoint,
            at,
            config,
        } => commands::checkpoint::execute(user, module, history, last_checkpoint, at, config),
        Commands::Select {
            pool,
            count,
            config,
        } => commands::select::execute(pool, count, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
