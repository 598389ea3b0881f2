//! # doc-intake CLI (`intake`)
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite table (no-op for other backends) |
//! | `intake process <file>` | Classify, extract and record one document |
//! | `intake history` | Show the newest processing results |
//! | `intake result <task_id>` | Show one stored result |
//! | `intake source show <id>` | Show a source's info, extracted values and thread |
//! | `intake source set <id> --type <t>` | Record source info |
//! | `intake source delete <id>` | Delete a source's records |
//! | `intake serve` | Start the HTTP API |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_intake::{config, history, migrate, process, server, sources};

/// doc-intake: LLM document classification and extraction with a
/// persistent processing history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/intake.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Classify and extract structured data from documents with an LLM",
    version,
    long_about = "doc-intake loads PDF, JSON and text/email documents, asks an LLM to classify \
    their format and intent, runs a format-specific extraction prompt, and records the result \
    in memory, SQLite or Redis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/intake.toml`. When the file does not exist the
    /// built-in defaults are used (SQLite at `./data/intake.sqlite`, Gemini
    /// provider).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize storage.
    ///
    /// Creates the SQLite `memory` table when `storage.backend = "sqlite"`.
    /// Idempotent; other backends need no initialization.
    Init,

    /// Process one document and record the result.
    Process {
        /// Path to a .pdf, .json or .txt file.
        file: PathBuf,

        /// Override the type inferred from the file extension.
        #[arg(long = "type", value_parser = ["pdf", "json", "txt"])]
        file_type: Option<String>,
    },

    /// Show recent processing results, newest first.
    History {
        /// Number of entries (default: `history.display_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one stored processing result.
    #[command(name = "result")]
    TaskResult {
        /// Task id printed by `intake process`.
        task_id: String,
    },

    /// Inspect or edit source-scoped records.
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Start the HTTP API on `server.bind`.
    Serve,
}

#[derive(Subcommand)]
enum SourceAction {
    /// Print source info, extracted values and thread id.
    Show { id: String },

    /// Record the source type (stamped now) and optionally a thread id.
    Set {
        id: String,
        #[arg(long = "type")]
        source_type: String,
        #[arg(long)]
        thread: Option<String>,
    },

    /// Delete the source info, extracted values and thread id.
    Delete { id: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
        }
        Commands::Process { file, file_type } => {
            process::run_process(&cfg, &file, file_type.as_deref()).await?;
        }
        Commands::History { limit } => {
            history::run_history(&cfg, limit).await?;
        }
        Commands::TaskResult { task_id } => {
            history::run_result(&cfg, &task_id).await?;
        }
        Commands::Source { action } => match action {
            SourceAction::Show { id } => sources::run_show(&cfg, &id).await?,
            SourceAction::Set {
                id,
                source_type,
                thread,
            } => sources::run_set(&cfg, &id, &source_type, thread.as_deref()).await?,
            SourceAction::Delete { id } => sources::run_delete(&cfg, &id).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
