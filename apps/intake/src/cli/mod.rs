//! # Intake CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `reference` - Show (or refresh) the cached reference data
//! - `check` - Run the step gate for a form file
//! - `timeline` - Check one phase date edit
//! - `preview` - Assemble the create request without sending it
//! - `submit` - Assemble and send the create request
//! - `people` - Search the user directory
//! - `suggest` - Ask the backend for AI suggestions
//! - `report` - Sync metric edits of an existing use case
//! - `edit` - Push plan and stakeholder edits of an existing use case

mod commands;

use crate::config::IntakeConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use intake_core::{UnresolvedPolicy, WizardStep};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Intake - AI use-case submission wizard
///
/// Validates use-case forms step by step and submits them to the backend.
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML configuration file
    #[arg(short = 'c', long, global = true, default_value = "intake.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show the cached reference data
    Reference {
        /// Drop the cached entry and fetch again
        #[arg(short, long)]
        refresh: bool,
    },

    /// Run the step gate for a form file
    Check {
        /// Form file (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Step to leave (info, checklist, plan, metrics)
        #[arg(short, long, default_value = "info")]
        step: WizardStep,
    },

    /// Check one phase date edit against a form's timeline
    Timeline {
        #[arg(short, long)]
        file: PathBuf,

        /// Phase name
        #[arg(short, long)]
        phase: String,

        /// Start date (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long)]
        end: Option<String>,
    },

    /// Assemble the create request and print it
    Preview {
        #[arg(short, long)]
        file: PathBuf,

        /// Unresolved-record policy (reject, warn)
        #[arg(long)]
        policy: Option<UnresolvedPolicy>,
    },

    /// Assemble and send the create request
    Submit {
        #[arg(short, long)]
        file: PathBuf,

        /// Unresolved-record policy (reject, warn)
        #[arg(long)]
        policy: Option<UnresolvedPolicy>,
    },

    /// Search the user directory
    People {
        /// Name or email prefix
        term: String,

        /// Email of an already selected person (skips the search)
        #[arg(long)]
        selected: Option<String>,
    },

    /// Ask for AI suggestions based on a form's draft
    Suggest {
        #[arg(short, long)]
        file: PathBuf,

        /// Suggestion kind (usecase, metric, phase)
        #[arg(short = 't', long, default_value = "usecase")]
        kind: String,
    },

    /// Sync metric and reported-value edits of an existing use case
    Report {
        /// Use case id
        #[arg(short, long)]
        use_case: u64,

        /// Metrics as loaded (JSON array)
        #[arg(long)]
        before: PathBuf,

        /// Metrics as edited (JSON array)
        #[arg(long)]
        after: PathBuf,

        /// Persisted reported values (JSON array)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the change set without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Push plan and stakeholders of a form to an existing use case
    Edit {
        #[arg(short, long)]
        use_case: u64,

        #[arg(short, long)]
        file: PathBuf,

        /// Form as loaded before editing; only differences are pushed
        #[arg(long)]
        before: Option<PathBuf>,

        /// Meaningful update to post alongside the edit
        #[arg(short, long)]
        note: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = IntakeConfig::load(&cli.config)?;
    let json_mode = cli.json_mode;
    if cli.verbose {
        tracing::info!(backend = %config.backend_url, cache = ?config.cache_path, "Configuration loaded");
    }

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&config, &host, port).await,
        Some(Commands::Reference { refresh }) => cmd_reference(&config, json_mode, refresh).await,
        Some(Commands::Check { file, step }) => cmd_check(&config, json_mode, &file, step).await,
        Some(Commands::Timeline {
            file,
            phase,
            start,
            end,
        }) => {
            cmd_timeline(
                &config,
                json_mode,
                &file,
                &phase,
                start.as_deref(),
                end.as_deref(),
            )
            .await
        }
        Some(Commands::Preview { file, policy }) => {
            cmd_preview(&config, json_mode, &file, policy).await
        }
        Some(Commands::Submit { file, policy }) => {
            cmd_submit(&config, json_mode, &file, policy).await
        }
        Some(Commands::People { term, selected }) => {
            cmd_people(&config, json_mode, &term, selected.as_deref()).await
        }
        Some(Commands::Suggest { file, kind }) => {
            cmd_suggest(&config, json_mode, &file, &kind).await
        }
        Some(Commands::Report {
            use_case,
            before,
            after,
            history,
            dry_run,
        }) => {
            cmd_report(
                &config,
                json_mode,
                use_case,
                &before,
                &after,
                history.as_deref(),
                dry_run,
            )
            .await
        }
        Some(Commands::Edit {
            use_case,
            file,
            before,
            note,
        }) => {
            cmd_edit(
                &config,
                json_mode,
                use_case,
                &file,
                before.as_deref(),
                note.as_deref(),
            )
            .await
        }
        None => cmd_reference(&config, json_mode, false).await,
    }
}
