//! # Intake - AI Use-Case Submission Wizard
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   apps/intake (THE BINARY)                │
//! │                                                           │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────────┐   │
//! │  │    CLI      │   │  HTTP API   │   │    Clients     │   │
//! │  │   (clap)    │   │   (axum)    │   │   (reqwest)    │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬────────┘   │
//! │         └─────────────────┼──────────────────┘            │
//! │                           ▼                               │
//! │                   ┌───────────────┐                       │
//! │                   │  intake-core  │                       │
//! │                   │  (THE RULES)  │                       │
//! │                   └───────────────┘                       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! intake server --host 0.0.0.0 --port 8080
//! intake check -f form.json --step plan
//! intake preview -f form.json --policy warn
//! intake people "ann"
//! ```

use clap::Parser;
use intake::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // INTAKE_LOG_FORMAT=json switches to machine-readable logs.
    let log_format = std::env::var("INTAKE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "intake=info,intake_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ╻┏┓╻╺┳╸┏━┓╻┏ ┏━╸
  ┃┃┗┫ ┃ ┣━┫┣┻┓┣╸
  ╹╹ ╹ ╹ ╹ ╹╹ ╹┗━╸

  AI Use-Case Intake v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
