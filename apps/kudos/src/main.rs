//! # Kudos - Reaction Ledger CLI
//!
//! ## Usage
//!
//! ```bash
//! kudos init
//! kudos register reacter User          # prints 1
//! kudos register reactant Article      # prints 1
//! kudos react 1 1 Like
//! kudos show 1
//! kudos recount --model Article --type Like
//! kudos verify
//! ```
//!
//! Exit status is 1 on any error and when `verify` finds drift.

use clap::Parser;
use kudos::cli::{self, CommandStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // KUDOS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KUDOS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "kudos=debug,kudos_core=debug"
    } else if cli.quiet {
        "kudos=warn,kudos_core=warn"
    } else {
        "kudos=info,kudos_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // logs go to stderr so command output on stdout stays parseable
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

    match cli::execute(cli) {
        Ok(CommandStatus::Success) => {}
        Ok(CommandStatus::DriftFound) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
