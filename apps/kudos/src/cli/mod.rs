//! # Kudos CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create the database and seed reaction types
//! - `type add|list` - Manage the reaction type catalog
//! - `register reactant|reacter` - Obtain an identity for a host entity
//! - `react` / `unreact` - Add or remove a reaction
//! - `show` - Counters and summary of one reactant
//! - `recount` - Rebuild cached counters and summaries
//! - `verify` - Audit cached rows against the reaction facts
//! - `status` - Table sizes

mod commands;

use crate::config::{Backend, DATABASE_ENV, KudosConfig};
use clap::{Parser, Subcommand};
use kudos_core::{IdentityKind, KudosError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Kudos - reaction ledger
///
/// Typed, weighted reactions with counters and summaries that never drift
/// from the reactions themselves.
#[derive(Parser, Debug)]
#[command(name = "kudos")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the database (overrides config and KUDOS_DATABASE)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = "kudos.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new database and seed the configured reaction types
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Manage reaction types
    #[command(subcommand)]
    Type(TypeCommand),

    /// Register a host entity
    #[command(subcommand)]
    Register(RegisterCommand),

    /// React to a reactant
    React {
        /// Reacter id
        reacter: u64,
        /// Reactant id
        reactant: u64,
        /// Reaction type name
        reaction_type: String,
    },

    /// Remove a reaction
    Unreact {
        /// Reacter id
        reacter: u64,
        /// Reactant id
        reactant: u64,
        /// Reaction type name
        reaction_type: String,
    },

    /// Show counters and summary of a reactant
    Show {
        /// Reactant id
        reactant: u64,
    },

    /// Rebuild cached counters and summaries from the reactions
    Recount {
        /// Only reactants of this host type (or alias)
        #[arg(short, long)]
        model: Option<String>,

        /// Only counters of this reaction type
        #[arg(short = 't', long = "type")]
        reaction_type: Option<String>,
    },

    /// Compare cached rows with the reactions without writing
    Verify {
        /// Only reactants of this host type (or alias)
        #[arg(short, long)]
        model: Option<String>,

        /// Only counters of this reaction type
        #[arg(short = 't', long = "type")]
        reaction_type: Option<String>,
    },

    /// Show table sizes
    Status,
}

#[derive(Subcommand, Debug)]
pub enum TypeCommand {
    /// Add a reaction type
    Add {
        /// Unique, case-sensitive name
        name: String,
        /// Weight; may be zero or negative
        #[arg(allow_negative_numbers = true)]
        mass: i64,
    },
    /// List reaction types
    List,
}

#[derive(Subcommand, Debug)]
pub enum RegisterCommand {
    /// Register a reactant
    Reactant {
        /// Host entity type tag
        host_type: String,
    },
    /// Register a reacter
    Reacter {
        /// Host entity type tag
        host_type: String,
    },
}

impl Commands {
    /// Whether the command can change the ledger.
    fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Init { .. }
                | Self::Type(TypeCommand::Add { .. })
                | Self::Register(_)
                | Self::React { .. }
                | Self::Unreact { .. }
                | Self::Recount { .. }
        )
    }
}

impl RegisterCommand {
    fn kind(&self) -> IdentityKind {
        match self {
            Self::Reactant { .. } => IdentityKind::Reactant,
            Self::Reacter { .. } => IdentityKind::Reacter,
        }
    }

    fn host_type(&self) -> &str {
        match self {
            Self::Reactant { host_type } | Self::Reacter { host_type } => host_type,
        }
    }
}

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// `verify` found cached rows out of line with the reactions.
    DriftFound,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Load the configuration named by the CLI and apply its overrides.
pub fn resolve_config(cli: &Cli) -> Result<KudosConfig, KudosError> {
    let mut config = KudosConfig::load(&cli.config)?;
    config.apply_overrides(
        cli.database.clone(),
        cli.backend,
        std::env::var(DATABASE_ENV).ok(),
    );
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<CommandStatus, KudosError> {
    let config = resolve_config(&cli)?;
    execute_with(cli.command.unwrap_or(Commands::Status), &config, cli.json_mode)
}

/// Execute one command against an already resolved configuration.
pub fn execute_with(
    command: Commands,
    config: &KudosConfig,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    if let Commands::Init { force } = command {
        return cmd_init(config, force, json_mode);
    }

    match config.backend {
        Backend::Redb => {
            let kudos = open_redb(config)?;
            dispatch(&kudos, config, command, json_mode)
        }
        Backend::File => {
            let kudos = open_file(config)?;
            let mutates = command.mutates();
            let status = dispatch(&kudos, config, command, json_mode)?;
            if mutates {
                save_file(&kudos, &config.database)?;
            }
            Ok(status)
        }
    }
}
