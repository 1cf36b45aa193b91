//! # Configuration
//!
//! `kudos.toml` loading. A missing file means defaults; command-line flags
//! and `KUDOS_DATABASE` override what the file says.
//!
//! ```toml
//! database = "kudos.redb"
//! backend = "redb"            # or "file"
//! recount_batch_size = 500
//!
//! [host_types]
//! article = "blog::Article"
//!
//! [[reaction_types]]
//! name = "Like"
//! mass = 1
//! ```

use clap::ValueEnum;
use kudos_core::primitives::{DEFAULT_RECOUNT_BATCH_SIZE, MAX_RECOUNT_BATCH_SIZE};
use kudos_core::{HostTypeMap, KudosError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the database path.
pub const DATABASE_ENV: &str = "KUDOS_DATABASE";

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb ACID database
    #[default]
    Redb,
    /// In-memory ledger persisted as a snapshot file
    File,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::File => f.write_str("file"),
        }
    }
}

/// A reaction type created by `kudos init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTypeSeed {
    pub name: String,
    pub mass: i64,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KudosConfig {
    pub database: PathBuf,
    pub backend: Backend,
    pub recount_batch_size: usize,
    pub host_types: HostTypeMap,
    pub reaction_types: Vec<ReactionTypeSeed>,
}

impl Default for KudosConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("kudos.redb"),
            backend: Backend::Redb,
            recount_batch_size: DEFAULT_RECOUNT_BATCH_SIZE,
            host_types: HostTypeMap::new(),
            reaction_types: vec![
                ReactionTypeSeed {
                    name: "Like".to_string(),
                    mass: 1,
                },
                ReactionTypeSeed {
                    name: "Dislike".to_string(),
                    mass: -1,
                },
            ],
        }
    }
}

impl KudosConfig {
    /// Load from a TOML file; defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, KudosError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            KudosError::IoError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            KudosError::SerializationError(msg) => KudosError::SerializationError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, KudosError> {
        let config: Self =
            toml::from_str(text).map_err(|e| KudosError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), KudosError> {
        if !(1..=MAX_RECOUNT_BATCH_SIZE).contains(&self.recount_batch_size) {
            return Err(KudosError::SerializationError(format!(
                "recount_batch_size must be between 1 and {}, got {}",
                MAX_RECOUNT_BATCH_SIZE, self.recount_batch_size
            )));
        }
        Ok(())
    }

    /// Apply command-line and environment overrides.
    ///
    /// Precedence for the database path: flag, then `env_database`, then file.
    pub fn apply_overrides(
        &mut self,
        database: Option<PathBuf>,
        backend: Option<Backend>,
        env_database: Option<String>,
    ) {
        if let Some(path) = database.or_else(|| env_database.map(PathBuf::from)) {
            self.database = path;
        }
        if let Some(backend) = backend {
            self.backend = backend;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
