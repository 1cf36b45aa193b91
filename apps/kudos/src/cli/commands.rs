//! # CLI Command Implementations
//!
//! Every command except `init` runs against an opened [`Kudos`] engine and
//! is generic over the storage backend.

use super::{CommandStatus, Commands, RegisterCommand, TypeCommand};
use crate::config::{Backend, KudosConfig};
use kudos_core::formats::MAX_SNAPSHOT_PAYLOAD_SIZE;
use kudos_core::{
    IdentityKind, Kudos, KudosError, MemoryLedger, ReactOutcome, ReactantId, ReacterId,
    ReadTables, RecountScope, RedbLedger, Registry, Storage, UnreactOutcome, ledger_from_bytes,
    ledger_to_bytes,
};
use serde::Serialize;
use std::path::Path;

// =============================================================================
// BACKENDS
// =============================================================================

/// Open the redb database, creating it if needed.
pub fn open_redb(config: &KudosConfig) -> Result<Kudos<RedbLedger>, KudosError> {
    let ledger = RedbLedger::open(&config.database)?;
    Ok(engine(ledger, config))
}

/// Load the snapshot file, or start empty when it does not exist yet.
pub fn open_file(config: &KudosConfig) -> Result<Kudos<MemoryLedger>, KudosError> {
    let path = &config.database;
    let ledger = if path.exists() {
        let size = std::fs::metadata(path)
            .map_err(|e| KudosError::IoError(format!("Cannot read file metadata: {}", e)))?
            .len();
        if size > MAX_SNAPSHOT_PAYLOAD_SIZE as u64 {
            return Err(KudosError::SerializationError(format!(
                "File size {} bytes exceeds maximum allowed {} bytes",
                size, MAX_SNAPSHOT_PAYLOAD_SIZE
            )));
        }
        let data = std::fs::read(path)
            .map_err(|e| KudosError::IoError(format!("Read db: {}", e)))?;
        ledger_from_bytes(&data)?
    } else {
        MemoryLedger::new()
    };
    Ok(engine(ledger, config))
}

/// Write the in-memory ledger back to its snapshot file.
pub fn save_file(kudos: &Kudos<MemoryLedger>, path: &Path) -> Result<(), KudosError> {
    let data = ledger_to_bytes(kudos.storage())?;
    std::fs::write(path, &data).map_err(|e| KudosError::IoError(format!("Write db: {}", e)))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "snapshot written");
    Ok(())
}

fn engine<S: Storage>(ledger: S, config: &KudosConfig) -> Kudos<S> {
    Kudos::new(ledger)
        .with_host_types(config.host_types.clone())
        .with_recount_batch_size(config.recount_batch_size)
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Run a non-`init` command.
pub fn dispatch<S: Storage>(
    kudos: &Kudos<S>,
    config: &KudosConfig,
    command: Commands,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    match command {
        Commands::Init { .. } => Err(KudosError::IoError(
            "init must run before a database is opened".to_string(),
        )),
        Commands::Type(TypeCommand::Add { name, mass }) => {
            cmd_type_add(kudos, &name, mass, json_mode)
        }
        Commands::Type(TypeCommand::List) => cmd_type_list(kudos, json_mode),
        Commands::Register(register) => cmd_register(kudos, &register, json_mode),
        Commands::React {
            reacter,
            reactant,
            reaction_type,
        } => cmd_react(kudos, reacter, reactant, &reaction_type, json_mode),
        Commands::Unreact {
            reacter,
            reactant,
            reaction_type,
        } => cmd_unreact(kudos, reacter, reactant, &reaction_type, json_mode),
        Commands::Show { reactant } => cmd_show(kudos, reactant, json_mode),
        Commands::Recount {
            model,
            reaction_type,
        } => cmd_recount(kudos, scope(model, reaction_type), json_mode),
        Commands::Verify {
            model,
            reaction_type,
        } => cmd_verify(kudos, scope(model, reaction_type), json_mode),
        Commands::Status => cmd_status(kudos, config, json_mode),
    }
}

fn scope(model: Option<String>, reaction_type: Option<String>) -> RecountScope {
    RecountScope {
        host_type: model,
        reaction_type,
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a fresh database and seed the configured reaction types.
///
/// Seeds whose name already exists are skipped, so `init --force` on a
/// file that could not be removed is still safe.
pub fn cmd_init(
    config: &KudosConfig,
    force: bool,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(KudosError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| KudosError::IoError(format!("Remove db: {}", e)))?;
    }

    let seeded = match config.backend {
        Backend::Redb => seed(&open_redb(config)?, config)?,
        Backend::File => {
            let kudos = open_file(config)?;
            let seeded = seed(&kudos, config)?;
            save_file(&kudos, path)?;
            seeded
        }
    };

    if json_mode {
        print_json(&serde_json::json!({
            "database": path.to_string_lossy(),
            "backend": config.backend,
            "reaction_types": seeded,
        }));
    } else {
        println!(
            "Initialized new {} database at {:?} ({} reaction types)",
            config.backend, path, seeded
        );
    }
    Ok(CommandStatus::Success)
}

fn seed<S: Storage>(kudos: &Kudos<S>, config: &KudosConfig) -> Result<usize, KudosError> {
    let mut created = 0;
    for entry in &config.reaction_types {
        let exists = {
            let read = kudos.storage().read()?;
            read.reaction_type_by_name(&entry.name)?.is_some()
        };
        if exists {
            tracing::debug!(name = %entry.name, "reaction type already present");
            continue;
        }
        kudos.create_reaction_type(&entry.name, entry.mass)?;
        created += 1;
    }
    Ok(created)
}

// =============================================================================
// TYPE COMMANDS
// =============================================================================

pub fn cmd_type_add<S: Storage>(
    kudos: &Kudos<S>,
    name: &str,
    mass: i64,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let reaction_type = kudos.create_reaction_type(name, mass)?;
    if json_mode {
        print_json(&reaction_type);
    } else {
        println!(
            "Created reaction type {} '{}' (mass {})",
            reaction_type.id.0, reaction_type.name, reaction_type.mass
        );
    }
    Ok(CommandStatus::Success)
}

pub fn cmd_type_list<S: Storage>(
    kudos: &Kudos<S>,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let types = kudos.reaction_types()?;
    if json_mode {
        print_json(&types);
        return Ok(CommandStatus::Success);
    }

    println!("{:>4}  {:<20} {:>6}", "ID", "NAME", "MASS");
    for reaction_type in &types {
        println!(
            "{:>4}  {:<20} {:>6}",
            reaction_type.id.0, reaction_type.name, reaction_type.mass
        );
    }
    Ok(CommandStatus::Success)
}

// =============================================================================
// REGISTER COMMAND
// =============================================================================

pub fn cmd_register<S: Storage>(
    kudos: &Kudos<S>,
    register: &RegisterCommand,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let kind = register.kind();
    let host_type = register.host_type();
    let id = match kind {
        IdentityKind::Reactant => kudos.register_reactant(host_type)?.0,
        IdentityKind::Reacter => kudos.register_reacter(host_type)?.0,
    };

    if json_mode {
        print_json(&serde_json::json!({
            "kind": kind.to_string(),
            "id": id,
            "host_type": host_type,
        }));
    } else {
        println!("{}", id);
    }
    Ok(CommandStatus::Success)
}

// =============================================================================
// REACT / UNREACT COMMANDS
// =============================================================================

pub fn cmd_react<S: Storage>(
    kudos: &Kudos<S>,
    reacter: u64,
    reactant: u64,
    reaction_type: &str,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let outcome = kudos
        .reacter(Some(ReacterId(reacter)))
        .react_to(Some(ReactantId(reactant)), reaction_type)?;
    let label = match outcome {
        ReactOutcome::Reacted(_) => "reacted",
        ReactOutcome::AlreadyReacted(_) => "already_reacted",
        ReactOutcome::Skipped => "skipped",
    };
    report_reaction(kudos, reactant, label, json_mode)
}

pub fn cmd_unreact<S: Storage>(
    kudos: &Kudos<S>,
    reacter: u64,
    reactant: u64,
    reaction_type: &str,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let outcome = kudos
        .reacter(Some(ReacterId(reacter)))
        .unreact_to(Some(ReactantId(reactant)), reaction_type)?;
    let label = match outcome {
        UnreactOutcome::Unreacted(_) => "unreacted",
        UnreactOutcome::NotReacted => "not_reacted",
        UnreactOutcome::Skipped => "skipped",
    };
    report_reaction(kudos, reactant, label, json_mode)
}

fn report_reaction<S: Storage>(
    kudos: &Kudos<S>,
    reactant: u64,
    outcome: &str,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let view = kudos.reactant(Some(ReactantId(reactant)));
    let total_count = view.total_count()?;
    let total_weight = view.total_weight()?;

    if json_mode {
        print_json(&serde_json::json!({
            "outcome": outcome,
            "reactant": reactant,
            "total_count": total_count,
            "total_weight": total_weight,
        }));
    } else {
        println!(
            "{} (reactant {}: count {}, weight {})",
            outcome.replace('_', " "),
            reactant,
            total_count,
            total_weight
        );
    }
    Ok(CommandStatus::Success)
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Counters and summary of one registered reactant.
pub fn cmd_show<S: Storage>(
    kudos: &Kudos<S>,
    reactant: u64,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let id = ReactantId(reactant);
    let (host_type, counters) = {
        let read = kudos.storage().read()?;
        let row = read
            .reactant(id)?
            .ok_or(KudosError::MissingIdentity(IdentityKind::Reactant))?;
        let mut counters = Vec::new();
        for counter in read.counters_of(id)? {
            let (name, mass) = match read.reaction_type(counter.reaction_type)? {
                Some(t) => {
                    let mass = Registry::weight_of(&t);
                    (t.name, mass)
                }
                None => (format!("#{}", counter.reaction_type.0), 0),
            };
            counters.push((name, mass, counter.count));
        }
        (row.host_type, counters)
    };
    let view = kudos.reactant(Some(id));
    let total_count = view.total_count()?;
    let total_weight = view.total_weight()?;

    if json_mode {
        let counters: Vec<_> = counters
            .iter()
            .map(|(name, mass, count)| {
                serde_json::json!({ "reaction_type": name, "mass": mass, "count": count })
            })
            .collect();
        print_json(&serde_json::json!({
            "reactant": reactant,
            "host_type": host_type,
            "counters": counters,
            "total_count": total_count,
            "total_weight": total_weight,
        }));
        return Ok(CommandStatus::Success);
    }

    println!("Reactant {} ({})", reactant, host_type);
    println!("==================");
    for (name, mass, count) in &counters {
        println!("  {:<20} {:>8}  (mass {})", name, count, mass);
    }
    println!();
    println!("Total count:  {}", total_count);
    println!("Total weight: {}", total_weight);
    Ok(CommandStatus::Success)
}

// =============================================================================
// RECOUNT / VERIFY COMMANDS
// =============================================================================

pub fn cmd_recount<S: Storage>(
    kudos: &Kudos<S>,
    scope: RecountScope,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let report = kudos.recount(&scope)?;
    if json_mode {
        print_json(&report);
    } else {
        println!(
            "Recounted {} reactants in {} batches",
            report.reactants, report.batches
        );
        println!(
            "  counters:  {} deleted, {} written",
            report.counters_deleted, report.counters_written
        );
        println!(
            "  summaries: {} deleted, {} written",
            report.summaries_deleted, report.summaries_written
        );
    }
    Ok(CommandStatus::Success)
}

/// Audit cached rows; ends with `DriftFound` when any row is off.
pub fn cmd_verify<S: Storage>(
    kudos: &Kudos<S>,
    scope: RecountScope,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let report = kudos.verify(&scope)?;
    if json_mode {
        print_json(&report);
    } else if report.is_clean() {
        println!("OK: {} reactants checked, no drift", report.reactants_checked);
    } else {
        println!(
            "DRIFT: {} rows differ across {} reactants checked",
            report.drift.len(),
            report.reactants_checked
        );
        for drift in &report.drift {
            println!("  {:?}", drift);
        }
        println!("Run `kudos recount` to rebuild them.");
    }

    Ok(if report.is_clean() {
        CommandStatus::Success
    } else {
        CommandStatus::DriftFound
    })
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status<S: Storage>(
    kudos: &Kudos<S>,
    config: &KudosConfig,
    json_mode: bool,
) -> Result<CommandStatus, KudosError> {
    let sizes = kudos.table_sizes()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend,
            "tables": sizes,
        }));
        return Ok(CommandStatus::Success);
    }

    println!("Kudos Ledger Status");
    println!("===================");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend);
    println!();
    println!("Reaction types: {}", sizes.reaction_types);
    println!("Reactants:      {}", sizes.reactants);
    println!("Reacters:       {}", sizes.reacters);
    println!("Reactions:      {}", sizes.reactions);
    println!("Counters:       {}", sizes.counters);
    println!("Summaries:      {}", sizes.summaries);
    Ok(CommandStatus::Success)
}
