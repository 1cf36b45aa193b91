//! # kudos-core
//!
//! The reaction ledger engine for kudos.
//!
//! Host entities obtain a reactant or reacter identity, react to each other
//! with named, weighted reaction types, and read back per-type counts and
//! per-reactant totals. The individual reactions are the source of truth;
//! counters and summaries are sparse caches kept in step inside the same
//! unit of work and rebuildable at any time by a recount.
//!
//! ## Layers
//!
//! - `registry`, `store`: the catalog of types and the reaction facts
//! - `counter`, `summary`: the cached aggregates
//! - `facade`: the [`Kudos`] engine and its reacter/reactant views
//! - `recount`, `verify`: bulk rebuild and read-only drift audit
//! - `storage`: the transactional port and its memory and redb adapters
//!
//! ## Constraints
//!
//! - Synchronous, no network, no async runtime
//! - Every mutation runs inside one storage transaction; a failed operation
//!   leaves no partial aggregate change behind

// =============================================================================
// MODULES
// =============================================================================

pub mod counter;
pub mod facade;
pub mod formats;
pub mod host;
pub mod primitives;
pub mod recount;
pub mod registry;
pub mod storage;
pub mod store;
pub mod summary;
pub mod types;
pub mod verify;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    HostType, IdentityKind, KudosError, Reactant, ReactantId, Reacter, ReacterId, Reaction,
    ReactionCounter, ReactionId, ReactionKey, ReactionSummary, ReactionType, ReactionTypeId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use counter::{CounterAggregator, CounterRebuild};
pub use facade::{Kudos, ReactOutcome, ReactantFacade, ReacterFacade, UnreactOutcome};
pub use host::HostTypeMap;
pub use recount::{RecountReport, RecountScope, Recounter};
pub use registry::Registry;
pub use store::{AddOutcome, ReactantTally, ReactionStore, RemoveOutcome};
pub use summary::{SummaryAggregator, SummaryRebuild};
pub use verify::{Auditor, Drift, DriftReport};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{
    LedgerTables, MemoryLedger, ReadTables, RedbLedger, Storage, TableSizes, WriteTables,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{SnapshotHeader, ledger_from_bytes, ledger_to_bytes};
