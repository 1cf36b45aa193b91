//! # Storage Port
//!
//! The abstract tables the engine runs against, and the two adapters that
//! implement them.
//!
//! ## Transactions
//!
//! Every read happens inside a [`ReadTables`] view obtained from
//! [`Storage::read`], and every mutation inside a [`WriteTables`] unit of
//! work obtained from [`Storage::write`]. A write that is dropped without
//! [`WriteTables::commit`] is rolled back, so a failed react, unreact or
//! recount batch never leaves partial state behind.
//!
//! Writers are serialized: the contract on [`Storage::write`] requires one
//! open unit of work at a time, and both adapters meet it (the memory ledger
//! holds its `RwLock` write guard, redb allows one write transaction).
//! Counter and summary updates performed inside a write transaction are
//! therefore atomic increments with respect to every other writer.
//!
//! ## Adapters
//!
//! - [`MemoryLedger`]: `BTreeMap` tables behind an `RwLock`, undo-log rollback
//! - [`RedbLedger`]: redb ACID tables on disk

mod memory;
mod redb_ledger;

pub use memory::{LedgerTables, MemoryLedger, MemoryRead, MemoryWrite};
pub use redb_ledger::{RedbLedger, RedbRead, RedbWrite};

use crate::{
    HostType, KudosError, Reactant, ReactantId, Reacter, ReacterId, Reaction, ReactionCounter,
    ReactionKey, ReactionSummary, ReactionType, ReactionTypeId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// TABLE SIZES
// =============================================================================

/// Row counts of every table, for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSizes {
    pub reaction_types: u64,
    pub reactants: u64,
    pub reacters: u64,
    pub reactions: u64,
    pub counters: u64,
    pub summaries: u64,
}

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Read operations available on a consistent view of the tables.
pub trait ReadTables {
    /// Lookup a reaction type by id.
    fn reaction_type(&self, id: ReactionTypeId) -> Result<Option<ReactionType>, KudosError>;

    /// Lookup a reaction type by its exact (case-sensitive) name.
    fn reaction_type_by_name(&self, name: &str) -> Result<Option<ReactionType>, KudosError>;

    /// All reaction types ordered by id.
    fn reaction_types(&self) -> Result<Vec<ReactionType>, KudosError>;

    /// Lookup a reactant by id.
    fn reactant(&self, id: ReactantId) -> Result<Option<Reactant>, KudosError>;

    /// Lookup a reacter by id.
    fn reacter(&self, id: ReacterId) -> Result<Option<Reacter>, KudosError>;

    /// Page through reactants in id order, starting strictly after `after`,
    /// optionally restricted to one host type. Returns at most `limit` rows.
    fn reactants_after(
        &self,
        after: Option<ReactantId>,
        host_type: Option<&HostType>,
        limit: usize,
    ) -> Result<Vec<Reactant>, KudosError>;

    /// Every host type tag that has registered at least one reactant.
    fn host_types(&self) -> Result<Vec<HostType>, KudosError>;

    /// Lookup a reaction by its uniqueness key.
    fn reaction(&self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError>;

    /// All reactions received by a reactant, in key order.
    fn reactions_of_reactant(&self, reactant: ReactantId) -> Result<Vec<Reaction>, KudosError>;

    /// All reactions a reacter holds against one reactant (any type).
    fn reactions_between(
        &self,
        reacter: ReacterId,
        reactant: ReactantId,
    ) -> Result<Vec<Reaction>, KudosError>;

    /// All reactions issued by a reacter, ordered by reactant.
    fn reactions_by_reacter(&self, reacter: ReacterId) -> Result<Vec<Reaction>, KudosError>;

    /// Lookup the counter row of a (reactant, type) pair.
    fn counter(
        &self,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<Option<ReactionCounter>, KudosError>;

    /// All counter rows of a reactant, ordered by type id.
    fn counters_of(&self, reactant: ReactantId) -> Result<Vec<ReactionCounter>, KudosError>;

    /// Lookup the summary row of a reactant.
    fn summary(&self, reactant: ReactantId) -> Result<Option<ReactionSummary>, KudosError>;

    /// Row counts of every table.
    fn table_sizes(&self) -> Result<TableSizes, KudosError>;
}

/// Mutations available inside a unit of work.
///
/// Implementations roll back every mutation of the unit of work when it is
/// dropped without calling [`WriteTables::commit`].
pub trait WriteTables: ReadTables {
    /// Insert a new reaction type, assigning the next id.
    ///
    /// The caller checks name uniqueness first.
    fn insert_reaction_type(&mut self, name: &str, mass: i64)
    -> Result<ReactionType, KudosError>;

    /// Insert a new reactant, assigning the next id and recording its host type.
    fn insert_reactant(&mut self, host_type: &HostType) -> Result<Reactant, KudosError>;

    /// Insert a new reacter, assigning the next id.
    fn insert_reacter(&mut self, host_type: &HostType) -> Result<Reacter, KudosError>;

    /// Insert a reaction for a key that does not exist yet.
    fn insert_reaction(&mut self, key: ReactionKey) -> Result<Reaction, KudosError>;

    /// Delete a reaction, returning the removed row if there was one.
    fn delete_reaction(&mut self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError>;

    /// Insert or overwrite a counter row.
    fn put_counter(&mut self, counter: ReactionCounter) -> Result<(), KudosError>;

    /// Delete a counter row. Returns whether a row existed.
    fn delete_counter(
        &mut self,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<bool, KudosError>;

    /// Insert or overwrite a summary row.
    fn put_summary(&mut self, summary: ReactionSummary) -> Result<(), KudosError>;

    /// Delete a summary row. Returns whether a row existed.
    fn delete_summary(&mut self, reactant: ReactantId) -> Result<bool, KudosError>;

    /// Make every mutation of this unit of work durable and visible.
    fn commit(self) -> Result<(), KudosError>;
}

/// A transactional backend for the reaction ledger.
pub trait Storage {
    /// Read-only view type.
    type Read<'a>: ReadTables
    where
        Self: 'a;

    /// Unit-of-work type.
    type Write<'a>: WriteTables
    where
        Self: 'a;

    /// Open a consistent read view.
    fn read(&self) -> Result<Self::Read<'_>, KudosError>;

    /// Open a unit of work.
    ///
    /// # Contract
    ///
    /// Units of work are serialized: while one returned value is alive, every
    /// other call to `write` on the same storage, from any thread, blocks
    /// until it is committed or dropped. Counter and summary updates read a
    /// row and write it back inside one unit of work, so an adapter that lets
    /// two writers overlap loses increments. Readers opened with
    /// [`Storage::read`] are not blocked and see either the state before or
    /// the state after a commit.
    fn write(&self) -> Result<Self::Write<'_>, KudosError>;
}

/// Map any backend error into `KudosError::StorageError`.
pub(crate) fn storage_err<E: std::fmt::Display>(e: E) -> KudosError {
    KudosError::StorageError(e.to_string())
}
