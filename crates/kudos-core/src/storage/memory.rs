//! # In-memory Ledger
//!
//! `BTreeMap` tables behind a single `RwLock`.
//!
//! - Readers share the lock and see a quiescent state.
//! - A unit of work holds the write lock for its whole lifetime, so writers
//!   are serialized the same way redb serializes write transactions.
//! - Each mutation pushes an undo record; dropping an uncommitted unit of
//!   work replays the undo log in reverse.

use super::{ReadTables, Storage, TableSizes, WriteTables};
use crate::{
    HostType, KudosError, Reactant, ReactantId, Reacter, ReacterId, Reaction, ReactionCounter,
    ReactionId, ReactionKey, ReactionSummary, ReactionType, ReactionTypeId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// TABLES
// =============================================================================

/// Next identifiers to hand out. Identifiers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct NextIds {
    reaction_type: u64,
    reactant: u64,
    reacter: u64,
    reaction: u64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            reaction_type: 1,
            reactant: 1,
            reacter: 1,
            reaction: 1,
        }
    }
}

/// The complete ledger state. Also the payload of the file snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTables {
    reaction_types: BTreeMap<ReactionTypeId, ReactionType>,
    type_names: BTreeMap<String, ReactionTypeId>,
    reactants: BTreeMap<ReactantId, Reactant>,
    reacters: BTreeMap<ReacterId, Reacter>,
    /// Host type -> number of reactants registered under it.
    host_types: BTreeMap<HostType, u64>,
    reactions: BTreeMap<ReactionKey, Reaction>,
    /// Reverse index: (reacter, reactant, type).
    reacter_index: BTreeSet<(ReacterId, ReactantId, ReactionTypeId)>,
    counters: BTreeMap<(ReactantId, ReactionTypeId), u64>,
    summaries: BTreeMap<ReactantId, (u64, i64)>,
    next_ids: NextIds,
}

impl LedgerTables {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reaction_range(reactant: ReactantId) -> (ReactionKey, ReactionKey) {
        (
            ReactionKey::new(ReacterId(0), reactant, ReactionTypeId(0)),
            ReactionKey::new(ReacterId(u64::MAX), reactant, ReactionTypeId(u64::MAX)),
        )
    }

    fn index_reaction(&mut self, reaction: &Reaction) {
        let key = reaction.key;
        self.reacter_index
            .insert((key.reacter, key.reactant, key.reaction_type));
        self.reactions.insert(key, reaction.clone());
    }

    fn unindex_reaction(&mut self, key: &ReactionKey) -> Option<Reaction> {
        self.reacter_index
            .remove(&(key.reacter, key.reactant, key.reaction_type));
        self.reactions.remove(key)
    }
}

impl ReadTables for LedgerTables {
    fn reaction_type(&self, id: ReactionTypeId) -> Result<Option<ReactionType>, KudosError> {
        Ok(self.reaction_types.get(&id).cloned())
    }

    fn reaction_type_by_name(&self, name: &str) -> Result<Option<ReactionType>, KudosError> {
        Ok(self
            .type_names
            .get(name)
            .and_then(|id| self.reaction_types.get(id))
            .cloned())
    }

    fn reaction_types(&self) -> Result<Vec<ReactionType>, KudosError> {
        Ok(self.reaction_types.values().cloned().collect())
    }

    fn reactant(&self, id: ReactantId) -> Result<Option<Reactant>, KudosError> {
        Ok(self.reactants.get(&id).cloned())
    }

    fn reacter(&self, id: ReacterId) -> Result<Option<Reacter>, KudosError> {
        Ok(self.reacters.get(&id).cloned())
    }

    fn reactants_after(
        &self,
        after: Option<ReactantId>,
        host_type: Option<&HostType>,
        limit: usize,
    ) -> Result<Vec<Reactant>, KudosError> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .reactants
            .range((lower, Bound::Unbounded))
            .map(|(_, reactant)| reactant)
            .filter(|reactant| host_type.is_none_or(|tag| &reactant.host_type == tag))
            .take(limit)
            .cloned()
            .collect())
    }

    fn host_types(&self) -> Result<Vec<HostType>, KudosError> {
        Ok(self.host_types.keys().cloned().collect())
    }

    fn reaction(&self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError> {
        Ok(self.reactions.get(key).cloned())
    }

    fn reactions_of_reactant(&self, reactant: ReactantId) -> Result<Vec<Reaction>, KudosError> {
        let (lo, hi) = Self::reaction_range(reactant);
        Ok(self.reactions.range(lo..=hi).map(|(_, r)| r.clone()).collect())
    }

    fn reactions_between(
        &self,
        reacter: ReacterId,
        reactant: ReactantId,
    ) -> Result<Vec<Reaction>, KudosError> {
        let lo = ReactionKey::new(reacter, reactant, ReactionTypeId(0));
        let hi = ReactionKey::new(reacter, reactant, ReactionTypeId(u64::MAX));
        Ok(self.reactions.range(lo..=hi).map(|(_, r)| r.clone()).collect())
    }

    fn reactions_by_reacter(&self, reacter: ReacterId) -> Result<Vec<Reaction>, KudosError> {
        let lo = (reacter, ReactantId(0), ReactionTypeId(0));
        let hi = (reacter, ReactantId(u64::MAX), ReactionTypeId(u64::MAX));
        Ok(self
            .reacter_index
            .range(lo..=hi)
            .filter_map(|&(reacter, reactant, reaction_type)| {
                self.reactions
                    .get(&ReactionKey::new(reacter, reactant, reaction_type))
                    .cloned()
            })
            .collect())
    }

    fn counter(
        &self,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<Option<ReactionCounter>, KudosError> {
        Ok(self
            .counters
            .get(&(reactant, reaction_type))
            .map(|&count| ReactionCounter {
                reactant,
                reaction_type,
                count,
            }))
    }

    fn counters_of(&self, reactant: ReactantId) -> Result<Vec<ReactionCounter>, KudosError> {
        let lo = (reactant, ReactionTypeId(0));
        let hi = (reactant, ReactionTypeId(u64::MAX));
        Ok(self
            .counters
            .range(lo..=hi)
            .map(|(&(reactant, reaction_type), &count)| ReactionCounter {
                reactant,
                reaction_type,
                count,
            })
            .collect())
    }

    fn summary(&self, reactant: ReactantId) -> Result<Option<ReactionSummary>, KudosError> {
        Ok(self
            .summaries
            .get(&reactant)
            .map(|&(total_count, total_weight)| ReactionSummary {
                reactant,
                total_count,
                total_weight,
            }))
    }

    fn table_sizes(&self) -> Result<TableSizes, KudosError> {
        Ok(TableSizes {
            reaction_types: self.reaction_types.len() as u64,
            reactants: self.reactants.len() as u64,
            reacters: self.reacters.len() as u64,
            reactions: self.reactions.len() as u64,
            counters: self.counters.len() as u64,
            summaries: self.summaries.len() as u64,
        })
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: RwLock<LedgerTables>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger from existing tables (e.g. a decoded snapshot).
    #[must_use]
    pub fn from_tables(tables: LedgerTables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Clone the current committed state.
    pub fn snapshot(&self) -> Result<LedgerTables, KudosError> {
        Ok(self.read()?.tables.clone())
    }
}

impl Storage for MemoryLedger {
    type Read<'a> = MemoryRead<'a>;
    type Write<'a> = MemoryWrite<'a>;

    fn read(&self) -> Result<MemoryRead<'_>, KudosError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| KudosError::StorageError("ledger lock poisoned".to_string()))?;
        Ok(MemoryRead { tables })
    }

    fn write(&self) -> Result<MemoryWrite<'_>, KudosError> {
        let tables = self
            .tables
            .write()
            .map_err(|_| KudosError::StorageError("ledger lock poisoned".to_string()))?;
        let ids_at_start = tables.next_ids;
        Ok(MemoryWrite {
            tables,
            undo: Vec::new(),
            ids_at_start,
            committed: false,
        })
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A shared read view over the in-memory tables.
pub struct MemoryRead<'a> {
    tables: RwLockReadGuard<'a, LedgerTables>,
}

/// Reverse operation of a single mutation.
#[derive(Debug)]
enum Undo {
    ReactionType(ReactionTypeId, String),
    Reactant(ReactantId, HostType),
    Reacter(ReacterId),
    Reaction(ReactionKey, Option<Reaction>),
    Counter((ReactantId, ReactionTypeId), Option<u64>),
    Summary(ReactantId, Option<(u64, i64)>),
}

/// An exclusive unit of work over the in-memory tables.
pub struct MemoryWrite<'a> {
    tables: RwLockWriteGuard<'a, LedgerTables>,
    undo: Vec<Undo>,
    ids_at_start: NextIds,
    committed: bool,
}

impl MemoryWrite<'_> {
    fn rollback(&mut self) {
        let tables = &mut *self.tables;
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::ReactionType(id, name) => {
                    tables.reaction_types.remove(&id);
                    tables.type_names.remove(&name);
                }
                Undo::Reactant(id, host_type) => {
                    tables.reactants.remove(&id);
                    if let Some(count) = tables.host_types.get_mut(&host_type) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            tables.host_types.remove(&host_type);
                        }
                    }
                }
                Undo::Reacter(id) => {
                    tables.reacters.remove(&id);
                }
                Undo::Reaction(key, previous) => {
                    tables.unindex_reaction(&key);
                    if let Some(reaction) = previous {
                        tables.index_reaction(&reaction);
                    }
                }
                Undo::Counter(key, previous) => match previous {
                    Some(count) => {
                        tables.counters.insert(key, count);
                    }
                    None => {
                        tables.counters.remove(&key);
                    }
                },
                Undo::Summary(key, previous) => match previous {
                    Some(totals) => {
                        tables.summaries.insert(key, totals);
                    }
                    None => {
                        tables.summaries.remove(&key);
                    }
                },
            }
        }
        tables.next_ids = self.ids_at_start;
    }
}

impl Drop for MemoryWrite<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

impl WriteTables for MemoryWrite<'_> {
    fn insert_reaction_type(
        &mut self,
        name: &str,
        mass: i64,
    ) -> Result<ReactionType, KudosError> {
        let id = ReactionTypeId(self.tables.next_ids.reaction_type);
        self.tables.next_ids.reaction_type = id.0.saturating_add(1);

        let reaction_type = ReactionType::new(id, name, mass);
        self.tables.reaction_types.insert(id, reaction_type.clone());
        self.tables.type_names.insert(name.to_string(), id);
        self.undo.push(Undo::ReactionType(id, name.to_string()));
        Ok(reaction_type)
    }

    fn insert_reactant(&mut self, host_type: &HostType) -> Result<Reactant, KudosError> {
        let id = ReactantId(self.tables.next_ids.reactant);
        self.tables.next_ids.reactant = id.0.saturating_add(1);

        let reactant = Reactant {
            id,
            host_type: host_type.clone(),
        };
        self.tables.reactants.insert(id, reactant.clone());
        *self.tables.host_types.entry(host_type.clone()).or_insert(0) += 1;
        self.undo.push(Undo::Reactant(id, host_type.clone()));
        Ok(reactant)
    }

    fn insert_reacter(&mut self, host_type: &HostType) -> Result<Reacter, KudosError> {
        let id = ReacterId(self.tables.next_ids.reacter);
        self.tables.next_ids.reacter = id.0.saturating_add(1);

        let reacter = Reacter {
            id,
            host_type: host_type.clone(),
        };
        self.tables.reacters.insert(id, reacter.clone());
        self.undo.push(Undo::Reacter(id));
        Ok(reacter)
    }

    fn insert_reaction(&mut self, key: ReactionKey) -> Result<Reaction, KudosError> {
        let id = ReactionId(self.tables.next_ids.reaction);
        self.tables.next_ids.reaction = id.0.saturating_add(1);

        let reaction = Reaction::new(id, key);
        let previous = self.tables.reactions.get(&key).cloned();
        self.tables.index_reaction(&reaction);
        self.undo.push(Undo::Reaction(key, previous));
        Ok(reaction)
    }

    fn delete_reaction(&mut self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError> {
        let removed = self.tables.unindex_reaction(key);
        if removed.is_some() {
            self.undo.push(Undo::Reaction(*key, removed.clone()));
        }
        Ok(removed)
    }

    fn put_counter(&mut self, counter: ReactionCounter) -> Result<(), KudosError> {
        let key = (counter.reactant, counter.reaction_type);
        let previous = self.tables.counters.insert(key, counter.count);
        self.undo.push(Undo::Counter(key, previous));
        Ok(())
    }

    fn delete_counter(
        &mut self,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<bool, KudosError> {
        let key = (reactant, reaction_type);
        let previous = self.tables.counters.remove(&key);
        let existed = previous.is_some();
        if existed {
            self.undo.push(Undo::Counter(key, previous));
        }
        Ok(existed)
    }

    fn put_summary(&mut self, summary: ReactionSummary) -> Result<(), KudosError> {
        let previous = self.tables.summaries.insert(
            summary.reactant,
            (summary.total_count, summary.total_weight),
        );
        self.undo.push(Undo::Summary(summary.reactant, previous));
        Ok(())
    }

    fn delete_summary(&mut self, reactant: ReactantId) -> Result<bool, KudosError> {
        let previous = self.tables.summaries.remove(&reactant);
        let existed = previous.is_some();
        if existed {
            self.undo.push(Undo::Summary(reactant, previous));
        }
        Ok(existed)
    }

    fn commit(mut self) -> Result<(), KudosError> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }
}

/// Delegate every `ReadTables` method to the guarded `LedgerTables`.
macro_rules! delegate_read_tables {
    ($ty:ty) => {
        impl ReadTables for $ty {
            fn reaction_type(
                &self,
                id: ReactionTypeId,
            ) -> Result<Option<ReactionType>, KudosError> {
                self.tables.reaction_type(id)
            }

            fn reaction_type_by_name(
                &self,
                name: &str,
            ) -> Result<Option<ReactionType>, KudosError> {
                self.tables.reaction_type_by_name(name)
            }

            fn reaction_types(&self) -> Result<Vec<ReactionType>, KudosError> {
                self.tables.reaction_types()
            }

            fn reactant(&self, id: ReactantId) -> Result<Option<Reactant>, KudosError> {
                self.tables.reactant(id)
            }

            fn reacter(&self, id: ReacterId) -> Result<Option<Reacter>, KudosError> {
                self.tables.reacter(id)
            }

            fn reactants_after(
                &self,
                after: Option<ReactantId>,
                host_type: Option<&HostType>,
                limit: usize,
            ) -> Result<Vec<Reactant>, KudosError> {
                self.tables.reactants_after(after, host_type, limit)
            }

            fn host_types(&self) -> Result<Vec<HostType>, KudosError> {
                self.tables.host_types()
            }

            fn reaction(&self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError> {
                self.tables.reaction(key)
            }

            fn reactions_of_reactant(
                &self,
                reactant: ReactantId,
            ) -> Result<Vec<Reaction>, KudosError> {
                self.tables.reactions_of_reactant(reactant)
            }

            fn reactions_between(
                &self,
                reacter: ReacterId,
                reactant: ReactantId,
            ) -> Result<Vec<Reaction>, KudosError> {
                self.tables.reactions_between(reacter, reactant)
            }

            fn reactions_by_reacter(
                &self,
                reacter: ReacterId,
            ) -> Result<Vec<Reaction>, KudosError> {
                self.tables.reactions_by_reacter(reacter)
            }

            fn counter(
                &self,
                reactant: ReactantId,
                reaction_type: ReactionTypeId,
            ) -> Result<Option<ReactionCounter>, KudosError> {
                self.tables.counter(reactant, reaction_type)
            }

            fn counters_of(
                &self,
                reactant: ReactantId,
            ) -> Result<Vec<ReactionCounter>, KudosError> {
                self.tables.counters_of(reactant)
            }

            fn summary(
                &self,
                reactant: ReactantId,
            ) -> Result<Option<ReactionSummary>, KudosError> {
                self.tables.summary(reactant)
            }

            fn table_sizes(&self) -> Result<TableSizes, KudosError> {
                self.tables.table_sizes()
            }
        }
    };
}

delegate_read_tables!(MemoryRead<'_>);
delegate_read_tables!(MemoryWrite<'_>);

// =============================================================================
// TESTS
// =============================================================================
