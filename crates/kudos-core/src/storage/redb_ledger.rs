//! # redb-backed Ledger
//!
//! A disk-backed ledger using the redb embedded database:
//! - ACID write transactions (one writer at a time, readers never block)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC snapshots for readers
//!
//! ## Tables
//!
//! | table            | key                          | value                |
//! |------------------|------------------------------|----------------------|
//! | `metadata`       | counter name                 | next id              |
//! | `reaction_types` | type id                      | postcard row         |
//! | `type_names`     | name                         | type id              |
//! | `reactants`      | reactant id                  | postcard row         |
//! | `reacters`       | reacter id                   | postcard row         |
//! | `host_types`     | host tag                     | reactant count       |
//! | `host_index`     | (host tag, reactant id)      | unit                 |
//! | `reactions`      | (reactant, reacter, type)    | reaction id          |
//! | `reacter_index`  | (reacter, reactant, type)    | reaction id          |
//! | `counters`       | (reactant, type)             | count                |
//! | `summaries`      | reactant id                  | (count, weight)      |

use super::{ReadTables, Storage, TableSizes, WriteTables, storage_err};
use crate::{
    HostType, KudosError, Reactant, ReactantId, Reacter, ReacterId, Reaction, ReactionCounter,
    ReactionId, ReactionKey, ReactionSummary, ReactionType, ReactionTypeId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use std::path::Path;

const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");
const REACTION_TYPES: TableDefinition<u64, &[u8]> = TableDefinition::new("reaction_types");
const TYPE_NAMES: TableDefinition<&str, u64> = TableDefinition::new("type_names");
const REACTANTS: TableDefinition<u64, &[u8]> = TableDefinition::new("reactants");
const REACTERS: TableDefinition<u64, &[u8]> = TableDefinition::new("reacters");
const HOST_TYPES: TableDefinition<&str, u64> = TableDefinition::new("host_types");
const HOST_INDEX: TableDefinition<(&str, u64), ()> = TableDefinition::new("host_index");
const REACTIONS: TableDefinition<(u64, u64, u64), u64> = TableDefinition::new("reactions");
const REACTER_INDEX: TableDefinition<(u64, u64, u64), u64> =
    TableDefinition::new("reacter_index");
const COUNTERS: TableDefinition<(u64, u64), u64> = TableDefinition::new("counters");
const SUMMARIES: TableDefinition<u64, (u64, i64)> = TableDefinition::new("summaries");

const NEXT_REACTION_TYPE_ID: &str = "next_reaction_type_id";
const NEXT_REACTANT_ID: &str = "next_reactant_id";
const NEXT_REACTER_ID: &str = "next_reacter_id";
const NEXT_REACTION_ID: &str = "next_reaction_id";

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, KudosError> {
    postcard::from_bytes(bytes).map_err(|e| KudosError::SerializationError(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, KudosError> {
    postcard::to_allocvec(value).map_err(|e| KudosError::SerializationError(e.to_string()))
}

// =============================================================================
// LEDGER
// =============================================================================

/// Disk-backed storage backend.
pub struct RedbLedger {
    db: Database,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger").finish_non_exhaustive()
    }
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KudosError> {
        let db = Database::create(path.as_ref()).map_err(|e| KudosError::IoError(e.to_string()))?;

        // Create every table so read transactions never see a missing one.
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            let _ = write_txn.open_table(REACTION_TYPES).map_err(storage_err)?;
            let _ = write_txn.open_table(TYPE_NAMES).map_err(storage_err)?;
            let _ = write_txn.open_table(REACTANTS).map_err(storage_err)?;
            let _ = write_txn.open_table(REACTERS).map_err(storage_err)?;
            let _ = write_txn.open_table(HOST_TYPES).map_err(storage_err)?;
            let _ = write_txn.open_table(HOST_INDEX).map_err(storage_err)?;
            let _ = write_txn.open_table(REACTIONS).map_err(storage_err)?;
            let _ = write_txn.open_table(REACTER_INDEX).map_err(storage_err)?;
            let _ = write_txn.open_table(COUNTERS).map_err(storage_err)?;
            let _ = write_txn.open_table(SUMMARIES).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), KudosError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }
}

impl Storage for RedbLedger {
    type Read<'a> = RedbRead;
    type Write<'a> = RedbWrite;

    fn read(&self) -> Result<RedbRead, KudosError> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        Ok(RedbRead { txn })
    }

    fn write(&self) -> Result<RedbWrite, KudosError> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        Ok(RedbWrite { txn })
    }
}

/// A snapshot read transaction.
pub struct RedbRead {
    txn: ReadTransaction,
}

/// A write transaction. Aborted by redb when dropped uncommitted.
pub struct RedbWrite {
    txn: WriteTransaction,
}

// =============================================================================
// READS (shared by both transaction kinds)
// =============================================================================

/// Both `ReadTransaction` and `WriteTransaction` expose `open_table` returning
/// a `ReadableTable`, so the read side is generated once for both.
macro_rules! redb_read_tables {
    ($ty:ty) => {
        impl ReadTables for $ty {
            fn reaction_type(
                &self,
                id: ReactionTypeId,
            ) -> Result<Option<ReactionType>, KudosError> {
                let table = self.txn.open_table(REACTION_TYPES).map_err(storage_err)?;
                table
                    .get(id.0)
                    .map_err(storage_err)?
                    .map(|bytes| decode(bytes.value()))
                    .transpose()
            }

            fn reaction_type_by_name(
                &self,
                name: &str,
            ) -> Result<Option<ReactionType>, KudosError> {
                let id = {
                    let names = self.txn.open_table(TYPE_NAMES).map_err(storage_err)?;
                    names.get(name).map_err(storage_err)?.map(|v| v.value())
                };
                match id {
                    Some(id) => self.reaction_type(ReactionTypeId(id)),
                    None => Ok(None),
                }
            }

            fn reaction_types(&self) -> Result<Vec<ReactionType>, KudosError> {
                let table = self.txn.open_table(REACTION_TYPES).map_err(storage_err)?;
                let mut types = Vec::new();
                for entry in table.iter().map_err(storage_err)? {
                    let (_, bytes) = entry.map_err(storage_err)?;
                    types.push(decode(bytes.value())?);
                }
                Ok(types)
            }

            fn reactant(&self, id: ReactantId) -> Result<Option<Reactant>, KudosError> {
                let table = self.txn.open_table(REACTANTS).map_err(storage_err)?;
                table
                    .get(id.0)
                    .map_err(storage_err)?
                    .map(|bytes| decode(bytes.value()))
                    .transpose()
            }

            fn reacter(&self, id: ReacterId) -> Result<Option<Reacter>, KudosError> {
                let table = self.txn.open_table(REACTERS).map_err(storage_err)?;
                table
                    .get(id.0)
                    .map_err(storage_err)?
                    .map(|bytes| decode(bytes.value()))
                    .transpose()
            }

            fn reactants_after(
                &self,
                after: Option<ReactantId>,
                host_type: Option<&HostType>,
                limit: usize,
            ) -> Result<Vec<Reactant>, KudosError> {
                let start = match after {
                    Some(id) => match id.0.checked_add(1) {
                        Some(next) => next,
                        None => return Ok(Vec::new()),
                    },
                    None => 0,
                };

                let ids: Vec<u64> = match host_type {
                    Some(tag) => {
                        let index = self.txn.open_table(HOST_INDEX).map_err(storage_err)?;
                        let mut ids = Vec::new();
                        for entry in index
                            .range((tag.as_str(), start)..=(tag.as_str(), u64::MAX))
                            .map_err(storage_err)?
                            .take(limit)
                        {
                            let (key, _) = entry.map_err(storage_err)?;
                            ids.push(key.value().1);
                        }
                        ids
                    }
                    None => {
                        let table = self.txn.open_table(REACTANTS).map_err(storage_err)?;
                        let mut ids = Vec::new();
                        for entry in table.range(start..).map_err(storage_err)?.take(limit) {
                            let (key, _) = entry.map_err(storage_err)?;
                            ids.push(key.value());
                        }
                        ids
                    }
                };

                let mut reactants = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(reactant) = self.reactant(ReactantId(id))? {
                        reactants.push(reactant);
                    }
                }
                Ok(reactants)
            }

            fn host_types(&self) -> Result<Vec<HostType>, KudosError> {
                let table = self.txn.open_table(HOST_TYPES).map_err(storage_err)?;
                let mut tags = Vec::new();
                for entry in table.iter().map_err(storage_err)? {
                    let (key, _) = entry.map_err(storage_err)?;
                    tags.push(HostType::new(key.value()));
                }
                Ok(tags)
            }

            fn reaction(&self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError> {
                let table = self.txn.open_table(REACTIONS).map_err(storage_err)?;
                Ok(table
                    .get(key.as_tuple())
                    .map_err(storage_err)?
                    .map(|id| Reaction::new(ReactionId(id.value()), *key)))
            }

            fn reactions_of_reactant(
                &self,
                reactant: ReactantId,
            ) -> Result<Vec<Reaction>, KudosError> {
                let table = self.txn.open_table(REACTIONS).map_err(storage_err)?;
                let mut reactions = Vec::new();
                for entry in table
                    .range((reactant.0, 0, 0)..=(reactant.0, u64::MAX, u64::MAX))
                    .map_err(storage_err)?
                {
                    let (key, id) = entry.map_err(storage_err)?;
                    reactions.push(Reaction::new(
                        ReactionId(id.value()),
                        ReactionKey::from_tuple(key.value()),
                    ));
                }
                Ok(reactions)
            }

            fn reactions_between(
                &self,
                reacter: ReacterId,
                reactant: ReactantId,
            ) -> Result<Vec<Reaction>, KudosError> {
                let table = self.txn.open_table(REACTIONS).map_err(storage_err)?;
                let mut reactions = Vec::new();
                for entry in table
                    .range((reactant.0, reacter.0, 0)..=(reactant.0, reacter.0, u64::MAX))
                    .map_err(storage_err)?
                {
                    let (key, id) = entry.map_err(storage_err)?;
                    reactions.push(Reaction::new(
                        ReactionId(id.value()),
                        ReactionKey::from_tuple(key.value()),
                    ));
                }
                Ok(reactions)
            }

            fn reactions_by_reacter(
                &self,
                reacter: ReacterId,
            ) -> Result<Vec<Reaction>, KudosError> {
                let table = self.txn.open_table(REACTER_INDEX).map_err(storage_err)?;
                let mut reactions = Vec::new();
                for entry in table
                    .range((reacter.0, 0, 0)..=(reacter.0, u64::MAX, u64::MAX))
                    .map_err(storage_err)?
                {
                    let (key, id) = entry.map_err(storage_err)?;
                    let (reacter, reactant, reaction_type) = key.value();
                    reactions.push(Reaction::new(
                        ReactionId(id.value()),
                        ReactionKey::new(
                            ReacterId(reacter),
                            ReactantId(reactant),
                            ReactionTypeId(reaction_type),
                        ),
                    ));
                }
                Ok(reactions)
            }

            fn counter(
                &self,
                reactant: ReactantId,
                reaction_type: ReactionTypeId,
            ) -> Result<Option<ReactionCounter>, KudosError> {
                let table = self.txn.open_table(COUNTERS).map_err(storage_err)?;
                Ok(table
                    .get((reactant.0, reaction_type.0))
                    .map_err(storage_err)?
                    .map(|count| ReactionCounter {
                        reactant,
                        reaction_type,
                        count: count.value(),
                    }))
            }

            fn counters_of(
                &self,
                reactant: ReactantId,
            ) -> Result<Vec<ReactionCounter>, KudosError> {
                let table = self.txn.open_table(COUNTERS).map_err(storage_err)?;
                let mut counters = Vec::new();
                for entry in table
                    .range((reactant.0, 0)..=(reactant.0, u64::MAX))
                    .map_err(storage_err)?
                {
                    let (key, count) = entry.map_err(storage_err)?;
                    counters.push(ReactionCounter {
                        reactant,
                        reaction_type: ReactionTypeId(key.value().1),
                        count: count.value(),
                    });
                }
                Ok(counters)
            }

            fn summary(
                &self,
                reactant: ReactantId,
            ) -> Result<Option<ReactionSummary>, KudosError> {
                let table = self.txn.open_table(SUMMARIES).map_err(storage_err)?;
                Ok(table.get(reactant.0).map_err(storage_err)?.map(|totals| {
                    let (total_count, total_weight) = totals.value();
                    ReactionSummary {
                        reactant,
                        total_count,
                        total_weight,
                    }
                }))
            }

            fn table_sizes(&self) -> Result<TableSizes, KudosError> {
                Ok(TableSizes {
                    reaction_types: self
                        .txn
                        .open_table(REACTION_TYPES)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                    reactants: self
                        .txn
                        .open_table(REACTANTS)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                    reacters: self
                        .txn
                        .open_table(REACTERS)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                    reactions: self
                        .txn
                        .open_table(REACTIONS)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                    counters: self
                        .txn
                        .open_table(COUNTERS)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                    summaries: self
                        .txn
                        .open_table(SUMMARIES)
                        .map_err(storage_err)?
                        .len()
                        .map_err(storage_err)?,
                })
            }
        }
    };
}

redb_read_tables!(RedbRead);
redb_read_tables!(RedbWrite);

// =============================================================================
// WRITES
// =============================================================================

impl RedbWrite {
    /// Take the next id for `counter`, advancing the stored value.
    fn next_id(&self, counter: &str) -> Result<u64, KudosError> {
        let mut meta = self.txn.open_table(METADATA).map_err(storage_err)?;
        let id = meta
            .get(counter)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(1);
        meta.insert(counter, id.saturating_add(1))
            .map_err(storage_err)?;
        Ok(id)
    }
}

impl WriteTables for RedbWrite {
    fn insert_reaction_type(
        &mut self,
        name: &str,
        mass: i64,
    ) -> Result<ReactionType, KudosError> {
        let id = ReactionTypeId(self.next_id(NEXT_REACTION_TYPE_ID)?);
        let reaction_type = ReactionType::new(id, name, mass);
        let bytes = encode(&reaction_type)?;
        {
            let mut table = self.txn.open_table(REACTION_TYPES).map_err(storage_err)?;
            table.insert(id.0, bytes.as_slice()).map_err(storage_err)?;
        }
        {
            let mut names = self.txn.open_table(TYPE_NAMES).map_err(storage_err)?;
            names.insert(name, id.0).map_err(storage_err)?;
        }
        Ok(reaction_type)
    }

    fn insert_reactant(&mut self, host_type: &HostType) -> Result<Reactant, KudosError> {
        let id = ReactantId(self.next_id(NEXT_REACTANT_ID)?);
        let reactant = Reactant {
            id,
            host_type: host_type.clone(),
        };
        let bytes = encode(&reactant)?;
        {
            let mut table = self.txn.open_table(REACTANTS).map_err(storage_err)?;
            table.insert(id.0, bytes.as_slice()).map_err(storage_err)?;
        }
        {
            let mut hosts = self.txn.open_table(HOST_TYPES).map_err(storage_err)?;
            let registered = hosts
                .get(host_type.as_str())
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            hosts
                .insert(host_type.as_str(), registered.saturating_add(1))
                .map_err(storage_err)?;
        }
        {
            let mut index = self.txn.open_table(HOST_INDEX).map_err(storage_err)?;
            index
                .insert((host_type.as_str(), id.0), ())
                .map_err(storage_err)?;
        }
        Ok(reactant)
    }

    fn insert_reacter(&mut self, host_type: &HostType) -> Result<Reacter, KudosError> {
        let id = ReacterId(self.next_id(NEXT_REACTER_ID)?);
        let reacter = Reacter {
            id,
            host_type: host_type.clone(),
        };
        let bytes = encode(&reacter)?;
        let mut table = self.txn.open_table(REACTERS).map_err(storage_err)?;
        table.insert(id.0, bytes.as_slice()).map_err(storage_err)?;
        Ok(reacter)
    }

    fn insert_reaction(&mut self, key: ReactionKey) -> Result<Reaction, KudosError> {
        let id = ReactionId(self.next_id(NEXT_REACTION_ID)?);
        {
            let mut table = self.txn.open_table(REACTIONS).map_err(storage_err)?;
            table.insert(key.as_tuple(), id.0).map_err(storage_err)?;
        }
        {
            let mut index = self.txn.open_table(REACTER_INDEX).map_err(storage_err)?;
            index
                .insert((key.reacter.0, key.reactant.0, key.reaction_type.0), id.0)
                .map_err(storage_err)?;
        }
        Ok(Reaction::new(id, key))
    }

    fn delete_reaction(&mut self, key: &ReactionKey) -> Result<Option<Reaction>, KudosError> {
        let removed = {
            let mut table = self.txn.open_table(REACTIONS).map_err(storage_err)?;
            table
                .remove(key.as_tuple())
                .map_err(storage_err)?
                .map(|id| id.value())
        };
        let Some(id) = removed else {
            return Ok(None);
        };
        {
            let mut index = self.txn.open_table(REACTER_INDEX).map_err(storage_err)?;
            index
                .remove((key.reacter.0, key.reactant.0, key.reaction_type.0))
                .map_err(storage_err)?;
        }
        Ok(Some(Reaction::new(ReactionId(id), *key)))
    }

    fn put_counter(&mut self, counter: ReactionCounter) -> Result<(), KudosError> {
        let mut table = self.txn.open_table(COUNTERS).map_err(storage_err)?;
        table
            .insert((counter.reactant.0, counter.reaction_type.0), counter.count)
            .map_err(storage_err)?;
        Ok(())
    }

    fn delete_counter(
        &mut self,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<bool, KudosError> {
        let mut table = self.txn.open_table(COUNTERS).map_err(storage_err)?;
        let existed = table
            .remove((reactant.0, reaction_type.0))
            .map_err(storage_err)?
            .is_some();
        Ok(existed)
    }

    fn put_summary(&mut self, summary: ReactionSummary) -> Result<(), KudosError> {
        let mut table = self.txn.open_table(SUMMARIES).map_err(storage_err)?;
        table
            .insert(
                summary.reactant.0,
                (summary.total_count, summary.total_weight),
            )
            .map_err(storage_err)?;
        Ok(())
    }

    fn delete_summary(&mut self, reactant: ReactantId) -> Result<bool, KudosError> {
        let mut table = self.txn.open_table(SUMMARIES).map_err(storage_err)?;
        let existed = table
            .remove(reactant.0)
            .map_err(storage_err)?
            .is_some();
        Ok(existed)
    }

    fn commit(self) -> Result<(), KudosError> {
        self.txn.commit().map_err(storage_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================
