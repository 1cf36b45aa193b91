//! # Counter Aggregator
//!
//! One cached count per (reactant, type) pair.
//!
//! Per pair the row is either `Absent` or `Present(count)` with `count >= 1`:
//! - a created reaction inserts the row at 1 or increments it,
//! - a removed reaction decrements it and deletes the row when it reaches 0.
//!
//! Reads treat an absent row as zero. Every adjustment runs inside the
//! caller's unit of work, which the backend serializes against all other
//! writers, so an increment can never be lost to a concurrent one.

use crate::storage::{ReadTables, WriteTables};
use crate::store::{ReactantTally, ReactionStore};
use crate::{KudosError, Reactant, ReactantId, ReactionCounter, ReactionKey, ReactionTypeId};

/// Rows touched by a counter rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterRebuild {
    pub deleted: u64,
    pub written: u64,
}

/// Stateless operations over the counter rows.
pub struct CounterAggregator;

impl CounterAggregator {
    /// Apply a newly created reaction.
    pub fn on_created<W: WriteTables>(
        tx: &mut W,
        key: &ReactionKey,
    ) -> Result<ReactionCounter, KudosError> {
        let count = tx
            .counter(key.reactant, key.reaction_type)?
            .map_or(0, |c| c.count)
            .saturating_add(1);
        let counter = ReactionCounter {
            reactant: key.reactant,
            reaction_type: key.reaction_type,
            count,
        };
        tx.put_counter(counter)?;
        Ok(counter)
    }

    /// Apply a removed reaction. Returns the remaining row, or `None` if the
    /// row is now absent.
    pub fn on_removed<W: WriteTables>(
        tx: &mut W,
        key: &ReactionKey,
    ) -> Result<Option<ReactionCounter>, KudosError> {
        let Some(current) = tx.counter(key.reactant, key.reaction_type)? else {
            tracing::warn!(
                reactant = key.reactant.0,
                reaction_type = key.reaction_type.0,
                "counter row missing on decrement; run recount"
            );
            return Ok(None);
        };

        let count = current.count.saturating_sub(1);
        if count == 0 {
            tx.delete_counter(key.reactant, key.reaction_type)?;
            return Ok(None);
        }

        let counter = ReactionCounter { count, ..current };
        tx.put_counter(counter)?;
        Ok(Some(counter))
    }

    /// Cached count of a pair; zero when the row is absent.
    pub fn count_of<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Result<u64, KudosError> {
        Ok(tables
            .counter(reactant, reaction_type)?
            .map_or(0, |c| c.count))
    }

    /// Replace one reactant's counter rows in `type_scope` with the counts
    /// from its tally. Rows of other types are left untouched.
    pub fn rebuild<W: WriteTables>(
        tx: &mut W,
        reactant: ReactantId,
        tally: &ReactantTally,
        type_scope: Option<ReactionTypeId>,
    ) -> Result<CounterRebuild, KudosError> {
        let mut stats = CounterRebuild::default();

        for counter in tx.counters_of(reactant)? {
            if type_scope.is_none_or(|ty| ty == counter.reaction_type)
                && tx.delete_counter(reactant, counter.reaction_type)?
            {
                stats.deleted += 1;
            }
        }

        for (&reaction_type, &count) in &tally.counts {
            if count == 0 || type_scope.is_some_and(|ty| ty != reaction_type) {
                continue;
            }
            tx.put_counter(ReactionCounter {
                reactant,
                reaction_type,
                count,
            })?;
            stats.written += 1;
        }

        Ok(stats)
    }

    /// Rebuild the counter rows of a batch of reactants.
    pub fn recount_for<W: WriteTables>(
        tx: &mut W,
        reactants: &[Reactant],
        type_scope: Option<ReactionTypeId>,
    ) -> Result<CounterRebuild, KudosError> {
        let mut total = CounterRebuild::default();
        for reactant in reactants {
            let tally = ReactionStore::tally(&*tx, reactant.id)?;
            let stats = Self::rebuild(tx, reactant.id, &tally, type_scope)?;
            total.deleted += stats.deleted;
            total.written += stats.written;
        }
        Ok(total)
    }
}

// =============================================================================
// TESTS
// =============================================================================
