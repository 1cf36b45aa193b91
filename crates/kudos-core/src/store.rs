//! # Reaction Store
//!
//! The source of truth: the set of live (reacter, reactant, type) facts.
//!
//! - `add` and `remove` are idempotent and report whether they changed
//!   anything, so the aggregators know whether to adjust their rows.
//! - Existence checks and direct aggregates always read the facts, never
//!   the cached counters or summaries.

use crate::registry::Registry;
use crate::storage::{ReadTables, WriteTables};
use crate::{KudosError, ReactantId, ReacterId, Reaction, ReactionKey, ReactionTypeId};
use std::collections::BTreeMap;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of [`ReactionStore::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new reaction was inserted.
    Created(Reaction),
    /// The triple already existed; nothing changed.
    Existing(Reaction),
}

impl AddOutcome {
    /// The reaction row, whether new or pre-existing.
    #[must_use]
    pub fn reaction(&self) -> &Reaction {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of [`ReactionStore::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The reaction existed and was deleted.
    Removed(Reaction),
    /// No such reaction; nothing changed.
    NotFound,
}

impl RemoveOutcome {
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

/// Per-type counts and totals of one reactant, derived from the facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactantTally {
    /// Live reaction count per type. Types with no reactions are absent.
    pub counts: BTreeMap<ReactionTypeId, u64>,
    pub total_count: u64,
    pub total_weight: i64,
}

// =============================================================================
// STORE
// =============================================================================

/// Stateless operations over the reaction facts.
pub struct ReactionStore;

impl ReactionStore {
    /// Insert the triple unless it already exists.
    pub fn add<W: WriteTables>(tx: &mut W, key: ReactionKey) -> Result<AddOutcome, KudosError> {
        if let Some(existing) = tx.reaction(&key)? {
            return Ok(AddOutcome::Existing(existing));
        }
        Ok(AddOutcome::Created(tx.insert_reaction(key)?))
    }

    /// Delete the triple if it exists.
    pub fn remove<W: WriteTables>(
        tx: &mut W,
        key: &ReactionKey,
    ) -> Result<RemoveOutcome, KudosError> {
        Ok(match tx.delete_reaction(key)? {
            Some(reaction) => RemoveOutcome::Removed(reaction),
            None => RemoveOutcome::NotFound,
        })
    }

    /// Whether the reacter holds a reaction to the reactant, optionally of one type.
    pub fn exists_for<R: ReadTables>(
        tables: &R,
        reacter: ReacterId,
        reactant: ReactantId,
        reaction_type: Option<ReactionTypeId>,
    ) -> Result<bool, KudosError> {
        match reaction_type {
            Some(ty) => Ok(tables
                .reaction(&ReactionKey::new(reacter, reactant, ty))?
                .is_some()),
            None => Ok(!tables.reactions_between(reacter, reactant)?.is_empty()),
        }
    }

    /// Number of live reactions against a reactant, optionally of one type.
    pub fn count_for<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
        reaction_type: Option<ReactionTypeId>,
    ) -> Result<u64, KudosError> {
        Ok(tables
            .reactions_of_reactant(reactant)?
            .iter()
            .filter(|r| reaction_type.is_none_or(|ty| r.reaction_type() == ty))
            .count() as u64)
    }

    /// Sum of type masses over live reactions, optionally of one type.
    pub fn weight_for<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
        reaction_type: Option<ReactionTypeId>,
    ) -> Result<i64, KudosError> {
        let tally = Self::tally(tables, reactant)?;
        match reaction_type {
            None => Ok(tally.total_weight),
            Some(ty) => {
                let count = tally.counts.get(&ty).copied().unwrap_or(0);
                let mass = tables.reaction_type(ty)?.map_or(0, |t| Registry::weight_of(&t));
                Ok(mass.saturating_mul(i64::try_from(count).unwrap_or(i64::MAX)))
            }
        }
    }

    /// Group the reactant's live reactions by type.
    ///
    /// This is the ground truth the counter and summary rows must match.
    pub fn tally<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
    ) -> Result<ReactantTally, KudosError> {
        let mut tally = ReactantTally::default();
        for reaction in tables.reactions_of_reactant(reactant)? {
            let count = tally.counts.entry(reaction.reaction_type()).or_insert(0);
            *count = count.saturating_add(1);
        }

        for (&ty, &count) in &tally.counts {
            let mass = tables.reaction_type(ty)?.map_or(0, |t| Registry::weight_of(&t));
            tally.total_count = tally.total_count.saturating_add(count);
            tally.total_weight = tally
                .total_weight
                .saturating_add(mass.saturating_mul(i64::try_from(count).unwrap_or(i64::MAX)));
        }
        Ok(tally)
    }
}

// =============================================================================
// TESTS
// =============================================================================
