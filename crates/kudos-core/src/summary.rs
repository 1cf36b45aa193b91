//! # Summary Aggregator
//!
//! One cached `(total_count, total_weight)` row per reactant, across all
//! reaction types.
//!
//! The weight added on react and subtracted on unreact is the type's mass
//! at that moment. A later change of mass is not applied retroactively;
//! only a recount brings the row back in line with current masses.

use crate::storage::{ReadTables, WriteTables};
use crate::store::{ReactantTally, ReactionStore};
use crate::{KudosError, Reactant, ReactantId, ReactionSummary};

/// Rows touched by a summary rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryRebuild {
    pub deleted: u64,
    pub written: u64,
}

/// Stateless operations over the summary rows.
pub struct SummaryAggregator;

impl SummaryAggregator {
    /// Apply a newly created reaction of the given mass.
    pub fn on_created<W: WriteTables>(
        tx: &mut W,
        reactant: ReactantId,
        mass: i64,
    ) -> Result<ReactionSummary, KudosError> {
        let current = tx
            .summary(reactant)?
            .unwrap_or(ReactionSummary::zero(reactant));
        let summary = ReactionSummary {
            reactant,
            total_count: current.total_count.saturating_add(1),
            total_weight: current.total_weight.saturating_add(mass),
        };
        tx.put_summary(summary)?;
        Ok(summary)
    }

    /// Apply a removed reaction of the given mass.
    ///
    /// When the count reaches zero the row is deleted, so the read side
    /// reports `(0, 0)` even if the accumulated weight had drifted.
    pub fn on_removed<W: WriteTables>(
        tx: &mut W,
        reactant: ReactantId,
        mass: i64,
    ) -> Result<ReactionSummary, KudosError> {
        let Some(current) = tx.summary(reactant)? else {
            tracing::warn!(
                reactant = reactant.0,
                "summary row missing on decrement; run recount"
            );
            return Ok(ReactionSummary::zero(reactant));
        };

        let total_count = current.total_count.saturating_sub(1);
        if total_count == 0 {
            tx.delete_summary(reactant)?;
            return Ok(ReactionSummary::zero(reactant));
        }

        let summary = ReactionSummary {
            reactant,
            total_count,
            total_weight: current.total_weight.saturating_sub(mass),
        };
        tx.put_summary(summary)?;
        Ok(summary)
    }

    /// Cached summary of a reactant; `(0, 0)` when the row is absent.
    pub fn summary_of<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
    ) -> Result<ReactionSummary, KudosError> {
        Ok(tables
            .summary(reactant)?
            .unwrap_or(ReactionSummary::zero(reactant)))
    }

    /// Replace one reactant's summary row with the totals of its tally.
    pub fn rebuild<W: WriteTables>(
        tx: &mut W,
        reactant: ReactantId,
        tally: &ReactantTally,
    ) -> Result<SummaryRebuild, KudosError> {
        let mut stats = SummaryRebuild::default();
        if tx.delete_summary(reactant)? {
            stats.deleted += 1;
        }
        if tally.total_count > 0 {
            tx.put_summary(ReactionSummary {
                reactant,
                total_count: tally.total_count,
                total_weight: tally.total_weight,
            })?;
            stats.written += 1;
        }
        Ok(stats)
    }

    /// Rebuild the summary rows of a batch of reactants.
    pub fn recount_for<W: WriteTables>(
        tx: &mut W,
        reactants: &[Reactant],
    ) -> Result<SummaryRebuild, KudosError> {
        let mut total = SummaryRebuild::default();
        for reactant in reactants {
            let tally = ReactionStore::tally(&*tx, reactant.id)?;
            let stats = Self::rebuild(tx, reactant.id, &tally)?;
            total.deleted += stats.deleted;
            total.written += stats.written;
        }
        Ok(total)
    }
}

// =============================================================================
// TESTS
// =============================================================================
