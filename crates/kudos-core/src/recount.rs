//! # Recount
//!
//! Rebuilds cached counter and summary rows from the Reaction Store.
//!
//! ## Scope
//!
//! | host type | reaction type | counters rebuilt              | summaries rebuilt |
//! |-----------|---------------|-------------------------------|-------------------|
//! | all       | all           | every row                     | every row         |
//! | one       | all           | rows of that host's reactants | same reactants    |
//! | all       | one           | rows of that type             | every row         |
//! | one       | one           | that type, that host          | same reactants    |
//!
//! A summary spans every type, so a type filter narrows counters only.
//! A host type filter covers every tag equivalent to it through the alias
//! table, so reactants registered under an alias and under its canonical
//! name are rebuilt together.
//!
//! ## Batching
//!
//! Reactants in scope are paged in id order. Each page is rewritten
//! (delete then reinsert) inside a single write transaction, so a reader
//! sees either the old rows or the new rows of a batch, never a gap.

use crate::counter::CounterAggregator;
use crate::host::HostTypeMap;
use crate::registry::Registry;
use crate::storage::{ReadTables, Storage, WriteTables};
use crate::summary::SummaryAggregator;
use crate::{HostType, KudosError, ReactantId, ReactionTypeId};
use serde::{Deserialize, Serialize};

// =============================================================================
// SCOPE
// =============================================================================

/// Which reactants and reaction types a recount (or audit) covers.
///
/// Names are unresolved operator input; they are resolved when the
/// operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountScope {
    /// Host type name (or alias); `None` means every reactant.
    pub host_type: Option<String>,
    /// Reaction type name; `None` means every type.
    pub reaction_type: Option<String>,
}

impl RecountScope {
    /// Every reactant, every type.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host_type(mut self, host_type: impl Into<String>) -> Self {
        self.host_type = Some(host_type.into());
        self
    }

    #[must_use]
    pub fn with_reaction_type(mut self, reaction_type: impl Into<String>) -> Self {
        self.reaction_type = Some(reaction_type.into());
        self
    }

    /// Resolve both filters against the catalog and the host type map.
    pub(crate) fn resolve<R: ReadTables>(
        &self,
        tables: &R,
        hosts: &HostTypeMap,
    ) -> Result<ResolvedScope, KudosError> {
        let host_types = self
            .host_type
            .as_deref()
            .map(|tag| hosts.resolve(tables, tag))
            .transpose()?;
        let reaction_type =
            Registry::resolve_optional(tables, self.reaction_type.as_deref())?.map(|t| t.id);
        Ok(ResolvedScope {
            host_types,
            reaction_type,
        })
    }
}

/// A scope whose names have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedScope {
    /// Equivalent host tags; `None` means every reactant.
    pub host_types: Option<Vec<HostType>>,
    pub reaction_type: Option<ReactionTypeId>,
}

impl ResolvedScope {
    /// Host filters to page through one after the other. Each reactant has a
    /// single tag, so the groups never overlap.
    pub fn host_groups(&self) -> Vec<Option<&HostType>> {
        match &self.host_types {
            Some(tags) => tags.iter().map(Some).collect(),
            None => vec![None],
        }
    }

    pub fn host_names(&self) -> Option<Vec<&str>> {
        self.host_types
            .as_ref()
            .map(|tags| tags.iter().map(HostType::as_str).collect())
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// What a recount did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecountReport {
    pub reactants: u64,
    pub batches: u64,
    pub counters_deleted: u64,
    pub counters_written: u64,
    pub summaries_deleted: u64,
    pub summaries_written: u64,
}

// =============================================================================
// RECOUNTER
// =============================================================================

/// Runs recounts against a storage backend.
pub struct Recounter;

impl Recounter {
    /// Rebuild every cached row in `scope` from the Reaction Store.
    ///
    /// Filters are resolved before anything is deleted: an unknown host type
    /// fails with `UnknownHostEntity` and an unknown reaction type with
    /// `TypeNotFound`, leaving all rows untouched.
    pub fn run<S: Storage>(
        storage: &S,
        hosts: &HostTypeMap,
        scope: &RecountScope,
        batch_size: usize,
    ) -> Result<RecountReport, KudosError> {
        let resolved = {
            let read = storage.read()?;
            scope.resolve(&read, hosts)?
        };
        let batch_size = batch_size.max(1);

        tracing::info!(
            host_types = ?resolved.host_names(),
            reaction_type = resolved.reaction_type.map(|t| t.0),
            batch_size,
            "recount started"
        );

        let mut report = RecountReport::default();
        for host_type in resolved.host_groups() {
            let mut cursor: Option<ReactantId> = None;
            loop {
                let mut tx = storage.write()?;
                let page = tx.reactants_after(cursor, host_type, batch_size)?;
                let Some(last) = page.last().map(|r| r.id) else {
                    break;
                };

                let counters =
                    CounterAggregator::recount_for(&mut tx, &page, resolved.reaction_type)?;
                let summaries = SummaryAggregator::recount_for(&mut tx, &page)?;
                tx.commit()?;

                report.reactants += page.len() as u64;
                report.batches += 1;
                report.counters_deleted += counters.deleted;
                report.counters_written += counters.written;
                report.summaries_deleted += summaries.deleted;
                report.summaries_written += summaries.written;

                tracing::debug!(
                    batch = report.batches,
                    host_type = host_type.map(HostType::as_str),
                    reactants = page.len(),
                    last_reactant = last.0,
                    "recount batch committed"
                );

                if page.len() < batch_size {
                    break;
                }
                cursor = Some(last);
            }
        }

        tracing::info!(
            reactants = report.reactants,
            batches = report.batches,
            counters_written = report.counters_written,
            summaries_written = report.summaries_written,
            "recount finished"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedger;
    use crate::{ReacterId, ReactionCounter, ReactionKey, ReactionSummary};

    /// Two Article reactants and one Comment reactant with raw reactions and
    /// no cached rows.
    fn fixture() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.write().expect("write");
        let like = Registry::create(&mut tx, "Like", 1).expect("like");
        let dislike = Registry::create(&mut tx, "Dislike", -1).expect("dislike");
        let a1 = tx.insert_reactant(&HostType::new("Article")).expect("a1");
        let c1 = tx.insert_reactant(&HostType::new("Comment")).expect("c1");
        let a2 = tx.insert_reactant(&HostType::new("Article")).expect("a2");
        for (reacter, reactant, ty) in [
            (1, a1.id, like.id),
            (2, a1.id, like.id),
            (3, a1.id, dislike.id),
            (1, c1.id, like.id),
            (1, a2.id, dislike.id),
        ] {
            tx.insert_reaction(ReactionKey::new(ReacterId(reacter), reactant, ty))
                .expect("reaction");
        }
        tx.commit().expect("commit");
        ledger
    }

    fn count(ledger: &MemoryLedger, reactant: u64, ty: u64) -> Option<u64> {
        let read = ledger.read().expect("read");
        read.counter(ReactantId(reactant), ReactionTypeId(ty))
            .expect("counter")
            .map(|c| c.count)
    }

    #[test]
    fn recount_all_builds_every_row() {
        let ledger = fixture();
        let report =
            Recounter::run(&ledger, &HostTypeMap::new(), &RecountScope::all(), 2).expect("run");

        assert_eq!(report.reactants, 3);
        assert_eq!(report.batches, 2);
        assert_eq!(report.counters_written, 4);
        assert_eq!(report.summaries_written, 3);
        assert_eq!(count(&ledger, 1, 1), Some(2));
        assert_eq!(count(&ledger, 1, 2), Some(1));
        assert_eq!(count(&ledger, 2, 1), Some(1));
        assert_eq!(count(&ledger, 3, 2), Some(1));

        let read = ledger.read().expect("read");
        let summary = read.summary(ReactantId(1)).expect("summary").expect("row");
        assert_eq!((summary.total_count, summary.total_weight), (3, 1));
    }

    #[test]
    fn host_and_type_filter_touches_only_scope() {
        let ledger = fixture();
        {
            let mut tx = ledger.write().expect("write");
            for (reactant, ty, n) in [(1, 1, 7), (1, 2, 7), (2, 1, 7)] {
                tx.put_counter(ReactionCounter {
                    reactant: ReactantId(reactant),
                    reaction_type: ReactionTypeId(ty),
                    count: n,
                })
                .expect("stale");
            }
            tx.commit().expect("commit");
        }

        let scope = RecountScope::all()
            .with_host_type("Article")
            .with_reaction_type("Like");
        let report = Recounter::run(&ledger, &HostTypeMap::new(), &scope, 10).expect("run");

        assert_eq!(report.reactants, 2);
        assert_eq!(count(&ledger, 1, 1), Some(2));
        // Dislike counter and Comment counter untouched
        assert_eq!(count(&ledger, 1, 2), Some(7));
        assert_eq!(count(&ledger, 2, 1), Some(7));
        // Article 2 has no Like reactions
        assert_eq!(count(&ledger, 3, 1), None);
    }

    #[test]
    fn stale_rows_without_reactions_are_deleted() {
        let ledger = fixture();
        {
            let mut tx = ledger.write().expect("write");
            let empty = tx.insert_reactant(&HostType::new("Article")).expect("empty");
            tx.put_counter(ReactionCounter {
                reactant: empty.id,
                reaction_type: ReactionTypeId(1),
                count: 3,
            })
            .expect("stale");
            tx.put_summary(ReactionSummary {
                reactant: empty.id,
                total_count: 3,
                total_weight: 3,
            })
            .expect("stale");
            tx.commit().expect("commit");
        }

        Recounter::run(&ledger, &HostTypeMap::new(), &RecountScope::all(), 500).expect("run");

        assert_eq!(count(&ledger, 4, 1), None);
        let read = ledger.read().expect("read");
        assert!(read.summary(ReactantId(4)).expect("summary").is_none());
    }

    #[test]
    fn unknown_filters_fail_before_touching_rows() {
        let ledger = fixture();
        Recounter::run(&ledger, &HostTypeMap::new(), &RecountScope::all(), 500).expect("run");

        let bad_host = RecountScope::all().with_host_type("NotExist");
        assert!(matches!(
            Recounter::run(&ledger, &HostTypeMap::new(), &bad_host, 500),
            Err(KudosError::UnknownHostEntity(_))
        ));

        let bad_type = RecountScope::all().with_reaction_type("Nope");
        assert!(matches!(
            Recounter::run(&ledger, &HostTypeMap::new(), &bad_type, 500),
            Err(KudosError::TypeNotFound(_))
        ));

        assert_eq!(count(&ledger, 1, 1), Some(2));
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let ledger = fixture();
        let report =
            Recounter::run(&ledger, &HostTypeMap::new(), &RecountScope::all(), 0).expect("run");
        assert_eq!(report.batches, 3);
    }
}
