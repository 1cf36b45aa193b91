//! # Drift Audit
//!
//! Read-only comparison of the cached counter and summary rows against
//! values derived from the Reaction Store.
//!
//! Reactants are walked in the same pages a recount would use, each page in
//! its own read view. Nothing is written; a clean report means a recount of
//! the same scope would change nothing.

use crate::host::HostTypeMap;
use crate::recount::RecountScope;
use crate::storage::{ReadTables, Storage};
use crate::store::ReactionStore;
use crate::{KudosError, ReactantId, ReactionTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One cached row that disagrees with the Reaction Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum Drift {
    Counter {
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
        cached: u64,
        actual: u64,
    },
    Summary {
        reactant: ReactantId,
        cached_count: u64,
        cached_weight: i64,
        actual_count: u64,
        actual_weight: i64,
    },
}

/// Outcome of an audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub reactants_checked: u64,
    pub drift: Vec<Drift>,
}

impl DriftReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty()
    }
}

/// Runs drift audits against a storage backend.
pub struct Auditor;

impl Auditor {
    /// Audit every reactant in `scope`.
    ///
    /// With a reaction type filter only counters of that type are compared;
    /// summaries are always compared since they span every type.
    pub fn run<S: Storage>(
        storage: &S,
        hosts: &HostTypeMap,
        scope: &RecountScope,
        batch_size: usize,
    ) -> Result<DriftReport, KudosError> {
        let resolved = {
            let read = storage.read()?;
            scope.resolve(&read, hosts)?
        };
        let batch_size = batch_size.max(1);

        let mut report = DriftReport::default();
        for host_type in resolved.host_groups() {
            let mut cursor: Option<ReactantId> = None;
            loop {
                let read = storage.read()?;
                let page = read.reactants_after(cursor, host_type, batch_size)?;
                let Some(last) = page.last().map(|r| r.id) else {
                    break;
                };

                for reactant in &page {
                    Self::check(&read, reactant.id, resolved.reaction_type, &mut report.drift)?;
                }
                report.reactants_checked += page.len() as u64;

                if page.len() < batch_size {
                    break;
                }
                cursor = Some(last);
            }
        }

        if report.is_clean() {
            tracing::info!(reactants = report.reactants_checked, "no drift found");
        } else {
            tracing::warn!(
                reactants = report.reactants_checked,
                rows = report.drift.len(),
                "cached rows drifted from reaction store"
            );
        }
        Ok(report)
    }

    fn check<R: ReadTables>(
        tables: &R,
        reactant: ReactantId,
        type_scope: Option<ReactionTypeId>,
        out: &mut Vec<Drift>,
    ) -> Result<(), KudosError> {
        let tally = ReactionStore::tally(tables, reactant)?;
        let cached: Vec<_> = tables.counters_of(reactant)?;

        // every type seen on either side
        let types: BTreeSet<ReactionTypeId> = cached
            .iter()
            .map(|c| c.reaction_type)
            .chain(tally.counts.keys().copied())
            .filter(|ty| type_scope.is_none_or(|scope| scope == *ty))
            .collect();

        for reaction_type in types {
            let cached_count = cached
                .iter()
                .find(|c| c.reaction_type == reaction_type)
                .map_or(0, |c| c.count);
            let actual = tally.counts.get(&reaction_type).copied().unwrap_or(0);
            if cached_count != actual {
                out.push(Drift::Counter {
                    reactant,
                    reaction_type,
                    cached: cached_count,
                    actual,
                });
            }
        }

        let (cached_count, cached_weight) = tables
            .summary(reactant)?
            .map_or((0, 0), |s| (s.total_count, s.total_weight));
        if (cached_count, cached_weight) != (tally.total_count, tally.total_weight) {
            out.push(Drift::Summary {
                reactant,
                cached_count,
                cached_weight,
                actual_count: tally.total_count,
                actual_weight: tally.total_weight,
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
