//! # Property-Based Tests
//!
//! Aggregate invariants under arbitrary react/unreact sequences.

use kudos_core::{
    Kudos, MemoryLedger, ReactantId, ReacterId, ReactionCounter, ReactionStore, ReactionSummary,
    ReadTables, RecountScope, Storage, WriteTables,
};
use proptest::collection::vec;
use proptest::prelude::*;

const TYPES: [(&str, i64); 3] = [("Like", 1), ("Dislike", -1), ("Love", 5)];
const REACTERS: u64 = 4;
const REACTANTS: u64 = 3;

/// One react (`true`) or unreact (`false`) call.
#[derive(Debug, Clone, Copy)]
struct Op {
    reacter: u64,
    reactant: u64,
    type_index: usize,
    react: bool,
}

fn op() -> impl Strategy<Value = Op> {
    (1..=REACTERS, 1..=REACTANTS, 0..TYPES.len(), any::<bool>()).prop_map(
        |(reacter, reactant, type_index, react)| Op {
            reacter,
            reactant,
            type_index,
            react,
        },
    )
}

fn engine() -> Kudos<MemoryLedger> {
    let kudos = Kudos::new(MemoryLedger::new());
    for (name, mass) in TYPES {
        kudos.create_reaction_type(name, mass).expect("type");
    }
    for _ in 0..REACTERS {
        kudos.register_reacter("User").expect("reacter");
    }
    for i in 0..REACTANTS {
        let host = if i % 2 == 0 { "Article" } else { "Comment" };
        kudos.register_reactant(host).expect("reactant");
    }
    kudos
}

fn apply(kudos: &Kudos<MemoryLedger>, op: Op) {
    let reacter = kudos.reacter(Some(ReacterId(op.reacter)));
    let reactant = Some(ReactantId(op.reactant));
    let name = TYPES[op.type_index].0;
    if op.react {
        reacter.react_to(reactant, name).expect("react");
    } else {
        reacter.unreact_to(reactant, name).expect("unreact");
    }
}

/// Every cached counter and summary row, per reactant.
fn aggregates(kudos: &Kudos<MemoryLedger>) -> Vec<(Vec<ReactionCounter>, Option<ReactionSummary>)> {
    let read = kudos.storage().read().expect("read");
    (1..=REACTANTS)
        .map(|id| {
            let reactant = ReactantId(id);
            (
                read.counters_of(reactant).expect("counters"),
                read.summary(reactant).expect("summary"),
            )
        })
        .collect()
}

fn wipe_aggregates(kudos: &Kudos<MemoryLedger>) {
    let mut tx = kudos.storage().write().expect("write");
    for id in 1..=REACTANTS {
        let reactant = ReactantId(id);
        for counter in tx.counters_of(reactant).expect("counters") {
            tx.delete_counter(reactant, counter.reaction_type)
                .expect("delete counter");
        }
        tx.delete_summary(reactant).expect("delete summary");
    }
    tx.commit().expect("commit");
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Repeating any operation immediately changes nothing.
    #[test]
    fn operations_are_idempotent(ops in vec(op(), 1..40)) {
        let kudos = engine();
        for op in ops {
            apply(&kudos, op);
            let once = kudos.storage().snapshot().expect("snapshot");
            apply(&kudos, op);
            prop_assert_eq!(kudos.storage().snapshot().expect("snapshot"), once);
        }
    }

    /// A fresh reaction followed by its removal restores every aggregate.
    #[test]
    fn react_then_unreact_restores_aggregates(
        ops in vec(op(), 0..40),
        target in op(),
    ) {
        let kudos = engine();
        for op in ops {
            apply(&kudos, op);
        }
        // make sure the target triple starts absent
        apply(&kudos, Op { react: false, ..target });
        let before = aggregates(&kudos);

        apply(&kudos, Op { react: true, ..target });
        apply(&kudos, Op { react: false, ..target });

        prop_assert_eq!(aggregates(&kudos), before);
    }

    /// Cached rows always equal values derived from the Reaction Store.
    #[test]
    fn cached_rows_match_reaction_store(ops in vec(op(), 0..60)) {
        let kudos = engine();
        for op in ops {
            apply(&kudos, op);
        }

        let read = kudos.storage().read().expect("read");
        for id in 1..=REACTANTS {
            let reactant = ReactantId(id);
            for (name, _) in TYPES {
                let ty = read.reaction_type_by_name(name).expect("lookup").expect("type");
                prop_assert_eq!(
                    read.counter(reactant, ty.id).expect("counter").map_or(0, |c| c.count),
                    ReactionStore::count_for(&read, reactant, Some(ty.id)).expect("count")
                );
            }
            let summary = read.summary(reactant).expect("summary");
            prop_assert_eq!(
                summary.map_or(0, |s| s.total_count),
                ReactionStore::count_for(&read, reactant, None).expect("count")
            );
            prop_assert_eq!(
                summary.map_or(0, |s| s.total_weight),
                ReactionStore::weight_for(&read, reactant, None).expect("weight")
            );
        }
        drop(read);

        prop_assert!(kudos.verify(&RecountScope::all()).expect("verify").is_clean());
    }

    /// Deleting every aggregate and recounting restores the exact state.
    #[test]
    fn recount_converges(ops in vec(op(), 0..60), batch in 1usize..5) {
        let kudos = engine().with_recount_batch_size(batch);
        for op in ops {
            apply(&kudos, op);
        }
        let before = kudos.storage().snapshot().expect("snapshot");

        wipe_aggregates(&kudos);
        kudos.recount(&RecountScope::all()).expect("recount");

        prop_assert_eq!(kudos.storage().snapshot().expect("snapshot"), before);
    }

    /// The null reacter never reports a reaction and never writes.
    #[test]
    fn null_reacter_is_inert(ops in vec(op(), 0..20), target in op()) {
        let kudos = engine();
        for op in ops {
            apply(&kudos, op);
        }
        let before = kudos.storage().snapshot().expect("snapshot");
        let anonymous = kudos.reacter(None);
        let reactant = Some(ReactantId(target.reactant));
        let name = TYPES[target.type_index].0;

        anonymous.react_to(reactant, name).expect("react");
        anonymous.unreact_to(reactant, name).expect("unreact");
        prop_assert!(!anonymous.has_reacted_to(reactant, None).expect("has"));
        prop_assert!(!anonymous.has_reacted_to(reactant, Some(name)).expect("has"));
        prop_assert_eq!(kudos.storage().snapshot().expect("snapshot"), before);
    }
}
