//! # Reaction Benchmarks
//!
//! Throughput of react/unreact and of recount on the in-memory ledger.
//!
//! Run with: `cargo bench -p kudos-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kudos_core::{Kudos, MemoryLedger, ReactantId, ReacterId, RecountScope};
use std::hint::black_box;

/// Ledger with two types, `reacters` users and `reactants` articles.
fn ledger(
    reacters: usize,
    reactants: usize,
) -> (Kudos<MemoryLedger>, Vec<ReacterId>, Vec<ReactantId>) {
    let kudos = Kudos::new(MemoryLedger::new());
    kudos.create_reaction_type("Like", 1).expect("like");
    kudos.create_reaction_type("Dislike", -1).expect("dislike");
    let users = (0..reacters)
        .map(|_| kudos.register_reacter("User").expect("user"))
        .collect();
    let articles = (0..reactants)
        .map(|_| kudos.register_reactant("Article").expect("article"))
        .collect();
    (kudos, users, articles)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_react_unreact(c: &mut Criterion) {
    let mut group = c.benchmark_group("react_unreact");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (kudos, users, articles) = ledger(size, 1);
            b.iter(|| {
                for user in &users {
                    let reacter = kudos.reacter(Some(*user));
                    reacter.react_to(Some(articles[0]), "Like").expect("react");
                    reacter.unreact_to(Some(articles[0]), "Like").expect("unreact");
                }
                black_box(kudos.reactant(Some(articles[0])).total_count().expect("count"))
            });
        });
    }

    group.finish();
}

fn bench_recount(c: &mut Criterion) {
    let mut group = c.benchmark_group("recount");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (kudos, users, articles) = ledger(10, size);
            for (i, article) in articles.iter().enumerate() {
                let name = if i % 3 == 0 { "Dislike" } else { "Like" };
                kudos
                    .reacter(Some(users[i % users.len()]))
                    .react_to(Some(*article), name)
                    .expect("react");
            }
            b.iter(|| black_box(kudos.recount(&RecountScope::all()).expect("recount")));
        });
    }

    group.finish();
}

fn bench_has_reacted(c: &mut Criterion) {
    let (kudos, users, articles) = ledger(100, 100);
    for user in &users {
        for article in articles.iter().step_by(7) {
            kudos
                .reacter(Some(*user))
                .react_to(Some(*article), "Like")
                .expect("react");
        }
    }

    c.bench_function("has_reacted_to", |b| {
        let reacter = kudos.reacter(Some(users[0]));
        b.iter(|| {
            for article in &articles {
                black_box(reacter.has_reacted_to(Some(*article), Some("Like")).expect("has"));
            }
        });
    });
}

criterion_group!(benches, bench_react_unreact, bench_recount, bench_has_reacted);
criterion_main!(benches);
