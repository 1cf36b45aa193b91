//! # Concurrency Tests
//!
//! Many writers against one reactant must never lose an increment.

use kudos_core::{Kudos, MemoryLedger, ReacterId, RecountScope, RedbLedger, Storage, WriteTables};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const WRITERS: usize = 8;
const ROUNDS: usize = 20;

fn hammer<S: Storage + Sync>(kudos: &Kudos<S>) {
    kudos.create_reaction_type("Like", 1).expect("like");
    kudos.create_reaction_type("Love", 3).expect("love");
    let reactant = kudos.register_reactant("Article").expect("article");
    let reacters: Vec<ReacterId> = (0..WRITERS)
        .map(|_| kudos.register_reacter("User").expect("user"))
        .collect();

    thread::scope(|scope| {
        for (i, reacter) in reacters.iter().enumerate() {
            scope.spawn(move || {
                let facade = kudos.reacter(Some(*reacter));
                for round in 0..ROUNDS {
                    facade.react_to(Some(reactant), "Like").expect("like");
                    facade.react_to(Some(reactant), "Love").expect("love");
                    // odd writers end up without their Love
                    if i % 2 == 1 || round + 1 < ROUNDS {
                        facade.unreact_to(Some(reactant), "Love").expect("unlove");
                    }
                }
            });
        }
    });

    let view = kudos.reactant(Some(reactant));
    let loves = WRITERS.div_ceil(2) as u64;
    assert_eq!(view.reactions_count("Like").expect("like"), WRITERS as u64);
    assert_eq!(view.reactions_count("Love").expect("love"), loves);
    assert_eq!(view.total_count().expect("count"), WRITERS as u64 + loves);
    assert_eq!(
        view.total_weight().expect("weight"),
        WRITERS as i64 + 3 * loves as i64
    );
    assert!(kudos.verify(&RecountScope::all()).expect("verify").is_clean());
}

#[test]
fn memory_writers_do_not_lose_updates() {
    hammer(&Kudos::new(MemoryLedger::new()));
}

#[test]
fn redb_writers_do_not_lose_updates() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = RedbLedger::open(dir.path().join("kudos.redb")).expect("open");
    hammer(&Kudos::new(ledger));
}

#[test]
fn readers_during_recount_never_see_a_gap() {
    let kudos = Kudos::new(MemoryLedger::new()).with_recount_batch_size(1);
    kudos.create_reaction_type("Like", 1).expect("like");
    let reacter = kudos.register_reacter("User").expect("user");
    let reactants: Vec<_> = (0..10)
        .map(|_| kudos.register_reactant("Article").expect("article"))
        .collect();
    for reactant in &reactants {
        kudos
            .reacter(Some(reacter))
            .react_to(Some(*reactant), "Like")
            .expect("like");
    }

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..5 {
                kudos.recount(&RecountScope::all()).expect("recount");
            }
        });
        scope.spawn(|| {
            for _ in 0..200 {
                for reactant in &reactants {
                    let count = kudos
                        .reactant(Some(*reactant))
                        .reactions_count("Like")
                        .expect("count");
                    assert_eq!(count, 1);
                }
            }
        });
    });
}

/// While one unit of work is open, a second `write` must wait for it.
fn writers_are_serialized<S: Storage + Sync>(storage: &S) {
    let opened = AtomicBool::new(false);
    let first = storage.write().expect("first write");

    let opened_early = thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            let second = storage.write().expect("second write");
            opened.store(true, Ordering::SeqCst);
            second.commit().expect("second commit");
        });
        thread::sleep(Duration::from_millis(100));
        let early = opened.load(Ordering::SeqCst);
        first.commit().expect("first commit");
        waiter.join().expect("waiter");
        early
    });

    assert!(!opened_early, "second writer overlapped the first");
    assert!(opened.load(Ordering::SeqCst));
}

#[test]
fn memory_writers_are_serialized() {
    writers_are_serialized(&MemoryLedger::new());
}

#[test]
fn redb_writers_are_serialized() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = RedbLedger::open(dir.path().join("kudos.redb")).expect("open");
    writers_are_serialized(&ledger);
}
