//! # Kudos Facade
//!
//! The engine entry point. [`Kudos`] owns a storage backend and hands out
//! two views:
//!
//! - [`ReacterFacade`]: react, unreact and "did I react" from the reacting side
//! - [`ReactantFacade`]: counts, weights and "was I reacted to" from the other
//!
//! A react or unreact runs as one unit of work: the fact, its counter row and
//! its summary row change together or not at all.
//!
//! ## Null identities
//!
//! Both views take an `Option` id. `None` stands for a host entity with no
//! registered identity (an anonymous caller, a record created before
//! registration). For a null reacter every mutation is a no-op and every
//! predicate answers `false`; for a null reactant every read answers zero.
//! Reaction type names are still resolved, so a misspelt name surfaces as
//! `TypeNotFound` whatever the identity.

use crate::counter::CounterAggregator;
use crate::host::{HostTypeMap, validate_host_type};
use crate::primitives::{DEFAULT_RECOUNT_BATCH_SIZE, MAX_RECOUNT_BATCH_SIZE};
use crate::recount::{RecountReport, RecountScope, Recounter};
use crate::registry::Registry;
use crate::storage::{ReadTables, Storage, TableSizes, WriteTables};
use crate::store::{AddOutcome, ReactionStore, RemoveOutcome};
use crate::summary::SummaryAggregator;
use crate::verify::{Auditor, DriftReport};
use crate::{
    HostType, IdentityKind, KudosError, ReactantId, ReacterId, Reaction, ReactionCounter,
    ReactionKey, ReactionSummary, ReactionType,
};
use std::collections::BTreeSet;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of [`ReacterFacade::react_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactOutcome {
    /// A new reaction was stored and the aggregates incremented.
    Reacted(Reaction),
    /// The reaction already existed; nothing changed.
    AlreadyReacted(Reaction),
    /// Null reacter; nothing changed.
    Skipped,
}

/// Result of [`ReacterFacade::unreact_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreactOutcome {
    /// The reaction was removed and the aggregates decremented.
    Unreacted(Reaction),
    /// There was no such reaction; nothing changed.
    NotReacted,
    /// Null reacter; nothing changed.
    Skipped,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The reaction engine over one storage backend.
#[derive(Debug)]
pub struct Kudos<S: Storage> {
    storage: S,
    hosts: HostTypeMap,
    recount_batch_size: usize,
}

impl<S: Storage> Kudos<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            hosts: HostTypeMap::new(),
            recount_batch_size: DEFAULT_RECOUNT_BATCH_SIZE,
        }
    }

    /// Use an alias table when resolving host types in recount filters.
    #[must_use]
    pub fn with_host_types(mut self, hosts: HostTypeMap) -> Self {
        self.hosts = hosts;
        self
    }

    /// Reactants per recount transaction, clamped to `1..=MAX_RECOUNT_BATCH_SIZE`.
    #[must_use]
    pub fn with_recount_batch_size(mut self, batch_size: usize) -> Self {
        self.recount_batch_size = batch_size.clamp(1, MAX_RECOUNT_BATCH_SIZE);
        self
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give back the backend, e.g. to persist a memory snapshot.
    pub fn into_storage(self) -> S {
        self.storage
    }

    #[must_use]
    pub fn host_types(&self) -> &HostTypeMap {
        &self.hosts
    }

    #[must_use]
    pub fn recount_batch_size(&self) -> usize {
        self.recount_batch_size
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Add a reaction type to the catalog.
    pub fn create_reaction_type(&self, name: &str, mass: i64) -> Result<ReactionType, KudosError> {
        let mut tx = self.storage.write()?;
        let reaction_type = Registry::create(&mut tx, name, mass)?;
        tx.commit()?;
        tracing::info!(id = reaction_type.id.0, name, mass, "reaction type created");
        Ok(reaction_type)
    }

    /// Resolve a reaction type by name.
    pub fn reaction_type(&self, name: &str) -> Result<ReactionType, KudosError> {
        let read = self.storage.read()?;
        Registry::resolve_by_name(&read, name)
    }

    pub fn reaction_types(&self) -> Result<Vec<ReactionType>, KudosError> {
        let read = self.storage.read()?;
        Registry::all(&read)
    }

    pub fn is_reaction_of_type(&self, reaction: &Reaction, name: &str) -> Result<bool, KudosError> {
        let read = self.storage.read()?;
        Registry::is_reaction_of_type(&read, reaction, name)
    }

    pub fn is_reaction_not_of_type(
        &self,
        reaction: &Reaction,
        name: &str,
    ) -> Result<bool, KudosError> {
        self.is_reaction_of_type(reaction, name).map(|is| !is)
    }

    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    /// Obtain a reactant identity for a newly persisted host entity.
    pub fn register_reactant(&self, host_type: &str) -> Result<ReactantId, KudosError> {
        let host_type = HostType::new(host_type);
        validate_host_type(&host_type)?;
        let mut tx = self.storage.write()?;
        let reactant = tx.insert_reactant(&host_type)?;
        tx.commit()?;
        tracing::debug!(id = reactant.id.0, host_type = %host_type, "reactant registered");
        Ok(reactant.id)
    }

    /// Obtain a reacter identity for a newly persisted host entity.
    pub fn register_reacter(&self, host_type: &str) -> Result<ReacterId, KudosError> {
        let host_type = HostType::new(host_type);
        validate_host_type(&host_type)?;
        let mut tx = self.storage.write()?;
        let reacter = tx.insert_reacter(&host_type)?;
        tx.commit()?;
        tracing::debug!(id = reacter.id.0, host_type = %host_type, "reacter registered");
        Ok(reacter.id)
    }

    /// The reacting side of a host entity; `None` gives the null reacter.
    #[must_use]
    pub fn reacter(&self, id: Option<ReacterId>) -> ReacterFacade<'_, S> {
        ReacterFacade { kudos: self, id }
    }

    /// The reacted-to side of a host entity; `None` gives the null reactant.
    #[must_use]
    pub fn reactant(&self, id: Option<ReactantId>) -> ReactantFacade<'_, S> {
        ReactantFacade { kudos: self, id }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Reactants a reacter has reacted to, optionally narrowed to one
    /// reaction type and one host type. Ordered by id, without duplicates.
    pub fn reactants_reacted_by(
        &self,
        reacter: Option<ReacterId>,
        type_name: Option<&str>,
        host_type: Option<&str>,
    ) -> Result<Vec<ReactantId>, KudosError> {
        let read = self.storage.read()?;
        let reaction_type = Registry::resolve_optional(&read, type_name)?;
        let host_types = host_type
            .map(|tag| self.hosts.resolve(&read, tag))
            .transpose()?;
        let Some(reacter) = reacter else {
            return Ok(Vec::new());
        };

        let mut reactants = BTreeSet::new();
        for reaction in read.reactions_by_reacter(reacter)? {
            if reaction_type
                .as_ref()
                .is_some_and(|t| t.id != reaction.reaction_type())
            {
                continue;
            }
            if let Some(hosts) = &host_types {
                let matches = read
                    .reactant(reaction.reactant())?
                    .is_some_and(|r| hosts.contains(&r.host_type));
                if !matches {
                    continue;
                }
            }
            reactants.insert(reaction.reactant());
        }
        Ok(reactants.into_iter().collect())
    }

    pub fn table_sizes(&self) -> Result<TableSizes, KudosError> {
        self.storage.read()?.table_sizes()
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Rebuild cached counters and summaries in `scope` from the Reaction Store.
    pub fn recount(&self, scope: &RecountScope) -> Result<RecountReport, KudosError> {
        Recounter::run(&self.storage, &self.hosts, scope, self.recount_batch_size)
    }

    /// Compare cached rows in `scope` against the Reaction Store without writing.
    pub fn verify(&self, scope: &RecountScope) -> Result<DriftReport, KudosError> {
        Auditor::run(&self.storage, &self.hosts, scope, self.recount_batch_size)
    }
}

// =============================================================================
// REACTER FACADE
// =============================================================================

/// Reacter-side operations.
#[derive(Debug)]
pub struct ReacterFacade<'a, S: Storage> {
    kudos: &'a Kudos<S>,
    id: Option<ReacterId>,
}

impl<S: Storage> ReacterFacade<'_, S> {
    #[must_use]
    pub fn id(&self) -> Option<ReacterId> {
        self.id
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    /// React to a reactant with the named type.
    ///
    /// Fails with `TypeNotFound` for an unknown type and with
    /// `MissingIdentity` when the reactant (or a given reacter id) is not
    /// registered. Reacting twice with the same type changes nothing.
    pub fn react_to(
        &self,
        reactant: Option<ReactantId>,
        type_name: &str,
    ) -> Result<ReactOutcome, KudosError> {
        let Some(reacter) = self.id else {
            self.resolve_type(type_name)?;
            return Ok(ReactOutcome::Skipped);
        };

        let mut tx = self.kudos.storage.write()?;
        let reaction_type = Registry::resolve_by_name(&tx, type_name)?;
        let key = checked_key(&tx, reacter, reactant, &reaction_type)?;

        match ReactionStore::add(&mut tx, key)? {
            AddOutcome::Existing(reaction) => {
                tracing::debug!(
                    reacter = reacter.0,
                    reactant = key.reactant.0,
                    reaction_type = type_name,
                    "already reacted"
                );
                Ok(ReactOutcome::AlreadyReacted(reaction))
            }
            AddOutcome::Created(reaction) => {
                CounterAggregator::on_created(&mut tx, &key)?;
                SummaryAggregator::on_created(
                    &mut tx,
                    key.reactant,
                    Registry::weight_of(&reaction_type),
                )?;
                tx.commit()?;
                tracing::debug!(
                    reacter = reacter.0,
                    reactant = key.reactant.0,
                    reaction_type = type_name,
                    "reacted"
                );
                Ok(ReactOutcome::Reacted(reaction))
            }
        }
    }

    /// Remove this reacter's reaction of the named type, if any.
    ///
    /// The summary weight is reduced by the type's current mass.
    pub fn unreact_to(
        &self,
        reactant: Option<ReactantId>,
        type_name: &str,
    ) -> Result<UnreactOutcome, KudosError> {
        let Some(reacter) = self.id else {
            self.resolve_type(type_name)?;
            return Ok(UnreactOutcome::Skipped);
        };

        let mut tx = self.kudos.storage.write()?;
        let reaction_type = Registry::resolve_by_name(&tx, type_name)?;
        let key = checked_key(&tx, reacter, reactant, &reaction_type)?;

        match ReactionStore::remove(&mut tx, &key)? {
            RemoveOutcome::NotFound => {
                tracing::debug!(
                    reacter = reacter.0,
                    reactant = key.reactant.0,
                    reaction_type = type_name,
                    "nothing to unreact"
                );
                Ok(UnreactOutcome::NotReacted)
            }
            RemoveOutcome::Removed(reaction) => {
                CounterAggregator::on_removed(&mut tx, &key)?;
                let mass = Registry::mass_of_reaction(&tx, &reaction)?;
                SummaryAggregator::on_removed(&mut tx, key.reactant, mass)?;
                tx.commit()?;
                tracing::debug!(
                    reacter = reacter.0,
                    reactant = key.reactant.0,
                    reaction_type = type_name,
                    "unreacted"
                );
                Ok(UnreactOutcome::Unreacted(reaction))
            }
        }
    }

    /// Whether this reacter holds a reaction to the reactant, optionally of
    /// the named type. Always read from the Reaction Store.
    pub fn has_reacted_to(
        &self,
        reactant: Option<ReactantId>,
        type_name: Option<&str>,
    ) -> Result<bool, KudosError> {
        let read = self.kudos.storage.read()?;
        let reaction_type = Registry::resolve_optional(&read, type_name)?;
        let (Some(reacter), Some(reactant)) = (self.id, reactant) else {
            return Ok(false);
        };
        ReactionStore::exists_for(&read, reacter, reactant, reaction_type.map(|t| t.id))
    }

    pub fn has_not_reacted_to(
        &self,
        reactant: Option<ReactantId>,
        type_name: Option<&str>,
    ) -> Result<bool, KudosError> {
        self.has_reacted_to(reactant, type_name).map(|has| !has)
    }

    /// Every live reaction issued by this reacter.
    pub fn reactions(&self) -> Result<Vec<Reaction>, KudosError> {
        let Some(reacter) = self.id else {
            return Ok(Vec::new());
        };
        self.kudos.storage.read()?.reactions_by_reacter(reacter)
    }

    fn resolve_type(&self, type_name: &str) -> Result<ReactionType, KudosError> {
        let read = self.kudos.storage.read()?;
        Registry::resolve_by_name(&read, type_name)
    }
}

/// Build the key for a mutation after checking both identities exist.
fn checked_key<R: ReadTables>(
    tables: &R,
    reacter: ReacterId,
    reactant: Option<ReactantId>,
    reaction_type: &ReactionType,
) -> Result<ReactionKey, KudosError> {
    if tables.reacter(reacter)?.is_none() {
        return Err(KudosError::MissingIdentity(IdentityKind::Reacter));
    }
    let reactant = reactant.ok_or(KudosError::MissingIdentity(IdentityKind::Reactant))?;
    if tables.reactant(reactant)?.is_none() {
        return Err(KudosError::MissingIdentity(IdentityKind::Reactant));
    }
    Ok(ReactionKey::new(reacter, reactant, reaction_type.id))
}

// =============================================================================
// REACTANT FACADE
// =============================================================================

/// Reactant-side operations.
#[derive(Debug)]
pub struct ReactantFacade<'a, S: Storage> {
    kudos: &'a Kudos<S>,
    id: Option<ReactantId>,
}

impl<S: Storage> ReactantFacade<'_, S> {
    #[must_use]
    pub fn id(&self) -> Option<ReactantId> {
        self.id
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    /// Mirror of [`ReacterFacade::has_reacted_to`].
    pub fn is_reacted_by(
        &self,
        reacter: Option<ReacterId>,
        type_name: Option<&str>,
    ) -> Result<bool, KudosError> {
        self.kudos.reacter(reacter).has_reacted_to(self.id, type_name)
    }

    pub fn is_not_reacted_by(
        &self,
        reacter: Option<ReacterId>,
        type_name: Option<&str>,
    ) -> Result<bool, KudosError> {
        self.is_reacted_by(reacter, type_name).map(|is| !is)
    }

    /// Cached count of reactions of the named type.
    pub fn reactions_count(&self, type_name: &str) -> Result<u64, KudosError> {
        let read = self.kudos.storage.read()?;
        let reaction_type = Registry::resolve_by_name(&read, type_name)?;
        match self.id {
            Some(reactant) => CounterAggregator::count_of(&read, reactant, reaction_type.id),
            None => Ok(0),
        }
    }

    /// Weight of reactions of the named type: live count times current mass.
    ///
    /// Per-type weight is not cached, so this reads the Reaction Store.
    pub fn reactions_weight(&self, type_name: &str) -> Result<i64, KudosError> {
        let read = self.kudos.storage.read()?;
        let reaction_type = Registry::resolve_by_name(&read, type_name)?;
        match self.id {
            Some(reactant) => ReactionStore::weight_for(&read, reactant, Some(reaction_type.id)),
            None => Ok(0),
        }
    }

    /// Cached count of reactions of every type.
    pub fn total_count(&self) -> Result<u64, KudosError> {
        Ok(self.summary()?.map_or(0, |s| s.total_count))
    }

    /// Cached sum of reaction masses across every type.
    pub fn total_weight(&self) -> Result<i64, KudosError> {
        Ok(self.summary()?.map_or(0, |s| s.total_weight))
    }

    /// Cached summary; the zero summary when no row exists, `None` for the
    /// null reactant.
    pub fn summary(&self) -> Result<Option<ReactionSummary>, KudosError> {
        let Some(reactant) = self.id else {
            return Ok(None);
        };
        let read = self.kudos.storage.read()?;
        SummaryAggregator::summary_of(&read, reactant).map(Some)
    }

    /// Cached counter rows, ordered by type id.
    pub fn counters(&self) -> Result<Vec<ReactionCounter>, KudosError> {
        let Some(reactant) = self.id else {
            return Ok(Vec::new());
        };
        self.kudos.storage.read()?.counters_of(reactant)
    }

    /// Every live reaction received.
    pub fn reactions(&self) -> Result<Vec<Reaction>, KudosError> {
        let Some(reactant) = self.id else {
            return Ok(Vec::new());
        };
        self.kudos.storage.read()?.reactions_of_reactant(reactant)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedger;

    struct Fixture {
        kudos: Kudos<MemoryLedger>,
        alice: ReacterId,
        bob: ReacterId,
        post: ReactantId,
    }

    fn fixture() -> Fixture {
        let kudos = Kudos::new(MemoryLedger::new());
        kudos.create_reaction_type("Like", 1).expect("like");
        kudos.create_reaction_type("Dislike", -1).expect("dislike");
        let alice = kudos.register_reacter("User").expect("alice");
        let bob = kudos.register_reacter("User").expect("bob");
        let post = kudos.register_reactant("Article").expect("post");
        Fixture {
            kudos,
            alice,
            bob,
            post,
        }
    }

    #[test]
    fn like_dislike_scenario() {
        let f = fixture();
        let x = f.kudos.reactant(Some(f.post));

        f.kudos
            .reacter(Some(f.alice))
            .react_to(Some(f.post), "Like")
            .expect("like");
        f.kudos
            .reacter(Some(f.bob))
            .react_to(Some(f.post), "Dislike")
            .expect("dislike");

        assert_eq!(x.reactions_count("Like").expect("count"), 1);
        assert_eq!(x.reactions_count("Dislike").expect("count"), 1);
        assert_eq!(x.total_count().expect("total"), 2);
        assert_eq!(x.total_weight().expect("weight"), 0);

        f.kudos
            .reacter(Some(f.alice))
            .unreact_to(Some(f.post), "Like")
            .expect("unlike");

        assert_eq!(x.reactions_count("Like").expect("count"), 0);
        assert_eq!(x.total_count().expect("total"), 1);
        assert_eq!(x.total_weight().expect("weight"), -1);
        assert_eq!(x.counters().expect("counters").len(), 1);
    }

    #[test]
    fn react_twice_is_noop() {
        let f = fixture();
        let alice = f.kudos.reacter(Some(f.alice));

        let first = alice.react_to(Some(f.post), "Like").expect("react");
        let second = alice.react_to(Some(f.post), "Like").expect("react");

        assert!(matches!(first, ReactOutcome::Reacted(_)));
        assert!(matches!(second, ReactOutcome::AlreadyReacted(_)));
        assert_eq!(f.kudos.reactant(Some(f.post)).total_count().expect("total"), 1);
    }

    #[test]
    fn unreact_without_reaction_is_noop() {
        let f = fixture();
        let outcome = f
            .kudos
            .reacter(Some(f.alice))
            .unreact_to(Some(f.post), "Like")
            .expect("unreact");
        assert_eq!(outcome, UnreactOutcome::NotReacted);
        assert_eq!(
            f.kudos.table_sizes().expect("sizes"),
            TableSizes {
                reaction_types: 2,
                reactants: 1,
                reacters: 2,
                ..TableSizes::default()
            }
        );
    }

    #[test]
    fn unknown_type_fails() {
        let f = fixture();
        let alice = f.kudos.reacter(Some(f.alice));
        assert!(matches!(
            alice.react_to(Some(f.post), "NotExist"),
            Err(KudosError::TypeNotFound(_))
        ));
        assert!(matches!(
            alice.has_reacted_to(Some(f.post), Some("NotExist")),
            Err(KudosError::TypeNotFound(_))
        ));
        assert!(matches!(
            f.kudos.reactant(Some(f.post)).reactions_count("NotExist"),
            Err(KudosError::TypeNotFound(_))
        ));
    }

    #[test]
    fn react_to_missing_reactant_fails() {
        let f = fixture();
        let alice = f.kudos.reacter(Some(f.alice));
        assert!(matches!(
            alice.react_to(None, "Like"),
            Err(KudosError::MissingIdentity(IdentityKind::Reactant))
        ));
        assert!(matches!(
            alice.react_to(Some(ReactantId(99)), "Like"),
            Err(KudosError::MissingIdentity(IdentityKind::Reactant))
        ));
        assert!(matches!(
            f.kudos.reacter(Some(ReacterId(99))).react_to(Some(f.post), "Like"),
            Err(KudosError::MissingIdentity(IdentityKind::Reacter))
        ));
    }

    #[test]
    fn null_reacter_is_inert() {
        let f = fixture();
        let anonymous = f.kudos.reacter(None);

        assert!(anonymous.is_null());
        assert_eq!(
            anonymous.react_to(Some(f.post), "Like").expect("react"),
            ReactOutcome::Skipped
        );
        assert_eq!(
            anonymous.unreact_to(Some(f.post), "Like").expect("unreact"),
            UnreactOutcome::Skipped
        );
        assert!(!anonymous.has_reacted_to(Some(f.post), None).expect("has"));
        assert!(anonymous.has_not_reacted_to(Some(f.post), Some("Like")).expect("has not"));
        assert!(anonymous.reactions().expect("reactions").is_empty());
        assert_eq!(f.kudos.table_sizes().expect("sizes").reactions, 0);
    }

    #[test]
    fn null_reactant_reads_zero() {
        let f = fixture();
        let nothing = f.kudos.reactant(None);

        assert_eq!(nothing.reactions_count("Like").expect("count"), 0);
        assert_eq!(nothing.reactions_weight("Like").expect("weight"), 0);
        assert_eq!(nothing.total_count().expect("total"), 0);
        assert_eq!(nothing.total_weight().expect("weight"), 0);
        assert!(nothing.summary().expect("summary").is_none());
        assert!(!nothing.is_reacted_by(Some(f.alice), None).expect("reacted"));
        assert!(
            !f.kudos
                .reacter(Some(f.alice))
                .has_reacted_to(None, None)
                .expect("has")
        );
    }

    #[test]
    fn registered_reactant_without_rows_has_zero_summary() {
        let f = fixture();
        let summary = f
            .kudos
            .reactant(Some(f.post))
            .summary()
            .expect("summary")
            .expect("registered");
        assert!(summary.is_zero());
    }

    #[test]
    fn weight_per_type_from_facts() {
        let f = fixture();
        let love = f.kudos.create_reaction_type("Love", 5).expect("love");
        for reacter in [f.alice, f.bob] {
            f.kudos
                .reacter(Some(reacter))
                .react_to(Some(f.post), &love.name)
                .expect("love");
        }
        let x = f.kudos.reactant(Some(f.post));
        assert_eq!(x.reactions_weight("Love").expect("weight"), 10);
        assert_eq!(x.reactions_weight("Like").expect("weight"), 0);
    }

    #[test]
    fn reacted_by_both_sides() {
        let f = fixture();
        f.kudos
            .reacter(Some(f.alice))
            .react_to(Some(f.post), "Like")
            .expect("like");

        let alice = f.kudos.reacter(Some(f.alice));
        let post = f.kudos.reactant(Some(f.post));
        assert!(alice.has_reacted_to(Some(f.post), None).expect("any"));
        assert!(alice.has_reacted_to(Some(f.post), Some("Like")).expect("like"));
        assert!(alice.has_not_reacted_to(Some(f.post), Some("Dislike")).expect("dislike"));
        assert!(post.is_reacted_by(Some(f.alice), Some("Like")).expect("like"));
        assert!(post.is_not_reacted_by(Some(f.bob), None).expect("bob"));
    }

    #[test]
    fn multiple_types_from_one_reacter() {
        let f = fixture();
        let alice = f.kudos.reacter(Some(f.alice));
        alice.react_to(Some(f.post), "Like").expect("like");
        alice.react_to(Some(f.post), "Dislike").expect("dislike");

        assert_eq!(alice.reactions().expect("reactions").len(), 2);
        let x = f.kudos.reactant(Some(f.post));
        assert_eq!(x.total_count().expect("total"), 2);
        assert_eq!(x.reactions().expect("reactions").len(), 2);
    }

    #[test]
    fn reactants_reacted_by_filters() {
        let f = fixture();
        let comment = f.kudos.register_reactant("Comment").expect("comment");
        let alice = f.kudos.reacter(Some(f.alice));
        alice.react_to(Some(f.post), "Like").expect("like post");
        alice.react_to(Some(comment), "Dislike").expect("dislike comment");
        alice.react_to(Some(comment), "Like").expect("like comment");

        assert_eq!(
            f.kudos
                .reactants_reacted_by(Some(f.alice), None, None)
                .expect("all"),
            vec![f.post, comment]
        );
        assert_eq!(
            f.kudos
                .reactants_reacted_by(Some(f.alice), Some("Dislike"), None)
                .expect("dislike"),
            vec![comment]
        );
        assert_eq!(
            f.kudos
                .reactants_reacted_by(Some(f.alice), Some("Like"), Some("Article"))
                .expect("article"),
            vec![f.post]
        );
        assert!(
            f.kudos
                .reactants_reacted_by(None, None, None)
                .expect("null")
                .is_empty()
        );
    }

    #[test]
    fn reaction_type_checks() {
        let f = fixture();
        let alice = f.kudos.reacter(Some(f.alice));
        alice.react_to(Some(f.post), "Like").expect("like");
        let reactions = alice.reactions().expect("reactions");
        let reaction = reactions.first().expect("one reaction");

        assert!(f.kudos.is_reaction_of_type(reaction, "Like").expect("like"));
        assert!(f.kudos.is_reaction_not_of_type(reaction, "Dislike").expect("dislike"));
        assert!(f.kudos.is_reaction_of_type(reaction, "Nope").is_err());
    }

    #[test]
    fn blank_host_type_rejected() {
        let f = fixture();
        assert!(matches!(
            f.kudos.register_reactant(" "),
            Err(KudosError::InvalidName(_))
        ));
    }

    #[test]
    fn batch_size_is_clamped() {
        let kudos = Kudos::new(MemoryLedger::new()).with_recount_batch_size(0);
        assert_eq!(kudos.recount_batch_size(), 1);
        let kudos = kudos.with_recount_batch_size(usize::MAX);
        assert_eq!(kudos.recount_batch_size(), MAX_RECOUNT_BATCH_SIZE);
    }
}
