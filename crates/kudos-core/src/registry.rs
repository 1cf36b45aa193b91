//! # Reaction Type Registry
//!
//! The catalog of reaction kinds and their weights.
//!
//! Types are seeded once and rarely change. There is no rename, re-weight or
//! delete operation: removing a type while reactions reference it would
//! orphan those reactions, so the host must not do it behind the engine's back.

use crate::primitives::{MAX_TYPE_NAME_LENGTH, validate_name};
use crate::storage::{ReadTables, WriteTables};
use crate::{KudosError, Reaction, ReactionType};

/// Stateless operations over the reaction type catalog.
pub struct Registry;

impl Registry {
    /// Create a new reaction type.
    ///
    /// Fails with `KudosError::InvalidName` if the name is blank, too long,
    /// or already taken (names are case-sensitive).
    pub fn create<W: WriteTables>(
        tx: &mut W,
        name: &str,
        mass: i64,
    ) -> Result<ReactionType, KudosError> {
        validate_name(name, MAX_TYPE_NAME_LENGTH)?;
        if tx.reaction_type_by_name(name)?.is_some() {
            return Err(KudosError::InvalidName(format!(
                "reaction type '{}' already exists",
                name
            )));
        }
        tx.insert_reaction_type(name, mass)
    }

    /// Resolve a type by its exact name.
    ///
    /// Fails with `KudosError::TypeNotFound` when no such type exists.
    pub fn resolve_by_name<R: ReadTables>(
        tables: &R,
        name: &str,
    ) -> Result<ReactionType, KudosError> {
        tables
            .reaction_type_by_name(name)?
            .ok_or_else(|| KudosError::TypeNotFound(name.to_string()))
    }

    /// Resolve an optional name; `None` means "all types".
    pub fn resolve_optional<R: ReadTables>(
        tables: &R,
        name: Option<&str>,
    ) -> Result<Option<ReactionType>, KudosError> {
        name.map(|n| Self::resolve_by_name(tables, n)).transpose()
    }

    /// The numeric weight of a type.
    #[must_use]
    pub const fn weight_of(reaction_type: &ReactionType) -> i64 {
        reaction_type.mass
    }

    /// All types ordered by id.
    pub fn all<R: ReadTables>(tables: &R) -> Result<Vec<ReactionType>, KudosError> {
        tables.reaction_types()
    }

    /// Check whether a reaction is of the named type.
    ///
    /// An unknown name is an error, never a silent `false`.
    pub fn is_reaction_of_type<R: ReadTables>(
        tables: &R,
        reaction: &Reaction,
        name: &str,
    ) -> Result<bool, KudosError> {
        let reaction_type = Self::resolve_by_name(tables, name)?;
        Ok(reaction.reaction_type() == reaction_type.id)
    }

    /// Mass of a reaction's type, or zero if the type is missing from the
    /// catalog (a host-side deletion the engine does not support).
    pub fn mass_of_reaction<R: ReadTables>(
        tables: &R,
        reaction: &Reaction,
    ) -> Result<i64, KudosError> {
        Ok(tables
            .reaction_type(reaction.reaction_type())?
            .map_or(0, |t| Self::weight_of(&t)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryLedger, Storage};
    use crate::{ReactantId, ReacterId, ReactionId, ReactionKey};

    fn seeded() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.write().expect("write");
        Registry::create(&mut tx, "Like", 1).expect("like");
        Registry::create(&mut tx, "Dislike", -1).expect("dislike");
        tx.commit().expect("commit");
        ledger
    }

    #[test]
    fn resolve_existing_type() {
        let ledger = seeded();
        let read = ledger.read().expect("read");
        let like = Registry::resolve_by_name(&read, "Like").expect("resolve");
        assert_eq!(Registry::weight_of(&like), 1);
    }

    #[test]
    fn resolve_is_case_sensitive() {
        let ledger = seeded();
        let read = ledger.read().expect("read");
        let result = Registry::resolve_by_name(&read, "like");
        assert!(matches!(result, Err(KudosError::TypeNotFound(name)) if name == "like"));
    }

    #[test]
    fn duplicate_name_rejected() {
        let ledger = seeded();
        let mut tx = ledger.write().expect("write");
        let result = Registry::create(&mut tx, "Like", 5);
        assert!(matches!(result, Err(KudosError::InvalidName(_))));
    }

    #[test]
    fn zero_and_negative_mass_allowed() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.write().expect("write");
        let meh = Registry::create(&mut tx, "Meh", 0).expect("meh");
        let angry = Registry::create(&mut tx, "Angry", -3).expect("angry");
        assert_eq!(meh.mass, 0);
        assert_eq!(angry.mass, -3);
    }

    #[test]
    fn resolve_optional_none_means_all() {
        let ledger = seeded();
        let read = ledger.read().expect("read");
        assert!(Registry::resolve_optional(&read, None).expect("none").is_none());
        assert!(Registry::resolve_optional(&read, Some("Nope")).is_err());
    }

    #[test]
    fn reaction_type_check() {
        let ledger = seeded();
        let read = ledger.read().expect("read");
        let like = Registry::resolve_by_name(&read, "Like").expect("like");
        let reaction = Reaction::new(
            ReactionId(1),
            ReactionKey::new(ReacterId(1), ReactantId(1), like.id),
        );

        assert!(Registry::is_reaction_of_type(&read, &reaction, "Like").expect("check"));
        assert!(!Registry::is_reaction_of_type(&read, &reaction, "Dislike").expect("check"));
        assert!(matches!(
            Registry::is_reaction_of_type(&read, &reaction, "Unknown"),
            Err(KudosError::TypeNotFound(_))
        ));
    }
}
