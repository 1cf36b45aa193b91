//! # Core Type Definitions
//!
//! This module contains all core types for the kudos reaction ledger:
//! - Identifiers (`ReactionTypeId`, `ReactantId`, `ReacterId`, `ReactionId`)
//! - Catalog and identity rows (`ReactionType`, `HostType`, `Reactant`, `Reacter`)
//! - Facts (`Reaction`, `ReactionKey`)
//! - Derived rows (`ReactionCounter`, `ReactionSummary`)
//! - Error types (`KudosError`)
//!
//! ## Ordering
//!
//! Every identifier implements `Ord` so tables can live in `BTreeMap`s and
//! redb keys with the same iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a reaction type in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReactionTypeId(pub u64);

/// Identifier of a reactant (a thing that can be reacted to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReactantId(pub u64);

/// Identifier of a reacter (a thing that can react).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReacterId(pub u64);

/// Identifier of a single reaction fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReactionId(pub u64);

impl fmt::Display for ReactantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// HOST TYPE
// =============================================================================

/// Tag naming the kind of host entity behind a reactant or reacter
/// (e.g. `"Article"`, `"Comment"`, `"User"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostType(pub String);

impl HostType {
    /// Create a new host type tag.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CATALOG & IDENTITIES
// =============================================================================

/// A named, weighted category of reaction.
///
/// Names are unique and case-sensitive. `mass` may be negative or zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionType {
    pub id: ReactionTypeId,
    pub name: String,
    pub mass: i64,
}

impl ReactionType {
    /// Create a new reaction type row.
    #[must_use]
    pub fn new(id: ReactionTypeId, name: impl Into<String>, mass: i64) -> Self {
        Self {
            id,
            name: name.into(),
            mass,
        }
    }
}

/// Aggregation root for a thing that can be reacted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactant {
    pub id: ReactantId,
    pub host_type: HostType,
}

/// Aggregation root for a thing that can react.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reacter {
    pub id: ReacterId,
    pub host_type: HostType,
}

/// Which side of a reaction an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityKind {
    Reactant,
    Reacter,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactant => f.write_str("reactant"),
            Self::Reacter => f.write_str("reacter"),
        }
    }
}

// =============================================================================
// REACTION
// =============================================================================

/// The uniqueness key of a reaction: at most one reaction exists per triple.
///
/// Field order matches the storage key order (reactant first) so that all
/// reactions of one reactant form a contiguous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReactionKey {
    pub reactant: ReactantId,
    pub reacter: ReacterId,
    pub reaction_type: ReactionTypeId,
}

impl ReactionKey {
    #[must_use]
    pub const fn new(
        reacter: ReacterId,
        reactant: ReactantId,
        reaction_type: ReactionTypeId,
    ) -> Self {
        Self {
            reactant,
            reacter,
            reaction_type,
        }
    }

    /// The key as a raw tuple, in storage order.
    #[must_use]
    pub const fn as_tuple(&self) -> (u64, u64, u64) {
        (self.reactant.0, self.reacter.0, self.reaction_type.0)
    }

    /// Rebuild a key from its raw storage tuple.
    #[must_use]
    pub const fn from_tuple((reactant, reacter, reaction_type): (u64, u64, u64)) -> Self {
        Self {
            reactant: ReactantId(reactant),
            reacter: ReacterId(reacter),
            reaction_type: ReactionTypeId(reaction_type),
        }
    }
}

/// One fact: a reacter reacted to a reactant with a reaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    pub key: ReactionKey,
}

impl Reaction {
    #[must_use]
    pub const fn new(id: ReactionId, key: ReactionKey) -> Self {
        Self { id, key }
    }

    #[must_use]
    pub const fn reacter(&self) -> ReacterId {
        self.key.reacter
    }

    #[must_use]
    pub const fn reactant(&self) -> ReactantId {
        self.key.reactant
    }

    #[must_use]
    pub const fn reaction_type(&self) -> ReactionTypeId {
        self.key.reaction_type
    }
}

// =============================================================================
// DERIVED ROWS
// =============================================================================

/// Cached number of live reactions of one type against one reactant.
///
/// Rows are sparse: an absent row means a count of zero, and a row is never
/// stored with `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounter {
    pub reactant: ReactantId,
    pub reaction_type: ReactionTypeId,
    pub count: u64,
}

/// Cached totals of all live reactions against one reactant.
///
/// `total_weight` is the sum of each live reaction's type mass as of the
/// moment it was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub reactant: ReactantId,
    pub total_count: u64,
    pub total_weight: i64,
}

impl ReactionSummary {
    /// The read-side value of a reactant with no summary row.
    #[must_use]
    pub const fn zero(reactant: ReactantId) -> Self {
        Self {
            reactant,
            total_count: 0,
            total_weight: 0,
        }
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.total_count == 0 && self.total_weight == 0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the kudos engine.
///
/// Storage failures carry the backend message unchanged. A failed write
/// never leaves a partially applied transaction behind.
#[derive(Debug, Error)]
pub enum KudosError {
    /// No reaction type with this exact name exists.
    #[error("Reaction type not found: {0}")]
    TypeNotFound(String),

    /// A recount scope names a host type with no known mapping.
    #[error("Unknown host entity type: {0}")]
    UnknownHostEntity(String),

    /// The target of a mutation has no registered identity.
    #[error("Missing {0} identity")]
    MissingIdentity(IdentityKind),

    /// A name or tag failed validation (empty, too long or duplicate).
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
