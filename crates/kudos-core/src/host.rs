//! # Host Type Resolution
//!
//! Maps the host-entity type names an operator types (in a recount filter,
//! for example) onto the tags reactants were registered with.
//!
//! A tag is known once at least one reactant has been registered under it,
//! or once the alias table names it.
//! An optional alias table lets hosts that register short tags (`"article"`)
//! also accept their long names (`"blog::Article"`), in either direction.

use crate::primitives::{MAX_HOST_TYPE_LENGTH, validate_name};
use crate::storage::ReadTables;
use crate::{HostType, KudosError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Alias table for host type tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostTypeMap {
    /// alias -> canonical
    aliases: BTreeMap<String, String>,
}

impl HostTypeMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style alias registration.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.insert_alias(alias, canonical);
        self
    }

    pub fn insert_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Whether `tag` appears in the table, as an alias or as a canonical name.
    fn is_configured(&self, tag: &str) -> bool {
        self.aliases.contains_key(tag) || self.aliases.values().any(|c| c == tag)
    }

    /// Every name equivalent to `tag`: its canonical name and every alias of
    /// that canonical name, `tag` included. Sorted, without duplicates.
    fn equivalents<'a>(&'a self, tag: &'a str) -> BTreeSet<&'a str> {
        let canonical = self.aliases.get(tag).map_or(tag, String::as_str);
        let mut names: BTreeSet<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
            .collect();
        names.insert(canonical);
        names.insert(tag);
        names
    }

    /// Resolve an operator-supplied name to every host type tag it covers.
    ///
    /// Reactants may be registered under an alias and under its canonical
    /// name at the same time, so the result lists all equivalent tags. A name
    /// present in the alias table resolves even before any reactant uses it.
    /// Fails with `KudosError::UnknownHostEntity` when the name is neither
    /// registered nor configured.
    pub fn resolve<R: ReadTables>(
        &self,
        tables: &R,
        tag: &str,
    ) -> Result<Vec<HostType>, KudosError> {
        if !self.is_configured(tag) {
            let known = tables.host_types()?;
            if !known.iter().any(|k| k.as_str() == tag) {
                return Err(KudosError::UnknownHostEntity(tag.to_string()));
            }
        }
        Ok(self.equivalents(tag).into_iter().map(HostType::new).collect())
    }
}

/// Validate a host type tag before it is registered.
pub fn validate_host_type(host_type: &HostType) -> Result<(), KudosError> {
    validate_name(host_type.as_str(), MAX_HOST_TYPE_LENGTH)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryLedger, Storage, WriteTables};

    fn ledger_with(tags: &[&str]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.write().expect("write");
        for tag in tags {
            tx.insert_reactant(&HostType::new(*tag)).expect("reactant");
        }
        tx.commit().expect("commit");
        ledger
    }

    #[test]
    fn registered_tag_resolves_to_itself() {
        let ledger = ledger_with(&["Article"]);
        let read = ledger.read().expect("read");
        let resolved = HostTypeMap::new().resolve(&read, "Article").expect("resolve");
        assert_eq!(resolved, vec![HostType::new("Article")]);
    }

    #[test]
    fn unknown_tag_fails() {
        let ledger = ledger_with(&["Article"]);
        let read = ledger.read().expect("read");
        let map = HostTypeMap::new().with_alias("article", "blog::Article");
        let result = map.resolve(&read, "NotExist");
        assert!(matches!(result, Err(KudosError::UnknownHostEntity(tag)) if tag == "NotExist"));
    }

    #[test]
    fn alias_and_canonical_cover_each_other() {
        let ledger = ledger_with(&["article"]);
        let read = ledger.read().expect("read");
        let map = HostTypeMap::new()
            .with_alias("article", "blog::Article")
            .with_alias("post", "blog::Article");
        let all = vec![
            HostType::new("article"),
            HostType::new("blog::Article"),
            HostType::new("post"),
        ];

        assert_eq!(map.resolve(&read, "article").expect("alias"), all);
        assert_eq!(map.resolve(&read, "blog::Article").expect("full name"), all);
        assert_eq!(map.resolve(&read, "post").expect("other alias"), all);
    }

    #[test]
    fn configured_names_resolve_without_reactants() {
        let ledger = MemoryLedger::new();
        let read = ledger.read().expect("read");
        let map = HostTypeMap::new().with_alias("article", "blog::Article");
        let expected = vec![HostType::new("article"), HostType::new("blog::Article")];

        assert_eq!(map.resolve(&read, "article").expect("alias"), expected);
        assert_eq!(map.resolve(&read, "blog::Article").expect("canonical"), expected);
    }

    #[test]
    fn tag_validation() {
        assert!(validate_host_type(&HostType::new("Article")).is_ok());
        assert!(validate_host_type(&HostType::new("")).is_err());
    }
}
