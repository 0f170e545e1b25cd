use std::collections::{BTreeSet, HashMap};

use super::extract::ReferenceExtractor;

/// Query-local mapping from alias to canonical table name, both lower-cased.
///
/// An unaliased table maps to itself. Built per query and thrown away with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    aliases: HashMap<String, String>,
}

impl AliasMap {
    /// Record `alias` for `table`. A later insert for the same alias wins.
    pub fn insert(&mut self, alias: &str, table: &str) {
        self.aliases
            .insert(alias.to_lowercase(), table.to_lowercase());
    }

    /// Canonical table for an alias or table token, case-insensitively.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(&alias.to_lowercase()).map(String::as_str)
    }

    /// Distinct canonical tables in the map, sorted.
    pub fn tables(&self) -> BTreeSet<&str> {
        self.aliases.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Build the alias map for every FROM/JOIN table in `sql`.
pub fn alias_map_build(extractor: &impl ReferenceExtractor, sql: &str) -> AliasMap {
    let mut map = AliasMap::default();
    for table_ref in extractor.table_aliases(sql) {
        let alias = table_ref.alias.as_deref().unwrap_or(&table_ref.table);
        map.insert(alias, &table_ref.table);
    }
    map
}
