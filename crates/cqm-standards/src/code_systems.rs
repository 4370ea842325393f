//! Code-system name ↔ OID lookup.

use std::collections::BTreeMap;
use std::path::Path;

use crate::csv::code_systems::CodeSystemRow;
use crate::error::{Result, StandardsError};

/// Bidirectional lookup between code-system names and OIDs.
///
/// Canonical names and OIDs are one-to-one. Aliases only resolve in the
/// name → OID direction. Lookups are exact and case-sensitive; a miss is an
/// ordinary `None` and the caller decides how loud to be about it.
#[derive(Debug, Clone, Default)]
pub struct CodeSystemOidTable {
    oid_by_name: BTreeMap<String, String>,
    name_by_oid: BTreeMap<String, String>,
    oid_by_alias: BTreeMap<String, String>,
}

impl CodeSystemOidTable {
    pub fn from_rows(rows: &[CodeSystemRow], source: &Path) -> Result<Self> {
        let mut table = Self::default();
        for row in rows {
            if table.oid_by_name.contains_key(&row.name) {
                return Err(StandardsError::csv(
                    source,
                    format!("duplicate code system name {}", row.name),
                ));
            }
            if let Some(existing) = table.name_by_oid.get(&row.oid) {
                return Err(StandardsError::csv(
                    source,
                    format!(
                        "OID {} is shared by {} and {}",
                        row.oid, existing, row.name
                    ),
                ));
            }
            table.oid_by_name.insert(row.name.clone(), row.oid.clone());
            table.name_by_oid.insert(row.oid.clone(), row.name.clone());
        }
        for row in rows {
            for alias in &row.aliases {
                if table.oid_by_name.contains_key(alias) || table.oid_by_alias.contains_key(alias)
                {
                    return Err(StandardsError::csv(
                        source,
                        format!("alias {alias} of {} is already taken", row.name),
                    ));
                }
                table.oid_by_alias.insert(alias.clone(), row.oid.clone());
            }
        }
        Ok(table)
    }

    /// Build from canonical `(name, oid)` pairs with no aliases.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = Self::default();
        for (name, oid) in pairs {
            table.oid_by_name.insert(name.to_string(), oid.to_string());
            table.name_by_oid.insert(oid.to_string(), name.to_string());
        }
        table
    }

    pub fn oid_for(&self, name: &str) -> Option<&str> {
        self.oid_by_name
            .get(name)
            .or_else(|| self.oid_by_alias.get(name))
            .map(String::as_str)
    }

    pub fn name_for(&self, oid: &str) -> Option<&str> {
        self.name_by_oid.get(oid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.oid_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oid_by_name.is_empty()
    }

    /// Canonical `(name, oid)` pairs sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.oid_by_name
            .iter()
            .map(|(name, oid)| (name.as_str(), oid.as_str()))
    }

    /// Aliases registered for an OID.
    pub fn aliases_of<'a>(&'a self, oid: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.oid_by_alias
            .iter()
            .filter(move |(_, target)| target.as_str() == oid)
            .map(|(alias, _)| alias.as_str())
    }
}
