#![deny(unsafe_code)]

use std::path::Path;

use crate::csv::for_each_row;
use crate::error::{Result, StandardsError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CodeSystemRow {
    pub name: String,
    pub oid: String,
    pub aliases: Vec<String>,
}

pub fn parse_code_systems_csv(path: &Path) -> Result<Vec<CodeSystemRow>> {
    let mut results = Vec::new();
    for_each_row(path, |get| {
        let name = get("Name").ok_or_else(|| StandardsError::csv(path, "missing Name"))?;
        let oid = get("OID")
            .ok_or_else(|| StandardsError::csv(path, format!("missing OID for {name}")))?;
        let aliases = get("Aliases")
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        results.push(CodeSystemRow { name, oid, aliases });
        Ok(())
    })?;
    Ok(results)
}
