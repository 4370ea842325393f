//! CSV readers for the files listed in `manifest.toml`.

pub mod code_systems;
pub mod datatypes;

use std::path::Path;

use crate::error::{Result, StandardsError};

/// Read a CSV file and hand each row to `visit` with a header-name lookup.
pub(crate) fn for_each_row<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&dyn Fn(&str) -> Option<String>) -> Result<()>,
{
    let bytes = std::fs::read(path).map_err(|e| StandardsError::io(path, e))?;

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| StandardsError::csv(path, e.to_string()))?
        .clone();

    for row in reader.records() {
        let row = row.map_err(|e| StandardsError::csv(path, e.to_string()))?;

        let get = |name: &str| -> Option<String> {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        visit(&get)?;
    }
    Ok(())
}
