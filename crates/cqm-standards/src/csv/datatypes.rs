#![deny(unsafe_code)]

use std::path::Path;

use crate::csv::for_each_row;
use crate::error::{Result, StandardsError};

/// Which half of a split interval a row maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DatatypeRow {
    pub datatype: String,
    pub category: String,
    pub status: Option<String>,
    pub attribute: Option<String>,
    pub record_attribute: Option<String>,
    pub bound: Option<Bound>,
}

/// Rows come back in file order; attribute declaration order matters.
pub fn parse_datatypes_csv(path: &Path) -> Result<Vec<DatatypeRow>> {
    let mut results = Vec::new();
    for_each_row(path, |get| {
        let datatype =
            get("Datatype").ok_or_else(|| StandardsError::csv(path, "missing Datatype"))?;
        let category = get("Category").ok_or_else(|| {
            StandardsError::csv(path, format!("missing Category for {datatype}"))
        })?;
        let bound = match get("Bound").as_deref() {
            None => None,
            Some("low") => Some(Bound::Low),
            Some("high") => Some(Bound::High),
            Some(other) => {
                return Err(StandardsError::csv(
                    path,
                    format!("invalid Bound '{other}' for {datatype}"),
                ));
            }
        };
        let attribute = get("Attribute");
        let record_attribute = get("Record Attribute");
        if bound.is_some() && (attribute.is_none() || record_attribute.is_none()) {
            return Err(StandardsError::csv(
                path,
                format!("bounded row for {datatype} needs Attribute and Record Attribute"),
            ));
        }
        results.push(DatatypeRow {
            datatype,
            category,
            status: get("Status"),
            attribute,
            record_attribute,
            bound,
        });
        Ok(())
    })?;
    Ok(results)
}
