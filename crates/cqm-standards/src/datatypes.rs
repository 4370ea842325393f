//! Declarative per-datatype attribute rules.
//!
//! Each event datatype lists the attributes it declares and, where a record
//! counterpart exists, the record attribute it maps to. Rows carrying a bound
//! map one half of an interval attribute.

use std::collections::BTreeMap;
use std::path::Path;

use cqm_model::EventCategory;

pub use crate::csv::datatypes::Bound;
use crate::csv::datatypes::DatatypeRow;
use crate::error::{Result, StandardsError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttributeRule {
    pub attribute: String,
    pub record_attribute: Option<String>,
    pub bound: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DatatypeDefinition {
    pub name: String,
    pub category: EventCategory,
    pub status: Option<String>,
    pub rules: Vec<AttributeRule>,
}

impl DatatypeDefinition {
    pub fn new(name: impl Into<String>, category: EventCategory) -> Self {
        Self {
            name: name.into(),
            category,
            status: None,
            rules: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_rule(
        mut self,
        attribute: &str,
        record_attribute: Option<&str>,
        bound: Option<Bound>,
    ) -> Self {
        self.rules.push(AttributeRule {
            attribute: attribute.to_string(),
            record_attribute: record_attribute.map(str::to_string),
            bound,
        });
        self
    }

    /// Declared attribute names, first declaration order, without repeats.
    pub fn declared_attributes(&self) -> Vec<String> {
        let mut declared: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !declared.contains(&rule.attribute) {
                declared.push(rule.attribute.clone());
            }
        }
        declared
    }
}

/// All datatype definitions of one QDM version.
#[derive(Debug, Clone, Default)]
pub struct DatatypeDefinitions {
    pub qdm_version: String,
    types: BTreeMap<String, DatatypeDefinition>,
}

impl DatatypeDefinitions {
    pub fn new(qdm_version: impl Into<String>, definitions: Vec<DatatypeDefinition>) -> Self {
        Self {
            qdm_version: qdm_version.into(),
            types: definitions
                .into_iter()
                .map(|definition| (definition.name.clone(), definition))
                .collect(),
        }
    }

    pub fn from_rows(rows: Vec<DatatypeRow>, qdm_version: &str, source: &Path) -> Result<Self> {
        let mut types: BTreeMap<String, DatatypeDefinition> = BTreeMap::new();
        for row in rows {
            let category: EventCategory =
                row.category
                    .parse()
                    .map_err(|_| StandardsError::UnknownCategory {
                        path: source.to_path_buf(),
                        datatype: row.datatype.clone(),
                        category: row.category.clone(),
                    })?;
            let definition = types
                .entry(row.datatype.clone())
                .or_insert_with(|| DatatypeDefinition {
                    name: row.datatype.clone(),
                    category,
                    status: row.status.clone(),
                    rules: Vec::new(),
                });
            if definition.category != category || definition.status != row.status {
                return Err(StandardsError::csv(
                    source,
                    format!("conflicting category or status rows for {}", row.datatype),
                ));
            }
            if let Some(attribute) = row.attribute {
                definition.rules.push(AttributeRule {
                    attribute,
                    record_attribute: row.record_attribute,
                    bound: row.bound,
                });
            }
        }
        Ok(Self {
            qdm_version: qdm_version.to_string(),
            types,
        })
    }

    pub fn get(&self, name: &str) -> Option<&DatatypeDefinition> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatatypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.types.values().map(|d| d.rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(datatype: &str, category: &str, attribute: Option<&str>) -> DatatypeRow {
        DatatypeRow {
            datatype: datatype.to_string(),
            category: category.to_string(),
            status: None,
            attribute: attribute.map(str::to_string),
            record_attribute: attribute.map(str::to_string),
            bound: None,
        }
    }

    #[test]
    fn attributeless_types_are_kept() {
        let rows = vec![row("PatientCharacteristicSex", "patient_characteristic", None)];
        let defs = DatatypeDefinitions::from_rows(rows, "5.3", Path::new("d.csv")).unwrap();
        let sex = defs.get("PatientCharacteristicSex").unwrap();
        assert!(sex.rules.is_empty());
        assert_eq!(sex.category, EventCategory::PatientCharacteristic);
    }

    #[test]
    fn unknown_category_names_the_datatype() {
        let rows = vec![row("Imaging", "imaging", None)];
        let err = DatatypeDefinitions::from_rows(rows, "5.3", Path::new("d.csv")).unwrap_err();
        assert!(matches!(
            err,
            StandardsError::UnknownCategory { ref datatype, .. } if datatype == "Imaging"
        ));
    }

    #[test]
    fn declared_attributes_skip_repeats() {
        let def = DatatypeDefinition::new("EncounterPerformed", EventCategory::Encounter)
            .with_rule("relevantPeriod", Some("start_time"), Some(Bound::Low))
            .with_rule("relevantPeriod", Some("end_time"), Some(Bound::High))
            .with_rule("lengthOfStay", None, None);
        assert_eq!(def.declared_attributes(), vec!["relevantPeriod", "lengthOfStay"]);
    }
}
