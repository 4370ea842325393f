//! Per-datatype attribute mapping table.
//!
//! Built once from the datatype definitions in the standards directory and
//! read-only afterwards. Owned by the converter that built it.

use std::collections::BTreeMap;

use cqm_model::EventCategory;
use cqm_standards::{Bound, DatatypeDefinition, DatatypeDefinitions};
use tracing::debug;

use crate::error::{MappingError, Result};

/// Attributes the event side declares but that are never mapped.
///
/// `PatientCharacteristicExpired.cause` is declared by the datatype, but the
/// event materializer cannot produce it, so it is removed from both the
/// declared attributes and the mappings.
pub const EXCLUDED_ATTRIBUTES: &[(&str, &str)] = &[("PatientCharacteristicExpired", "cause")];

/// Where an event attribute lands on the record side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeTarget {
    Single(String),
    /// One interval split across two record attributes.
    Split { low: String, high: String },
}

impl AttributeTarget {
    /// Record attribute names this target writes, low before high.
    pub fn record_attributes(&self) -> Vec<&str> {
        match self {
            AttributeTarget::Single(name) => vec![name.as_str()],
            AttributeTarget::Split { low, high } => vec![low.as_str(), high.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub category: EventCategory,
    pub status: Option<String>,
    pub declared: Vec<String>,
    pub mappings: Vec<(String, AttributeTarget)>,
}

impl TypeInfo {
    pub fn target_for(&self, attribute: &str) -> Option<&AttributeTarget> {
        self.mappings
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, target)| target)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeMappingTable {
    types: BTreeMap<String, TypeInfo>,
}

impl AttributeMappingTable {
    pub fn build(definitions: &DatatypeDefinitions) -> Result<Self> {
        let mut types = BTreeMap::new();
        for definition in definitions.iter() {
            types.insert(definition.name.clone(), type_info(definition)?);
        }
        let mut table = Self { types };
        table.apply_exclusions();
        debug!(
            qdm = %definitions.qdm_version,
            types = table.types.len(),
            "attribute mapping table built"
        );
        Ok(table)
    }

    fn apply_exclusions(&mut self) {
        for (datatype, attribute) in EXCLUDED_ATTRIBUTES {
            let Some(info) = self.types.get_mut(*datatype) else {
                continue;
            };
            info.declared.retain(|name| name.as_str() != *attribute);
            info.mappings.retain(|(name, _)| name.as_str() != *attribute);
            debug!(%datatype, %attribute, "attribute excluded from mapping");
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeInfo> {
        self.types.get(type_name)
    }

    pub fn try_get(&self, type_name: &str) -> Result<&TypeInfo> {
        self.get(type_name)
            .ok_or_else(|| MappingError::UnknownType(type_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeInfo)> {
        self.types.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `{typeName: [declared attributes]}` as handed to the event materializer.
    pub fn attribute_spec(&self) -> BTreeMap<String, Vec<String>> {
        self.types
            .iter()
            .map(|(name, info)| (name.clone(), info.declared.clone()))
            .collect()
    }
}

enum Pending {
    Single(String),
    Split {
        low: Option<String>,
        high: Option<String>,
    },
}

fn type_info(definition: &DatatypeDefinition) -> Result<TypeInfo> {
    let mut pending: Vec<(String, Pending)> = Vec::new();
    for rule in &definition.rules {
        let Some(record_attribute) = rule.record_attribute.clone() else {
            continue;
        };
        let Some(bound) = rule.bound else {
            pending.retain(|(name, _)| name != &rule.attribute);
            pending.push((rule.attribute.clone(), Pending::Single(record_attribute)));
            continue;
        };
        let existing = pending.iter().position(|(name, entry)| {
            name == &rule.attribute && matches!(entry, Pending::Split { .. })
        });
        let slot = match existing {
            Some(index) => &mut pending[index].1,
            None => {
                pending.push((
                    rule.attribute.clone(),
                    Pending::Split {
                        low: None,
                        high: None,
                    },
                ));
                let last = pending.len() - 1;
                &mut pending[last].1
            }
        };
        if let Pending::Split { low, high } = slot {
            match bound {
                Bound::Low => *low = Some(record_attribute),
                Bound::High => *high = Some(record_attribute),
            }
        }
    }

    let mut mappings = Vec::with_capacity(pending.len());
    for (attribute, entry) in pending {
        let target = match entry {
            Pending::Single(name) => AttributeTarget::Single(name),
            Pending::Split {
                low: Some(low),
                high: Some(high),
            } => AttributeTarget::Split { low, high },
            Pending::Split { .. } => {
                return Err(MappingError::IncompleteSplit {
                    datatype: definition.name.clone(),
                    attribute,
                });
            }
        };
        mappings.push((attribute, target));
    }

    Ok(TypeInfo {
        category: definition.category,
        status: definition.status.clone(),
        declared: definition.declared_attributes(),
        mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired() -> DatatypeDefinition {
        DatatypeDefinition::new("PatientCharacteristicExpired", EventCategory::PatientCharacteristic)
            .with_rule("expiredDatetime", Some("deathdate"), None)
            .with_rule("cause", Some("cause"), None)
    }

    #[test]
    fn cause_is_excluded() {
        let defs = DatatypeDefinitions::new("5.3", vec![expired()]);
        let table = AttributeMappingTable::build(&defs).unwrap();
        let info = table.get("PatientCharacteristicExpired").unwrap();
        assert_eq!(info.declared, vec!["expiredDatetime"]);
        assert!(info.target_for("cause").is_none());
        assert_eq!(
            info.target_for("expiredDatetime"),
            Some(&AttributeTarget::Single("deathdate".to_string()))
        );
    }

    #[test]
    fn bounded_rows_pair_up() {
        let def = DatatypeDefinition::new("Symptom", EventCategory::Symptom)
            .with_rule("prevalencePeriod", Some("start_time"), Some(Bound::Low))
            .with_rule("severity", Some("severity"), None)
            .with_rule("prevalencePeriod", Some("end_time"), Some(Bound::High));
        let table = AttributeMappingTable::build(&DatatypeDefinitions::new("5.3", vec![def])).unwrap();
        let info = table.get("Symptom").unwrap();
        assert_eq!(
            info.mappings[0],
            (
                "prevalencePeriod".to_string(),
                AttributeTarget::Split {
                    low: "start_time".to_string(),
                    high: "end_time".to_string()
                }
            )
        );
        assert_eq!(info.mappings[1].0, "severity");
    }

    #[test]
    fn half_a_split_is_an_error() {
        let def = DatatypeDefinition::new("Symptom", EventCategory::Symptom)
            .with_rule("prevalencePeriod", Some("start_time"), Some(Bound::Low));
        let err = AttributeMappingTable::build(&DatatypeDefinitions::new("5.3", vec![def]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Symptom.prevalencePeriod declares only one bound of a split interval"
        );
    }

    #[test]
    fn declared_without_record_counterpart() {
        let def = DatatypeDefinition::new("EncounterPerformed", EventCategory::Encounter)
            .with_rule("lengthOfStay", None, None);
        let table = AttributeMappingTable::build(&DatatypeDefinitions::new("5.3", vec![def])).unwrap();
        let info = table.get("EncounterPerformed").unwrap();
        assert_eq!(info.declared, vec!["lengthOfStay"]);
        assert!(info.mappings.is_empty());
        assert!(table.try_get("Nope").is_err());
    }
}
