//! The flat categorized record.
//!
//! Sections are collections of entries keyed by section name
//! (`encounters`, `vital_signs`, ...). Anything at the top level that is not
//! a known section or a demographic field is kept verbatim in `metadata`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// Section collections a record may carry.
pub const RECORD_SECTIONS: &[&str] = &[
    "adverse_events",
    "advance_directives",
    "allergies",
    "assessments",
    "care_experiences",
    "care_goals",
    "communications",
    "conditions",
    "encounters",
    "family_histories",
    "family_history",
    "functional_statuses",
    "immunizations",
    "medical_equipment",
    "medications",
    "participations",
    "procedures",
    "provider_characteristics",
    "results",
    "social_history",
    "symptoms",
    "vital_signs",
];

pub fn is_record_section(name: &str) -> bool {
    RECORD_SECTIONS.contains(&name)
}

/// A coded demographic value (`race`, `ethnicity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedConcept {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "codeSystem", alias = "code_system", default)]
    pub code_system: String,
}

/// One entry in a record section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    #[serde(rename = "_type")]
    pub entry_type: String,
    #[serde(default)]
    pub codes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl RecordEntry {
    pub fn new(entry_type: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            ..Self::default()
        }
    }

    pub fn has_codes(&self) -> bool {
        self.codes.values().any(|codes| !codes.is_empty())
    }

    /// Status code values of the `HL7 ActStatus` system, if any.
    pub fn status(&self) -> Option<&str> {
        match self.status_code.as_ref()? {
            Value::String(status) => Some(status),
            Value::Object(map) => map
                .values()
                .find_map(|codes| codes.as_array()?.first()?.as_str()),
            _ => None,
        }
    }
}

/// A flat patient record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordWire")]
pub struct ClinicalRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deathdate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<CodedConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<CodedConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Vec<RecordEntry>>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ClinicalRecord {
    pub fn section(&self, name: &str) -> &[RecordEntry] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn push_entry(&mut self, section: &str, entry: RecordEntry) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .push(entry);
    }

    pub fn entry_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }
}

#[derive(Deserialize)]
struct RecordWire {
    #[serde(default)]
    first: Option<String>,
    #[serde(default)]
    last: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    birthdate: Option<i64>,
    #[serde(default)]
    deathdate: Option<i64>,
    #[serde(default)]
    expired: Option<bool>,
    #[serde(default)]
    race: Option<CodedConcept>,
    #[serde(default)]
    ethnicity: Option<CodedConcept>,
    #[serde(default)]
    bundle_id: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl TryFrom<RecordWire> for ClinicalRecord {
    type Error = ModelError;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let mut sections = BTreeMap::new();
        let mut metadata = Map::new();
        for (key, value) in wire.rest {
            if !is_record_section(&key) {
                metadata.insert(key, value);
                continue;
            }
            if value.is_null() {
                continue;
            }
            let entries: Vec<RecordEntry> = serde_json::from_value(value)
                .map_err(|e| ModelError::InvalidRecord(format!("section {key}: {e}")))?;
            sections.insert(key, entries);
        }
        Ok(ClinicalRecord {
            first: wire.first,
            last: wire.last,
            gender: wire.gender,
            birthdate: wire.birthdate,
            deathdate: wire.deathdate,
            expired: wire.expired,
            race: wire.race,
            ethnicity: wire.ethnicity,
            bundle_id: wire.bundle_id,
            sections,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_sections_from_metadata() {
        let record: ClinicalRecord = serde_json::from_value(json!({
            "first": "Jane",
            "gender": "F",
            "birthdate": 1_000_000,
            "encounters": [{"_type": "Encounter", "codes": {"CPT": ["99201"]}, "start_time": 5}],
            "insurance_providers": [{"name": "Medicare"}],
            "notes": "test patient"
        }))
        .unwrap();
        assert_eq!(record.section("encounters").len(), 1);
        assert_eq!(
            record.section("encounters")[0].attributes.get("start_time"),
            Some(&json!(5))
        );
        assert!(record.metadata.contains_key("insurance_providers"));
        assert!(record.metadata.contains_key("notes"));
        assert!(record.section("medications").is_empty());
    }

    #[test]
    fn malformed_section_names_the_section() {
        let err = serde_json::from_value::<ClinicalRecord>(json!({"encounters": [{"codes": 3}]}))
            .unwrap_err();
        assert!(err.to_string().contains("section encounters"));
    }

    #[test]
    fn status_reads_act_status_map() {
        let mut entry = RecordEntry::new("Encounter");
        entry.status_code = Some(json!({"HL7 ActStatus": ["performed"]}));
        assert_eq!(entry.status(), Some("performed"));
    }
}
