//! Typed clinical events and the patient wrapper that carries them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attr::AttrValue;
use crate::error::ModelError;
use crate::values::Code;

/// Prefix some producers put in front of event type names.
const TYPE_NAMESPACE: &str = "QDM::";

/// The fixed set of event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    AdverseEvent,
    Allergy,
    Assessment,
    CareExperience,
    CareGoal,
    Communication,
    #[serde(alias = "diagnosis")]
    Condition,
    Device,
    DiagnosticStudy,
    Encounter,
    FamilyHistory,
    Immunization,
    Intervention,
    #[serde(alias = "laboratory", alias = "lab")]
    LaboratoryTest,
    Medication,
    Participation,
    PatientCharacteristic,
    PhysicalExam,
    Procedure,
    ProviderCharacteristic,
    Substance,
    Symptom,
}

impl EventCategory {
    pub const ALL: [EventCategory; 22] = [
        EventCategory::AdverseEvent,
        EventCategory::Allergy,
        EventCategory::Assessment,
        EventCategory::CareExperience,
        EventCategory::CareGoal,
        EventCategory::Communication,
        EventCategory::Condition,
        EventCategory::Device,
        EventCategory::DiagnosticStudy,
        EventCategory::Encounter,
        EventCategory::FamilyHistory,
        EventCategory::Immunization,
        EventCategory::Intervention,
        EventCategory::LaboratoryTest,
        EventCategory::Medication,
        EventCategory::Participation,
        EventCategory::PatientCharacteristic,
        EventCategory::PhysicalExam,
        EventCategory::Procedure,
        EventCategory::ProviderCharacteristic,
        EventCategory::Substance,
        EventCategory::Symptom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::AdverseEvent => "adverse_event",
            EventCategory::Allergy => "allergy",
            EventCategory::Assessment => "assessment",
            EventCategory::CareExperience => "care_experience",
            EventCategory::CareGoal => "care_goal",
            EventCategory::Communication => "communication",
            EventCategory::Condition => "condition",
            EventCategory::Device => "device",
            EventCategory::DiagnosticStudy => "diagnostic_study",
            EventCategory::Encounter => "encounter",
            EventCategory::FamilyHistory => "family_history",
            EventCategory::Immunization => "immunization",
            EventCategory::Intervention => "intervention",
            EventCategory::LaboratoryTest => "laboratory_test",
            EventCategory::Medication => "medication",
            EventCategory::Participation => "participation",
            EventCategory::PatientCharacteristic => "patient_characteristic",
            EventCategory::PhysicalExam => "physical_exam",
            EventCategory::Procedure => "procedure",
            EventCategory::ProviderCharacteristic => "provider_characteristic",
            EventCategory::Substance => "substance",
            EventCategory::Symptom => "symptom",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "diagnosis" => return Ok(EventCategory::Condition),
            "laboratory" | "lab" => return Ok(EventCategory::LaboratoryTest),
            _ => {}
        }
        EventCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownCategory(s.to_string()))
    }
}

/// One typed clinical event.
///
/// Attributes that are not part of the common core are kept in
/// `attributes`, keyed by their event-side (camelCase) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalEvent {
    #[serde(rename = "_type")]
    pub event_type: String,
    #[serde(default, alias = "qdmCategory", skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
    #[serde(default, alias = "qdmStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub data_element_codes: Vec<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hqmf_oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl ClinicalEvent {
    pub fn new(event_type: impl Into<String>, category: EventCategory) -> Self {
        Self {
            event_type: event_type.into(),
            category: Some(category),
            status: None,
            data_element_codes: Vec::new(),
            hqmf_oid: None,
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_code(mut self, code: Code) -> Self {
        self.data_element_codes.push(code);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Type name without any namespace prefix.
    pub fn type_name(&self) -> &str {
        self.event_type
            .strip_prefix(TYPE_NAMESPACE)
            .unwrap_or(&self.event_type)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name).filter(|value| !value.is_null())
    }

    pub fn is_patient_characteristic(&self) -> bool {
        self.category == Some(EventCategory::PatientCharacteristic)
    }
}

/// The patient wrapper: demographics, events and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default)]
    pub given_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_datetime: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub data_elements: Vec<ClinicalEvent>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extended_data: Map<String, Value>,
}

impl Patient {
    /// Events of one concrete type, in list order.
    pub fn events_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a ClinicalEvent> + 'a {
        self.data_elements
            .iter()
            .filter(move |event| event.type_name() == type_name)
    }
}
