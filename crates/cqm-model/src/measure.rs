//! Measure-side collaborator types: source data criteria and value sets.

use serde::{Deserialize, Serialize};

/// A measure's declared source data criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDataCriterion {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code_list_id: Option<String>,
    #[serde(default)]
    pub hqmf_oid: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A value set in the converted (event-side) form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSet {
    pub oid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
}

impl ValueSet {
    /// True when any concept matches the code in the given system.
    pub fn contains(&self, code_system: &str, code: &str) -> bool {
        self.concepts
            .iter()
            .any(|concept| concept.code == code && concept.code_system_name == code_system)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    #[serde(default)]
    pub code_system_name: String,
    #[serde(default)]
    pub code_system_oid: Option<String>,
    #[serde(default)]
    pub code_system_version: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A value set as stored alongside flat records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdsValueSet {
    pub oid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub concepts: Vec<HdsConcept>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdsConcept {
    pub code: String,
    #[serde(default)]
    pub code_system_name: String,
    #[serde(default)]
    pub code_system_version: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A measure's pinned version for one value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetPin {
    pub oid: String,
    #[serde(default)]
    pub version: String,
}
