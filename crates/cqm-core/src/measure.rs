//! Measure collaborator: source data criteria and their value sets.

use cqm_model::{Code, SourceDataCriterion, ValueSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Criterion definition of the birthdate characteristic.
pub const BIRTHDATE_DEFINITION: &str = "patient_characteristic_birthdate";
/// Criterion definition of the expired characteristic.
pub const EXPIRED_DEFINITION: &str = "patient_characteristic_expired";

/// The parts of a measure the converter looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureContext {
    #[serde(default)]
    pub source_data_criteria: Vec<SourceDataCriterion>,
    #[serde(default)]
    pub value_sets: Vec<ValueSet>,
}

impl MeasureContext {
    pub fn new(source_data_criteria: Vec<SourceDataCriterion>, value_sets: Vec<ValueSet>) -> Self {
        Self {
            source_data_criteria,
            value_sets,
        }
    }

    pub fn value_set(&self, oid: &str) -> Option<&ValueSet> {
        self.value_sets.iter().find(|set| set.oid == oid)
    }

    /// The criterion an event with `description` and `codes` belongs to.
    ///
    /// Several criteria may share a description. The first one whose value
    /// set contains any of the codes wins, else the first candidate.
    pub fn resolve_criterion(&self, description: &str, codes: &[Code]) -> Option<&SourceDataCriterion> {
        let candidates: Vec<&SourceDataCriterion> = self
            .source_data_criteria
            .iter()
            .filter(|criterion| criterion.description == description)
            .collect();
        if candidates.len() > 1 {
            debug!(
                %description,
                candidates = candidates.len(),
                "ambiguous source data criteria, matching by codes"
            );
            if let Some(matched) = candidates
                .iter()
                .find(|criterion| self.criterion_matches(criterion, codes))
            {
                return Some(*matched);
            }
        }
        candidates.first().copied()
    }

    /// First concept of the value set behind the criterion with
    /// `definition`, else `fallback`.
    pub fn concept_for_definition(&self, definition: &str, fallback: Code) -> Code {
        self.source_data_criteria
            .iter()
            .filter(|criterion| criterion.definition.as_deref() == Some(definition))
            .filter_map(|criterion| criterion.code_list_id.as_deref())
            .filter_map(|oid| self.value_set(oid))
            .find_map(|set| set.concepts.first())
            .map(|concept| {
                let mut code = Code::new(&concept.code, &concept.code_system_name);
                code.code_system_oid = concept.code_system_oid.clone();
                code.descriptor = concept.display_name.clone();
                code
            })
            .unwrap_or(fallback)
    }

    fn criterion_matches(&self, criterion: &SourceDataCriterion, codes: &[Code]) -> bool {
        let Some(set) = criterion.code_list_id.as_deref().and_then(|oid| self.value_set(oid)) else {
            return false;
        };
        codes
            .iter()
            .any(|code| set.contains(&code.code_system, &code.code))
    }
}
