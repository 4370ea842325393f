use serde_json::{Map, Value};
use tracing::debug;

use super::{CompositeRule, RuleMetadata, UnpackContext, collection_members, tagged_collection};
use crate::error::Result;

const DIAGNOSIS_FIELDS: [&str; 3] = ["codeSystem", "code", "title"];

/// Diagnoses as a `{codeSystem, code, title}` collection.
///
/// A lone diagnosis equal to `principalDiagnosis` is dropped so the same
/// condition is not carried twice.
pub struct DiagnosisRule {
    metadata: RuleMetadata,
}

impl DiagnosisRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "diagnosis",
                "diagnosis",
                "Collect diagnoses and drop a duplicate of the principal diagnosis",
            ),
        }
    }
}

impl Default for DiagnosisRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRule for DiagnosisRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(&self, _ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()> {
        let Some(raw) = attrs.get("diagnosis") else {
            return Ok(());
        };
        let diagnoses: Vec<Value> = collection_members(raw)
            .iter()
            .filter_map(diagnosis_entry)
            .collect();

        if let [only] = diagnoses.as_slice()
            && attrs
                .get("principalDiagnosis")
                .is_some_and(|principal| same_diagnosis(only, principal))
        {
            debug!("diagnosis duplicates principalDiagnosis, dropping it");
            attrs.remove("diagnosis");
            return Ok(());
        }
        attrs.insert("diagnosis".to_string(), tagged_collection(diagnoses));
        Ok(())
    }
}

/// First code of a coded result (titled by its description), or a plain
/// code map as is.
///
/// Coded results list their first item's system first, which keeps the
/// chosen code paired with the description it came with.
fn diagnosis_entry(value: &Value) -> Option<Value> {
    let map = value.as_object()?;
    let (system, code, title) = match map.get("codes").and_then(Value::as_object) {
        Some(codes) => {
            let (system, code) = codes.iter().find_map(|(system, list)| {
                list.as_array()
                    .and_then(|list| list.first())
                    .map(|code| (Value::String(system.clone()), code.clone()))
            })?;
            let title = map.get("description").cloned().unwrap_or(Value::Null);
            (system, code, title)
        }
        None => (
            map.get("codeSystem").cloned()?,
            map.get("code").cloned()?,
            map.get("title").cloned().unwrap_or(Value::Null),
        ),
    };
    let mut entry = Map::new();
    entry.insert("codeSystem".to_string(), system);
    entry.insert("code".to_string(), code);
    entry.insert("title".to_string(), title);
    Some(Value::Object(entry))
}

fn same_diagnosis(diagnosis: &Value, principal: &Value) -> bool {
    DIAGNOSIS_FIELDS.iter().all(|field| {
        let left = diagnosis.get(*field).unwrap_or(&Value::Null);
        let right = principal.get(*field).unwrap_or(&Value::Null);
        left == right
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::write_attribute;
    use cqm_map::AttributeTarget;
    use cqm_model::{AttrValue, Code};
    use serde_json::json;

    fn run(attrs: Value) -> Map<String, Value> {
        let Value::Object(mut attrs) = attrs else {
            panic!("test input must be an object");
        };
        DiagnosisRule::new()
            .apply(&UnpackContext::default(), &mut attrs)
            .unwrap();
        attrs
    }

    #[test]
    fn duplicate_of_principal_is_removed() {
        let attrs = run(json!({
            "diagnosis": [{
                "_type": "CodedResultValue",
                "codes": {"ICD-10-CM": ["I10"]},
                "description": "Hypertension"
            }],
            "principalDiagnosis": {"code": "I10", "codeSystem": "ICD-10-CM", "title": "Hypertension"}
        }));
        assert!(!attrs.contains_key("diagnosis"));
        assert!(attrs.contains_key("principalDiagnosis"));
    }

    #[test]
    fn distinct_diagnoses_are_collected() {
        let attrs = run(json!({
            "diagnosis": [
                {"codes": {"ICD-10-CM": ["I10"]}, "description": "Hypertension"},
                {"code": "E11.9", "codeSystem": "ICD-10-CM"}
            ],
            "principalDiagnosis": {"code": "I10", "codeSystem": "ICD-10-CM", "title": "Hypertension"}
        }));
        assert_eq!(
            attrs["diagnosis"],
            json!({
                "type": "COL",
                "values": [
                    {"codeSystem": "ICD-10-CM", "code": "I10", "title": "Hypertension"},
                    {"codeSystem": "ICD-10-CM", "code": "E11.9", "title": null}
                ]
            })
        );
        let again = run(Value::Object(attrs.clone()));
        assert_eq!(again, attrs);
    }

    #[test]
    fn title_difference_keeps_diagnosis() {
        let attrs = run(json!({
            "diagnosis": [{"codes": {"ICD-10-CM": ["I10"]}, "description": "HTN"}],
            "principalDiagnosis": {"code": "I10", "codeSystem": "ICD-10-CM", "title": "Hypertension"}
        }));
        assert!(attrs.contains_key("diagnosis"));
    }

    #[test]
    fn multi_system_diagnoses_fold_into_principal() {
        let diagnoses = AttrValue::List(vec![
            AttrValue::Code(Code::new("38341003", "SNOMED-CT").with_descriptor("HTN")),
            AttrValue::Code(Code::new("I10", "ICD-10-CM").with_descriptor("Hypertension")),
        ]);
        let principal = AttrValue::Code(Code::new("38341003", "SNOMED-CT").with_descriptor("HTN"));
        let mut attrs = Map::new();
        write_attribute(&AttributeTarget::Single("diagnosis".to_string()), &diagnoses, &mut attrs);
        write_attribute(
            &AttributeTarget::Single("principalDiagnosis".to_string()),
            &principal,
            &mut attrs,
        );

        let attrs = run(Value::Object(attrs));
        assert!(!attrs.contains_key("diagnosis"));
    }

    #[test]
    fn multi_system_diagnosis_pairs_first_code_with_its_title() {
        let diagnoses = AttrValue::List(vec![
            AttrValue::Code(Code::new("38341003", "SNOMED-CT").with_descriptor("HTN")),
            AttrValue::Code(Code::new("I10", "ICD-10-CM").with_descriptor("Hypertension")),
        ]);
        let mut attrs = Map::new();
        write_attribute(&AttributeTarget::Single("diagnosis".to_string()), &diagnoses, &mut attrs);

        let attrs = run(Value::Object(attrs));
        assert_eq!(
            attrs["diagnosis"]["values"],
            json!([{"codeSystem": "SNOMED-CT", "code": "38341003", "title": "HTN"}])
        );
    }
}
