//! Attribute-level reshaping after generic extraction.
//!
//! The mapping-table target decides where an extracted value goes and a few
//! record attributes expect a specific wrapper around it.

use cqm_map::AttributeTarget;
use cqm_model::AttrValue;
use serde_json::{Map, Value, json};

use crate::extract::extract;

pub const CODED_RESULT_TYPE: &str = "CodedResultValue";
pub const QUANTITY_RESULT_TYPE: &str = "PhysicalQuantityResultValue";

/// Record attributes whose code lists are unpacked by their own rule.
const OWN_RULE_ATTRIBUTES: &[&str] = &["facility", "components"];

/// Extract `value` and write it under the record attribute(s) of `target`.
///
/// Null results are not written.
pub fn write_attribute(target: &AttributeTarget, value: &AttrValue, out: &mut Map<String, Value>) {
    let extracted = extract(value);
    match target {
        AttributeTarget::Split { low, high } => {
            let (low_value, high_value) = match extracted {
                Value::Array(pair) if pair.len() == 2 => {
                    let mut pair = pair.into_iter();
                    (
                        pair.next().unwrap_or(Value::Null),
                        pair.next().unwrap_or(Value::Null),
                    )
                }
                // A bare instant on a split attribute fills the low side.
                other => (other, Value::Null),
            };
            insert_present(out, low, low_value);
            insert_present(out, high, high_value);
        }
        AttributeTarget::Single(name) => {
            if let Some(reshaped) = reshape(name, extracted) {
                out.insert(name.clone(), reshaped);
            }
        }
    }
}

/// Apply the per-attribute wrappers to an extracted value.
pub fn reshape(name: &str, extracted: Value) -> Option<Value> {
    match extracted {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items)
            if !OWN_RULE_ATTRIBUTES.contains(&name) && items.iter().all(is_code_map) =>
        {
            Some(json!([coded_result(&items)]))
        }
        Value::Array(items) => Some(json!({ "values": items })),
        Value::Object(map) if name == "values" && map.contains_key("scalar") => Some(json!([{
            "_type": QUANTITY_RESULT_TYPE,
            "scalar": map.get("scalar").cloned().unwrap_or(Value::Null),
            "units": map.get("units").cloned().unwrap_or(Value::Null),
        }])),
        Value::Object(map) if name == "values" && is_code_object(&map) => {
            Some(json!([coded_result(&[Value::Object(map)])]))
        }
        Value::Object(map) if name == "dose" => Some(dose(map)),
        other => Some(other),
    }
}

/// A non-null `negationReason` implies `negationInd = true`.
pub fn apply_negation(out: &mut Map<String, Value>) {
    if out.get("negationReason").is_some_and(|reason| !reason.is_null()) {
        out.insert("negationInd".to_string(), Value::Bool(true));
    }
}

fn insert_present(out: &mut Map<String, Value>, key: &str, value: Value) {
    if !value.is_null() {
        out.insert(key.to_string(), value);
    }
}

fn is_code_map(value: &Value) -> bool {
    value.as_object().is_some_and(is_code_object)
}

fn is_code_object(map: &Map<String, Value>) -> bool {
    map.get("code").is_some_and(Value::is_string) && map.contains_key("codeSystem")
}

/// One coded result carrying every code and the first title.
///
/// `codes` keeps first-seen system order, so its first code is the code of
/// the item the title came from.
fn coded_result(items: &[Value]) -> Value {
    let mut codes = Map::new();
    for item in items {
        let system = item.get("codeSystem").and_then(Value::as_str).unwrap_or_default();
        if let Some(code) = item.get("code").and_then(Value::as_str)
            && let Value::Array(list) = codes
                .entry(system.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
        {
            list.push(Value::String(code.to_string()));
        }
    }
    let description = items
        .first()
        .and_then(|item| item.get("title"))
        .cloned()
        .unwrap_or(Value::Null);
    json!({
        "_type": CODED_RESULT_TYPE,
        "codes": codes,
        "description": description,
    })
}

/// `{units, scalar}` → `{unit, value}`, numeric when the scalar parses.
fn dose(map: Map<String, Value>) -> Value {
    if !map.contains_key("scalar") {
        return Value::Object(map);
    }
    let scalar = map.get("scalar").cloned().unwrap_or(Value::Null);
    let value = match &scalar {
        Value::String(text) => serde_json::from_str::<serde_json::Number>(text.trim())
            .map(Value::Number)
            .unwrap_or(scalar.clone()),
        _ => scalar.clone(),
    };
    json!({
        "unit": map.get("units").cloned().unwrap_or(Value::Null),
        "value": value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqm_model::{Code, Quantity};

    fn single(name: &str) -> AttributeTarget {
        AttributeTarget::Single(name.to_string())
    }

    #[test]
    fn split_interval_writes_both_sides() {
        let value = AttrValue::from_json(&json!({"low": 100, "high": 200})).unwrap();
        let mut out = Map::new();
        let target = AttributeTarget::Split {
            low: "start_time".to_string(),
            high: "end_time".to_string(),
        };
        write_attribute(&target, &value, &mut out);
        assert_eq!(Value::Object(out), json!({"start_time": 100, "end_time": 200}));
    }

    #[test]
    fn open_ended_split_skips_high() {
        let value = AttrValue::from_json(&json!({"low": 100, "high": 253_402_300_799i64})).unwrap();
        let mut out = Map::new();
        let target = AttributeTarget::Split {
            low: "start_time".to_string(),
            high: "end_time".to_string(),
        };
        write_attribute(&target, &value, &mut out);
        assert_eq!(Value::Object(out), json!({"start_time": 100}));
    }

    #[test]
    fn quantity_result_is_wrapped() {
        let value = AttrValue::Quantity(Quantity::new(Some(serde_json::Number::from(120u32)), "mm[Hg]"));
        let mut out = Map::new();
        write_attribute(&single("values"), &value, &mut out);
        assert_eq!(
            out["values"],
            json!([{"_type": "PhysicalQuantityResultValue", "scalar": "120", "units": "mm[Hg]"}])
        );
    }

    #[test]
    fn coded_result_is_wrapped() {
        let value = AttrValue::Code(Code::new("260385009", "SNOMED-CT").with_descriptor("Negative"));
        let mut out = Map::new();
        write_attribute(&single("values"), &value, &mut out);
        assert_eq!(
            out["values"],
            json!([{
                "_type": "CodedResultValue",
                "codes": {"SNOMED-CT": ["260385009"]},
                "description": "Negative"
            }])
        );
    }

    #[test]
    fn code_list_collapses_into_one_coded_result() {
        let value = AttrValue::List(vec![
            AttrValue::Code(Code::new("I10", "ICD-10-CM").with_descriptor("Hypertension")),
            AttrValue::Code(Code::new("38341003", "SNOMED-CT")),
        ]);
        let mut out = Map::new();
        write_attribute(&single("diagnosis"), &value, &mut out);
        assert_eq!(
            out["diagnosis"],
            json!([{
                "_type": "CodedResultValue",
                "codes": {"ICD-10-CM": ["I10"], "SNOMED-CT": ["38341003"]},
                "description": "Hypertension"
            }])
        );
    }

    #[test]
    fn coded_result_keeps_first_item_system_first() {
        let value = AttrValue::List(vec![
            AttrValue::Code(Code::new("38341003", "SNOMED-CT").with_descriptor("HTN")),
            AttrValue::Code(Code::new("I10", "ICD-10-CM").with_descriptor("Hypertension")),
        ]);
        let mut out = Map::new();
        write_attribute(&single("diagnosis"), &value, &mut out);
        let codes = out["diagnosis"][0]["codes"].as_object().unwrap();
        let systems: Vec<&str> = codes.keys().map(String::as_str).collect();
        assert_eq!(systems, ["SNOMED-CT", "ICD-10-CM"]);
        assert_eq!(out["diagnosis"][0]["description"], json!("HTN"));
    }

    #[test]
    fn other_lists_get_values_wrapper() {
        let value = AttrValue::List(vec![AttrValue::Text("abc".to_string())]);
        let mut out = Map::new();
        write_attribute(&single("references"), &value, &mut out);
        assert_eq!(out["references"], json!({"values": ["abc"]}));
    }

    #[test]
    fn dose_is_reshaped() {
        let value = AttrValue::Quantity(Quantity::new(serde_json::Number::from_f64(2.5), "mg"));
        let mut out = Map::new();
        write_attribute(&single("dose"), &value, &mut out);
        assert_eq!(out["dose"], json!({"unit": "mg", "value": 2.5}));
    }

    #[test]
    fn negation_reason_sets_indicator() {
        let mut out = Map::new();
        out.insert("negationReason".to_string(), json!({"code": "1", "codeSystem": "SNOMED-CT"}));
        apply_negation(&mut out);
        assert_eq!(out["negationInd"], json!(true));

        let mut untouched = Map::new();
        untouched.insert("negationReason".to_string(), Value::Null);
        apply_negation(&mut untouched);
        assert!(!untouched.contains_key("negationInd"));
    }

    #[test]
    fn null_values_are_not_written() {
        let mut out = Map::new();
        write_attribute(&single("reason"), &AttrValue::Null, &mut out);
        assert!(out.is_empty());
    }
}
