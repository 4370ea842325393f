//! Key and identifier normalization around the event materializer.

use cqm_map::snake_case;
use cqm_model::OPEN_ENDED_EPOCH;
use serde_json::{Map, Value};

/// Deep-rename keys to the event schema's camelCase.
///
/// Keys starting with `_` (such as `_type`) are kept. `system` and `display`
/// become `codeSystem` and `descriptor`.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (event_key(&key), normalize_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn event_key(key: &str) -> String {
    if key.starts_with('_') {
        return key.to_string();
    }
    match key {
        "system" => "codeSystem".to_string(),
        "display" => "descriptor".to_string(),
        _ => camel_case(key),
    }
}

/// `data_element_codes` → `dataElementCodes`; camelCase input is unchanged.
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Replace `{"$oid": "..."}` identifier objects with their string.
pub fn serialize_identifiers(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && let Some(Value::String(id)) = map.get("$oid")
            {
                return Value::String(id.clone());
            }
            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, serialize_identifiers(value)))
                    .collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(serialize_identifiers).collect())
        }
        other => other,
    }
}

/// `start_date`/`end_date` → `start_time`/`end_time`, at any depth.
pub fn rename_record_time_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            rename_key(map, "start_date", "start_time");
            rename_key(map, "end_date", "end_time");
            map.values_mut().for_each(rename_record_time_keys);
        }
        Value::Array(items) => items.iter_mut().for_each(rename_record_time_keys),
        _ => {}
    }
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.entry(to.to_string()).or_insert(value);
    }
}

/// Drop `end_time` values at the open-ended sentinel, at any depth.
pub fn fix_infinity_dates(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("end_time").is_some_and(is_sentinel) {
                map.remove("end_time");
            }
            map.values_mut().for_each(fix_infinity_dates);
        }
        Value::Array(items) => items.iter_mut().for_each(fix_infinity_dates),
        _ => {}
    }
}

fn is_sentinel(value: &Value) -> bool {
    match value {
        Value::Number(number) => number.as_i64() == Some(OPEN_ENDED_EPOCH),
        Value::String(text) => text.trim().parse::<i64>().ok() == Some(OPEN_ENDED_EPOCH),
        _ => false,
    }
}

/// Record `direction` for communication event types.
pub fn communication_direction(type_name: &str) -> Option<String> {
    type_name
        .starts_with("Communication")
        .then(|| snake_case(type_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_become_camel_case() {
        let raw = json!({
            "_type": "EncounterPerformed",
            "data_element_codes": [{"code": "99201", "system": "CPT", "display": "Visit"}],
            "relevantPeriod": {"low": 1, "high": 2}
        });
        assert_eq!(
            normalize_keys(raw),
            json!({
                "_type": "EncounterPerformed",
                "dataElementCodes": [{"code": "99201", "codeSystem": "CPT", "descriptor": "Visit"}],
                "relevantPeriod": {"low": 1, "high": 2}
            })
        );
    }

    #[test]
    fn identifiers_are_flattened() {
        let raw = json!({"_id": {"$oid": "5a0c"}, "refs": [{"$oid": "5a0d"}], "other": {"$oid": "x", "k": 1}});
        assert_eq!(
            serialize_identifiers(raw),
            json!({"_id": "5a0c", "refs": ["5a0d"], "other": {"$oid": "x", "k": 1}})
        );
    }

    #[test]
    fn time_keys_are_renamed_and_sentinels_dropped() {
        let mut record = json!({"encounters": [
            {"start_date": 1, "end_date": 253_402_300_799i64},
            {"start_time": 1, "end_time": "253402300799"},
            {"start_time": 1, "end_time": 5}
        ]});
        rename_record_time_keys(&mut record);
        fix_infinity_dates(&mut record);
        assert_eq!(
            record,
            json!({"encounters": [
                {"start_time": 1},
                {"start_time": 1},
                {"start_time": 1, "end_time": 5}
            ]})
        );
    }

    #[test]
    fn direction_only_for_communications() {
        assert_eq!(
            communication_direction("CommunicationFromPatientToProvider").as_deref(),
            Some("communication_from_patient_to_provider")
        );
        assert_eq!(communication_direction("EncounterPerformed"), None);
    }
}
