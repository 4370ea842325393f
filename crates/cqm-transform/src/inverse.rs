//! Record value → event value.
//!
//! The record side keeps instants as epoch seconds and flattens results into
//! wrapper objects. These helpers undo that so the result can go through the
//! ordinary boundary parse. Facility periods are read back only when they
//! were written with the default display format.

use chrono::NaiveDateTime;
use cqm_model::time::{OPEN_ENDED_EPOCH, format_timestamp, from_epoch};
use cqm_model::AttrValue;
use serde_json::{Map, Number, Value, json};

use crate::attributes::{CODED_RESULT_TYPE, QUANTITY_RESULT_TYPE};
use crate::error::Result;
use crate::unpack::DEFAULT_FACILITY_TIME_FORMAT;

/// Parse a record-side value of event attribute `attribute`.
pub fn to_event_value(attribute: &str, value: &Value) -> Result<AttrValue> {
    Ok(AttrValue::from_json(&to_event_json(attribute, value))?)
}

/// Event-side JSON for a record-side value of event attribute `attribute`.
pub fn to_event_json(attribute: &str, value: &Value) -> Value {
    match value {
        Value::Number(number) if is_temporal(attribute) => number
            .as_i64()
            .and_then(epoch_string)
            .unwrap_or_else(|| value.clone()),
        Value::Array(pair) if is_period(attribute) && pair.len() == 2 => {
            json!({"low": bound(&pair[0]), "high": bound(&pair[1])})
        }
        Value::Array(items) => {
            if let [single] = items.as_slice()
                && let Some(result) = result_value(single)
            {
                return result;
            }
            Value::Array(items.iter().map(|item| to_event_json(attribute, item)).collect())
        }
        Value::Object(map) => object_json(map),
        other => other.clone(),
    }
}

/// Joins the two record attributes of a split interval.
pub fn split_to_event_json(low: &Value, high: &Value) -> Value {
    json!({"low": bound(low), "high": bound(high)})
}

fn is_temporal(attribute: &str) -> bool {
    attribute.ends_with("Datetime") || attribute.ends_with("Time")
}

fn is_period(attribute: &str) -> bool {
    attribute.ends_with("Period")
}

fn epoch_string(seconds: i64) -> Option<Value> {
    from_epoch(seconds).map(|instant| Value::String(format_timestamp(&instant)))
}

fn bound(value: &Value) -> Value {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(OPEN_ENDED_EPOCH) => Value::Null,
            Some(seconds) => epoch_string(seconds).unwrap_or(Value::Null),
            None => Value::Null,
        },
        Value::Object(map) => object_json(map),
        other => other.clone(),
    }
}

fn object_json(map: &Map<String, Value>) -> Value {
    if let Some(result) = result_value(&Value::Object(map.clone())) {
        return result;
    }
    if let Some(quantity) = quantity(map) {
        return quantity;
    }
    if let Some(Value::Array(members)) = map.get("values") {
        return Value::Array(members.iter().map(member_json).collect());
    }
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), to_event_json(key, value)))
            .collect(),
    )
}

/// One member of a record-side collection.
fn member_json(member: &Value) -> Value {
    let Value::Object(map) = member else {
        return to_event_json("", member);
    };
    if map.contains_key("locationPeriodLow") || map.contains_key("display") {
        return facility_json(map);
    }
    object_json(map)
}

fn facility_json(map: &Map<String, Value>) -> Value {
    let mut code = map.get("code").cloned().unwrap_or(Value::Null);
    if let (Some(code), Some(display)) = (code.as_object_mut(), map.get("display")) {
        code.insert("descriptor".to_string(), display.clone());
    }
    json!({
        "code": code,
        "locationPeriod": {
            "low": facility_time(map.get("locationPeriodLow")),
            "high": facility_time(map.get("locationPeriodHigh")),
        },
    })
}

fn facility_time(value: Option<&Value>) -> Value {
    value
        .and_then(Value::as_str)
        .and_then(|text| NaiveDateTime::parse_from_str(text, DEFAULT_FACILITY_TIME_FORMAT).ok())
        .map_or(Value::Null, |naive| {
            Value::String(format_timestamp(&naive.and_utc().fixed_offset()))
        })
}

/// Coded and physical-quantity result wrappers.
fn result_value(value: &Value) -> Option<Value> {
    let map = value.as_object()?;
    match map.get("_type").and_then(Value::as_str)? {
        CODED_RESULT_TYPE => {
            let title = map.get("description").cloned().unwrap_or(Value::Null);
            let mut codes: Vec<Value> = map
                .get("codes")
                .and_then(Value::as_object)?
                .iter()
                .flat_map(|(system, codes)| {
                    codes
                        .as_array()
                        .into_iter()
                        .flatten()
                        .map(move |code| json!({"code": code, "codeSystem": system}))
                })
                .collect();
            if let Some(Value::Object(first)) = codes.first_mut()
                && !title.is_null()
            {
                first.insert("descriptor".to_string(), title);
            }
            match codes.len() {
                0 => None,
                1 => codes.pop(),
                _ => Some(Value::Array(codes)),
            }
        }
        QUANTITY_RESULT_TYPE => quantity(map),
        _ => None,
    }
}

/// `{units, scalar}` → `{unit, value}`.
fn quantity(map: &Map<String, Value>) -> Option<Value> {
    let scalar = map.get("scalar")?;
    let value = match scalar {
        Value::String(text) => serde_json::from_str::<Number>(text.trim())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Number(_) => scalar.clone(),
        _ => Value::Null,
    };
    Some(json!({
        "value": value,
        "unit": map.get("units").cloned().unwrap_or(Value::String(String::new())),
    }))
}
