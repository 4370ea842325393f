//! Event value → record value extraction.
//!
//! Works on the already-classified [`AttrValue`], so every case is a match
//! arm rather than a key-set probe. The only failure mode (an unsupported
//! raw shape) is raised while classifying, see [`extract_json`].

use cqm_model::time::{is_open_ended, to_epoch};
use cqm_model::{AttrValue, Code, Component, FacilityLocation, Interval, IntervalBound, Quantity};
use serde_json::{Map, Number, Value, json};

use crate::error::Result;

/// Classify a raw event-side value and extract it.
pub fn extract_json(raw: &Value) -> Result<Value> {
    Ok(extract(&AttrValue::from_json(raw)?))
}

/// Reshape one event value into its record form.
///
/// | event value | record value |
/// |-------------|--------------|
/// | instant | epoch seconds |
/// | interval | `[low, high]`, open-ended `high` becomes `null` |
/// | facility location | `{code, locationPeriod}` |
/// | component | `{code, result}` |
/// | code | `{code, codeSystem, title}` |
/// | quantity | `{units, scalar}` |
/// | bare number | `{units: "", scalar}` |
pub fn extract(value: &AttrValue) -> Value {
    match value {
        AttrValue::Null => Value::Null,
        AttrValue::Instant(instant) => Value::from(to_epoch(instant)),
        AttrValue::Interval(interval) => extract_interval(interval),
        AttrValue::Facility(facility) => extract_facility(facility),
        AttrValue::Component(component) => extract_component(component),
        AttrValue::Code(code) => extract_code(code),
        AttrValue::Quantity(quantity) => extract_quantity(quantity),
        AttrValue::Number(number) => json!({"units": "", "scalar": number.to_string()}),
        AttrValue::Text(text) => Value::String(text.clone()),
        AttrValue::List(items) => Value::Array(items.iter().map(extract).collect()),
        AttrValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), extract(value)))
                .collect(),
        ),
    }
}

pub fn extract_code(code: &Code) -> Value {
    let mut map = Map::new();
    map.insert("code".to_string(), Value::String(code.code.clone()));
    map.insert(
        "codeSystem".to_string(),
        Value::String(code.code_system.clone()),
    );
    if let Some(descriptor) = &code.descriptor {
        map.insert("title".to_string(), Value::String(descriptor.clone()));
    }
    Value::Object(map)
}

pub fn extract_quantity(quantity: &Quantity) -> Value {
    json!({"units": quantity.unit, "scalar": quantity.scalar_string()})
}

/// `[low, high]`; a `high` at the open-ended sentinel is treated as absent.
pub fn extract_interval(interval: &Interval) -> Value {
    let low = interval.low.as_ref().map_or(Value::Null, extract_bound);
    let high = match &interval.high {
        Some(IntervalBound::Instant(instant)) if is_open_ended(instant) => Value::Null,
        Some(bound) => extract_bound(bound),
        None => Value::Null,
    };
    Value::Array(vec![low, high])
}

fn extract_bound(bound: &IntervalBound) -> Value {
    match bound {
        IntervalBound::Instant(instant) => Value::Number(Number::from(to_epoch(instant))),
        IntervalBound::Quantity(quantity) => extract_quantity(quantity),
    }
}

fn extract_facility(facility: &FacilityLocation) -> Value {
    json!({
        "code": facility.code.as_ref().map_or(Value::Null, extract_code),
        "locationPeriod": facility
            .location_period
            .as_ref()
            .map_or(Value::Null, extract_interval),
    })
}

fn extract_component(component: &Component) -> Value {
    json!({
        "code": component.code.as_ref().map_or(Value::Null, extract_code),
        "result": component.result.as_deref().map_or(Value::Null, extract),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_high_becomes_null() {
        let raw = json!({"low": 100, "high": "9999-12-31T23:59:59.99+0000"});
        assert_eq!(extract_json(&raw).unwrap(), json!([100, null]));
    }

    #[test]
    fn numbers_stringify_like_json() {
        assert_eq!(
            extract_json(&json!(5)).unwrap(),
            json!({"units": "", "scalar": "5"})
        );
        assert_eq!(
            extract_json(&json!({"value": 5.5, "unit": "mg"})).unwrap(),
            json!({"units": "mg", "scalar": "5.5"})
        );
    }

    #[test]
    fn code_keeps_descriptor_as_title() {
        let raw = json!({"code": "419099009", "codeSystem": "SNOMED-CT", "descriptor": "Dead"});
        assert_eq!(
            extract_json(&raw).unwrap(),
            json!({"code": "419099009", "codeSystem": "SNOMED-CT", "title": "Dead"})
        );
    }

    #[test]
    fn temporal_strings_become_epoch_seconds() {
        assert_eq!(
            extract_json(&json!("2012-04-06T08:00:00Z")).unwrap(),
            json!(1_333_699_200)
        );
    }

    #[test]
    fn plain_maps_recurse_with_keys_unchanged() {
        let raw = json!({"note": "text", "when": "2012-04-06T08:00:00Z"});
        assert_eq!(
            extract_json(&raw).unwrap(),
            json!({"note": "text", "when": 1_333_699_200})
        );
    }

    #[test]
    fn booleans_are_fatal() {
        assert!(extract_json(&json!([true])).is_err());
    }
}
