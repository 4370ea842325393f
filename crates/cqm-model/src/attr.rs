//! The attribute value sum type.
//!
//! Raw attribute JSON is classified exactly once, in [`AttrValue::from_json`],
//! by looking at which keys a map carries. Everything downstream matches on
//! the variant instead of re-inspecting key sets.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{ModelError, Result};
use crate::time::{
    format_timestamp, from_epoch, is_date_structure, parse_date_structure, parse_timestamp,
};
use crate::values::{Code, Component, FacilityLocation, Interval, IntervalBound, Quantity};

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Null,
    Instant(DateTime<FixedOffset>),
    Interval(Interval),
    Facility(FacilityLocation),
    Component(Component),
    Code(Code),
    Quantity(Quantity),
    Number(Number),
    Text(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Classify a raw JSON value.
    ///
    /// Shapes are tried in a fixed priority order: null, temporal, `low`,
    /// `locationPeriod`, `result`, `code`, `unit`, array, number, string,
    /// plain map. Anything else (booleans) is an unsupported shape.
    pub fn from_json(value: &Value) -> Result<Self> {
        parse_at(value, "$")
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Instant(instant) => Value::String(format_timestamp(instant)),
            AttrValue::Interval(interval) => interval.to_json(),
            AttrValue::Facility(facility) => facility.to_json(),
            AttrValue::Component(component) => component.to_json(),
            AttrValue::Code(code) => code.to_json(),
            AttrValue::Quantity(quantity) => quantity.to_json(),
            AttrValue::Number(number) => Value::Number(number.clone()),
            AttrValue::Text(text) => Value::String(text.clone()),
            AttrValue::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_code(&self) -> Option<&Code> {
        match self {
            AttrValue::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_interval(&self) -> Option<&Interval> {
        match self {
            AttrValue::Interval(interval) => Some(interval),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttrValue::Instant(instant) => Some(instant),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        AttrValue::from_json(&raw).map_err(D::Error::custom)
    }
}

fn parse_at(value: &Value, path: &str) -> Result<AttrValue> {
    match value {
        Value::Null => Ok(AttrValue::Null),
        Value::Bool(_) => Err(unsupported(path, "boolean")),
        Value::Number(number) => Ok(AttrValue::Number(number.clone())),
        Value::String(text) => Ok(match parse_timestamp(text) {
            Some(instant) => AttrValue::Instant(instant),
            None => AttrValue::Text(text.clone()),
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_at(item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>>>()
            .map(AttrValue::List),
        Value::Object(map) => parse_object(map, path),
    }
}

fn parse_object(map: &Map<String, Value>, path: &str) -> Result<AttrValue> {
    if is_date_structure(map) {
        return parse_date_structure(map)
            .map(AttrValue::Instant)
            .ok_or_else(|| invalid_timestamp(path, &Value::Object(map.clone())));
    }
    if map.contains_key("low") {
        return parse_interval(map, path).map(AttrValue::Interval);
    }
    if map.contains_key("locationPeriod") {
        let code = parse_optional_code(map.get("code"), &format!("{path}.code"))?;
        let location_period = match map.get("locationPeriod") {
            Some(Value::Object(period)) => {
                Some(parse_interval(period, &format!("{path}.locationPeriod"))?)
            }
            None | Some(Value::Null) => None,
            Some(other) => return Err(unsupported(&format!("{path}.locationPeriod"), kind(other))),
        };
        return Ok(AttrValue::Facility(FacilityLocation {
            code,
            location_period,
        }));
    }
    if map.contains_key("result") {
        let code = parse_optional_code(map.get("code"), &format!("{path}.code"))?;
        let result = match map.get("result") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(Box::new(parse_at(raw, &format!("{path}.result"))?)),
        };
        return Ok(AttrValue::Component(Component { code, result }));
    }
    if let Some(code) = map.get("code").and_then(scalar_string) {
        return Ok(AttrValue::Code(parse_code_fields(code, map)));
    }
    if map.contains_key("unit") {
        return Ok(AttrValue::Quantity(parse_quantity(map)));
    }
    map.iter()
        .map(|(key, value)| Ok((key.clone(), parse_at(value, &format!("{path}.{key}"))?)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(AttrValue::Map)
}

fn parse_interval(map: &Map<String, Value>, path: &str) -> Result<Interval> {
    Ok(Interval {
        low: parse_bound(map.get("low"), &format!("{path}.low"))?,
        high: parse_bound(map.get("high"), &format!("{path}.high"))?,
        low_closed: map.get("lowClosed").and_then(Value::as_bool),
        high_closed: map.get("highClosed").and_then(Value::as_bool),
    })
}

fn parse_bound(value: Option<&Value>, path: &str) -> Result<Option<IntervalBound>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_i64()
            .and_then(from_epoch)
            .map(|instant| Some(IntervalBound::Instant(instant)))
            .ok_or_else(|| invalid_timestamp(path, value)),
        Value::String(text) => parse_timestamp(text)
            .map(|instant| Some(IntervalBound::Instant(instant)))
            .ok_or_else(|| invalid_timestamp(path, value)),
        Value::Object(map) if is_date_structure(map) => parse_date_structure(map)
            .map(|instant| Some(IntervalBound::Instant(instant)))
            .ok_or_else(|| invalid_timestamp(path, value)),
        Value::Object(map) if map.contains_key("unit") || map.contains_key("value") => {
            Ok(Some(IntervalBound::Quantity(parse_quantity(map))))
        }
        other => Err(unsupported(path, kind(other))),
    }
}

fn parse_optional_code(value: Option<&Value>, path: &str) -> Result<Option<Code>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => match map.get("code").and_then(scalar_string) {
            Some(code) => Ok(Some(parse_code_fields(code, map))),
            None => Err(unsupported(path, "object without code")),
        },
        Some(other) => Err(unsupported(path, kind(other))),
    }
}

fn parse_code_fields(code: String, map: &Map<String, Value>) -> Code {
    let first_text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| map.get(*key).and_then(scalar_string))
    };
    Code {
        code,
        code_system: first_text(&["codeSystem", "system", "code_system"]).unwrap_or_default(),
        code_system_oid: first_text(&["codeSystemOid", "code_system_oid"]),
        descriptor: first_text(&["descriptor", "display", "title"]),
        version: first_text(&["version"]),
    }
}

fn parse_quantity(map: &Map<String, Value>) -> Quantity {
    let value = match map.get("value") {
        Some(Value::Number(number)) => Some(number.clone()),
        Some(Value::String(text)) => serde_json::from_str::<Number>(text.trim()).ok(),
        _ => None,
    };
    let unit = map
        .get("unit")
        .and_then(scalar_string)
        .unwrap_or_default();
    Quantity { value, unit }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unsupported(path: &str, found: &'static str) -> ModelError {
    ModelError::UnsupportedValue {
        path: path.to_string(),
        found,
    }
}

fn invalid_timestamp(path: &str, value: &Value) -> ModelError {
    ModelError::InvalidTimestamp {
        path: path.to_string(),
        value: value.to_string(),
    }
}
