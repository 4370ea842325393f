use std::fmt::Write as _;

use chrono::DateTime;
use serde_json::{Map, Value};

use super::{CompositeRule, RuleMetadata, UnpackContext, collection_members, tagged_collection};
use crate::error::{Result, TransformError};

/// Facility locations as a display collection.
///
/// Each member gets its code under `code`, the code title lifted into
/// `display`, and the location period as two strings formatted with
/// [`UnpackContext::facility_time_format`].
///
/// Period times are rendered in UTC, not the host's local zone, so the same
/// patient converts to the same record on every machine.
pub struct FacilityRule {
    metadata: RuleMetadata,
}

impl FacilityRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "facility",
                "facility",
                "Flatten facility locations into a display collection",
            ),
        }
    }
}

impl Default for FacilityRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeRule for FacilityRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(&self, ctx: &UnpackContext, attrs: &mut Map<String, Value>) -> Result<()> {
        let Some(raw) = attrs.get("facility") else {
            return Ok(());
        };
        let members = collection_members(raw)
            .into_iter()
            .filter_map(|member| match member {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .map(|member| facility_member(member, &ctx.facility_time_format))
            .collect::<Result<Vec<_>>>()?;
        attrs.insert("facility".to_string(), tagged_collection(members));
        Ok(())
    }
}

fn facility_member(member: Map<String, Value>, time_format: &str) -> Result<Value> {
    let mut out = Map::new();
    for (key, value) in member {
        if key == "locationPeriod" {
            let (low, high) = period_bounds(&value);
            if let Some(low) = low {
                out.insert(
                    "locationPeriodLow".to_string(),
                    Value::String(format_epoch(low, time_format)?),
                );
            }
            if let Some(high) = high {
                out.insert(
                    "locationPeriodHigh".to_string(),
                    Value::String(format_epoch(high, time_format)?),
                );
            }
        } else if key.starts_with("Code") || key == "code" {
            let mut code = value;
            if let Some(title) = code.as_object_mut().and_then(|map| map.remove("title")) {
                out.insert("display".to_string(), title);
            }
            out.insert("code".to_string(), code);
        } else {
            out.insert(key, value);
        }
    }
    Ok(Value::Object(out))
}

fn period_bounds(value: &Value) -> (Option<i64>, Option<i64>) {
    match value {
        Value::Array(pair) => (
            pair.first().and_then(Value::as_i64),
            pair.get(1).and_then(Value::as_i64),
        ),
        _ => (None, None),
    }
}

fn format_epoch(seconds: i64, time_format: &str) -> Result<String> {
    let instant = DateTime::from_timestamp(seconds, 0).ok_or_else(|| TransformError::Rule {
        rule: "facility".to_string(),
        message: format!("timestamp {seconds} is out of range"),
    })?;
    let mut formatted = String::new();
    write!(formatted, "{}", instant.format(time_format)).map_err(|_| TransformError::Rule {
        rule: "facility".to_string(),
        message: format!("invalid facility time format '{time_format}'"),
    })?;
    Ok(formatted)
}
