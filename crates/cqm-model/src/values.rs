//! Composite value types carried by typed events.
//!
//! These are the event-side shapes; the flat record keeps the same facts as
//! untyped JSON and the converter reshapes between the two.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};

use crate::attr::AttrValue;
use crate::time::format_timestamp;

/// A coded concept.
///
/// `code_system` holds the human-readable system name (for example `LOINC`);
/// `code_system_oid` is filled in from the code-system table and stays `None`
/// when the name is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub code: String,
    #[serde(default, alias = "system", alias = "code_system")]
    pub code_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_system_oid: Option<String>,
    #[serde(default, alias = "display", skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Code {
    pub fn new(code: impl Into<String>, code_system: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            code_system: code_system.into(),
            code_system_oid: None,
            descriptor: None,
            version: None,
        }
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    pub fn with_oid(mut self, oid: impl Into<String>) -> Self {
        self.code_system_oid = Some(oid.into());
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A measured amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    pub value: Option<Number>,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: Option<Number>, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// The value printed the way JSON prints it (`5`, `5.5`), empty when absent.
    pub fn scalar_string(&self) -> String {
        self.value.as_ref().map(Number::to_string).unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "value": self.value.clone().map_or(Value::Null, Value::Number),
            "unit": self.unit,
        })
    }
}

/// One end of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalBound {
    Instant(DateTime<FixedOffset>),
    Quantity(Quantity),
}

impl IntervalBound {
    pub fn as_instant(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            IntervalBound::Instant(instant) => Some(instant),
            IntervalBound::Quantity(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            IntervalBound::Instant(instant) => Value::String(format_timestamp(instant)),
            IntervalBound::Quantity(quantity) => quantity.to_json(),
        }
    }
}

/// A `{low, high}` range; either end may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interval {
    pub low: Option<IntervalBound>,
    pub high: Option<IntervalBound>,
    pub low_closed: Option<bool>,
    pub high_closed: Option<bool>,
}

impl Interval {
    pub fn between(low: Option<DateTime<FixedOffset>>, high: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            low: low.map(IntervalBound::Instant),
            high: high.map(IntervalBound::Instant),
            low_closed: None,
            high_closed: None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "low".to_string(),
            self.low.as_ref().map_or(Value::Null, IntervalBound::to_json),
        );
        map.insert(
            "high".to_string(),
            self.high.as_ref().map_or(Value::Null, IntervalBound::to_json),
        );
        if let Some(closed) = self.low_closed {
            map.insert("lowClosed".to_string(), Value::Bool(closed));
        }
        if let Some(closed) = self.high_closed {
            map.insert("highClosed".to_string(), Value::Bool(closed));
        }
        Value::Object(map)
    }
}

/// Where an encounter took place and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityLocation {
    pub code: Option<Code>,
    pub location_period: Option<Interval>,
}

impl FacilityLocation {
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code.as_ref().map_or(Value::Null, Code::to_json),
            "locationPeriod": self.location_period.as_ref().map_or(Value::Null, Interval::to_json),
        })
    }
}

/// One member of a multi-part result (a panel line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub code: Option<Code>,
    pub result: Option<Box<AttrValue>>,
}

impl Component {
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code.as_ref().map_or(Value::Null, Code::to_json),
            "result": self.result.as_ref().map_or(Value::Null, |r| r.to_json()),
        })
    }
}
