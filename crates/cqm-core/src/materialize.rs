//! The event materializer boundary.
//!
//! A materializer turns a flat record (already renamed and cleaned, as JSON)
//! into raw attribute dictionaries grouped by event type name. The converter
//! owns everything before and after that call.

use std::collections::BTreeMap;

use cqm_map::{AttributeMappingTable, AttributeTarget, TypeInfo, entry_type_for, record_class_for, section_for};
use cqm_model::{EventCategory, is_record_section};
use cqm_standards::StandardsRegistry;
use cqm_transform::{communication_direction, split_to_event_json, to_event_json};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ConvertError, Result};

/// `{typeName: [declared event attributes]}`.
pub type AttributeSpec = BTreeMap<String, Vec<String>>;

/// `{typeName: [raw attribute dictionaries]}`.
pub type MaterializedEvents = BTreeMap<String, Vec<Value>>;

pub trait EventMaterializer {
    fn materialize(&self, record: &Value, attribute_spec: &AttributeSpec) -> Result<MaterializedEvents>;
}

/// Returns events materialized ahead of time, whatever the record.
#[derive(Debug, Clone, Default)]
pub struct StaticMaterializer {
    events: MaterializedEvents,
}

impl StaticMaterializer {
    pub fn new(events: MaterializedEvents) -> Self {
        Self { events }
    }

    /// Read `{typeName: [dict, ...]}` JSON.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ConvertError::Materializer(
                "materialized events must be an object keyed by event type".to_string(),
            ));
        };
        let mut events = MaterializedEvents::new();
        for (type_name, dicts) in map {
            let Value::Array(dicts) = dicts else {
                return Err(ConvertError::Materializer(format!(
                    "materialized events for {type_name} must be an array"
                )));
            };
            events.insert(type_name, dicts);
        }
        Ok(Self { events })
    }
}

impl EventMaterializer for StaticMaterializer {
    fn materialize(&self, _record: &Value, _attribute_spec: &AttributeSpec) -> Result<MaterializedEvents> {
        Ok(self.events.clone())
    }
}

/// Materializes events by running the attribute mapping table backwards.
///
/// Each section entry is matched to an event type by section, entry `_type`,
/// status and, for communications, `direction`. When several types still
/// match, a description prefix such as `Procedure, Performed:` picks one,
/// else the first type by name wins.
#[derive(Debug, Clone)]
pub struct MappingMaterializer {
    table: AttributeMappingTable,
}

impl MappingMaterializer {
    pub fn new(registry: &StandardsRegistry) -> Result<Self> {
        Ok(Self {
            table: AttributeMappingTable::build(&registry.datatypes)?,
        })
    }

    pub fn from_table(table: AttributeMappingTable) -> Self {
        Self { table }
    }

    fn event_type_for<'t>(&'t self, section: &str, entry: &Map<String, Value>) -> Option<(&'t str, &'t TypeInfo)> {
        let entry_type = entry.get("_type").and_then(Value::as_str);
        let status = entry_status(entry);
        let direction = entry.get("direction").and_then(Value::as_str);

        let candidates: Vec<(&str, &TypeInfo)> = self
            .table
            .iter()
            .filter(|(_, info)| info.category != EventCategory::PatientCharacteristic)
            .filter(|(_, info)| section_for(info.category.as_str()) == section)
            .filter(|(_, info)| {
                entry_type.is_none_or(|entry_type| {
                    entry_type_for(record_class_for(info.category.as_str())) == entry_type
                })
            })
            .filter(|(_, info)| match (&info.status, status) {
                (Some(expected), Some(status)) => expected == status,
                _ => true,
            })
            .filter(|(name, _)| match (communication_direction(name), direction) {
                (Some(expected), Some(direction)) => expected == direction,
                _ => true,
            })
            .collect();

        if candidates.len() > 1
            && let Some(prefix) = entry
                .get("description")
                .and_then(Value::as_str)
                .and_then(description_type_name)
            && let Some(found) = candidates.iter().find(|(name, _)| *name == prefix)
        {
            return Some(*found);
        }
        if candidates.len() > 1 {
            debug!(
                %section,
                candidates = candidates.len(),
                "several event types match the entry, taking the first"
            );
        }
        candidates.first().copied()
    }
}

impl EventMaterializer for MappingMaterializer {
    fn materialize(&self, record: &Value, attribute_spec: &AttributeSpec) -> Result<MaterializedEvents> {
        let Value::Object(record) = record else {
            return Err(ConvertError::Materializer("record must be a JSON object".to_string()));
        };
        let mut events = MaterializedEvents::new();
        for (section, entries) in record.iter().filter(|(key, _)| is_record_section(key)) {
            for entry in entries.as_array().into_iter().flatten() {
                let Some(entry) = entry.as_object() else {
                    continue;
                };
                let Some((type_name, info)) = self.event_type_for(section, entry) else {
                    debug!(%section, "no event type for entry, skipping");
                    continue;
                };
                let declared = attribute_spec.get(type_name);
                let raw = raw_event(entry, info, declared);
                trace!(event_type = %type_name, "materialized event");
                events.entry(type_name.to_string()).or_default().push(raw);
            }
        }
        Ok(events)
    }
}

fn raw_event(entry: &Map<String, Value>, info: &TypeInfo, declared: Option<&Vec<String>>) -> Value {
    let mut raw = Map::new();
    for (attribute, target) in &info.mappings {
        if declared.is_some_and(|declared| !declared.contains(attribute)) {
            continue;
        }
        let value = match target {
            AttributeTarget::Single(name) => match entry.get(name) {
                Some(value) if !value.is_null() => to_event_json(attribute, value),
                _ => continue,
            },
            AttributeTarget::Split { low, high } => {
                let low = entry.get(low).unwrap_or(&Value::Null);
                let high = entry.get(high).unwrap_or(&Value::Null);
                if low.is_null() && high.is_null() {
                    continue;
                }
                split_to_event_json(low, high)
            }
        };
        raw.insert(attribute.clone(), value);
    }

    let codes: Vec<Value> = entry
        .get("codes")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .flat_map(|(system, codes)| {
            codes
                .as_array()
                .into_iter()
                .flatten()
                .map(move |code| serde_json::json!({"code": code, "system": system}))
        })
        .collect();
    raw.insert("dataElementCodes".to_string(), Value::Array(codes));
    if let Some(description) = entry.get("description") {
        raw.insert("description".to_string(), description.clone());
    }
    if let Some(oid) = entry.get("oid") {
        raw.insert("hqmfOid".to_string(), oid.clone());
    }
    Value::Object(raw)
}

fn entry_status(entry: &Map<String, Value>) -> Option<&str> {
    match entry.get("status_code")? {
        Value::String(status) => Some(status),
        Value::Object(map) => map
            .values()
            .find_map(|codes| codes.as_array()?.first()?.as_str()),
        _ => None,
    }
}

/// `Laboratory Test, Performed: LDL` → `LaboratoryTestPerformed`.
fn description_type_name(description: &str) -> Option<String> {
    let (prefix, _) = description.split_once(':')?;
    let name: String = prefix
        .split([',', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect();
    (!name.is_empty()).then_some(name)
}
