//! Flat record → typed event list.

use std::collections::BTreeMap;

use cqm_map::AttributeMappingTable;
use cqm_model::{AttrValue, ClinicalEvent, ClinicalRecord, Code, EventCategory, Patient, from_epoch};
use cqm_standards::{CodeSystemOidTable, StandardsRegistry};
use cqm_transform::{fix_infinity_dates, normalize_keys, rename_record_time_keys, serialize_identifiers};
use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn};

use crate::characteristics;
use crate::error::{ConvertError, Result};
use crate::materialize::{AttributeSpec, EventMaterializer};
use crate::measure::MeasureContext;
use crate::metadata::copy_passthrough;
use crate::oids::OidResolver;
use crate::options::ConverterOptions;

/// Keys of a materialized event that are event fields, not attributes.
const CORE_KEYS: &[&str] = &[
    "_type",
    "dataElementCodes",
    "description",
    "hqmfOid",
    "category",
    "qdmCategory",
    "status",
    "qdmStatus",
];

/// Converts flat records into patients.
///
/// Build once and reuse; construction builds the attribute mapping table.
#[derive(Debug, Clone)]
pub struct RecordToEventConverter {
    table: AttributeMappingTable,
    attribute_spec: AttributeSpec,
    code_systems: CodeSystemOidTable,
    options: ConverterOptions,
}

impl RecordToEventConverter {
    pub fn new(registry: &StandardsRegistry, options: ConverterOptions) -> Result<Self> {
        let table = AttributeMappingTable::build(&registry.datatypes)?;
        let attribute_spec = table.attribute_spec();
        Ok(Self {
            table,
            attribute_spec,
            code_systems: registry.code_systems.clone(),
            options,
        })
    }

    pub fn attribute_spec(&self) -> &AttributeSpec {
        &self.attribute_spec
    }

    pub fn to_patient(&self, record: &ClinicalRecord, materializer: &dyn EventMaterializer) -> Result<Patient> {
        self.convert(record, materializer, None)
    }

    /// As [`Self::to_patient`], with characteristic codes and criterion OIDs
    /// taken from a measure.
    pub fn to_patient_with_measure(
        &self,
        record: &ClinicalRecord,
        materializer: &dyn EventMaterializer,
        measure: &MeasureContext,
    ) -> Result<Patient> {
        self.convert(record, materializer, Some(measure))
    }

    fn convert(
        &self,
        record: &ClinicalRecord,
        materializer: &dyn EventMaterializer,
        measure: Option<&MeasureContext>,
    ) -> Result<Patient> {
        let span = info_span!("record_to_patient", bundle_id = record.bundle_id.as_deref().unwrap_or(""));
        let _guard = span.enter();

        let mut record_json = serialize_identifiers(serde_json::to_value(record)?);
        rename_record_time_keys(&mut record_json);
        fix_infinity_dates(&mut record_json);

        let materialized = materializer.materialize(&record_json, &self.attribute_spec)?;
        let mut events = Vec::new();
        for (type_name, dicts) in materialized {
            for dict in dicts {
                events.push(self.build_event(&type_name, normalize_keys(dict))?);
            }
        }
        events.extend(characteristics::synthesize(record, measure));

        if let Some(measure) = measure {
            for event in &mut events {
                assign_criterion_oid(event, measure);
            }
        }
        if self.options.resolve_code_system_oids {
            let mut resolver = OidResolver::new(&self.code_systems);
            for event in &mut events {
                resolver.resolve_event(event);
            }
        }

        let mut patient = Patient {
            given_names: record.first.iter().cloned().collect(),
            family_name: record.last.clone(),
            bundle_id: record.bundle_id.clone(),
            birth_datetime: record.birthdate.and_then(from_epoch),
            data_elements: events,
            extended_data: Map::new(),
        };
        copy_passthrough(&record.metadata, &mut patient.extended_data);
        info!(events = patient.data_elements.len(), "record converted");
        Ok(patient)
    }

    fn build_event(&self, type_name: &str, dict: Value) -> Result<ClinicalEvent> {
        let Value::Object(dict) = dict else {
            return Err(ConvertError::Materializer(format!(
                "{type_name} event is not a JSON object"
            )));
        };
        let info = self.table.get(type_name);
        let category = match info {
            Some(info) => Some(info.category),
            None => {
                warn!(event_type = %type_name, "event type not in the mapping table");
                dict.get("category")
                    .or_else(|| dict.get("qdmCategory"))
                    .and_then(Value::as_str)
                    .map(str::parse::<EventCategory>)
                    .transpose()?
            }
        };
        let status = text(&dict, "status")
            .or_else(|| text(&dict, "qdmStatus"))
            .or_else(|| info.and_then(|info| info.status.clone()));

        let data_element_codes = match dict.get("dataElementCodes") {
            Some(Value::Array(codes)) => codes
                .iter()
                .filter(|code| !code.is_null())
                .map(|code| serde_json::from_value::<Code>(code.clone()))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        let mut attributes = BTreeMap::new();
        for (key, value) in &dict {
            if CORE_KEYS.contains(&key.as_str()) {
                continue;
            }
            let value = AttrValue::from_json(value)?;
            if !value.is_null() {
                attributes.insert(key.clone(), value);
            }
        }
        debug!(event_type = %type_name, attributes = attributes.len(), "event built");

        Ok(ClinicalEvent {
            event_type: type_name.to_string(),
            category,
            status,
            data_element_codes,
            hqmf_oid: text(&dict, "hqmfOid"),
            description: text(&dict, "description"),
            attributes,
        })
    }
}

fn text(dict: &Map<String, Value>, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_str).map(str::to_string)
}

fn assign_criterion_oid(event: &mut ClinicalEvent, measure: &MeasureContext) {
    if event.hqmf_oid.is_some() {
        return;
    }
    let Some(description) = event.description.as_deref() else {
        return;
    };
    if let Some(criterion) = measure.resolve_criterion(description, &event.data_element_codes) {
        event.hqmf_oid = criterion.hqmf_oid.clone();
    }
}
