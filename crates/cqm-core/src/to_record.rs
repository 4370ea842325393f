//! Typed event list → flat record.

use std::collections::BTreeMap;

use cqm_map::{AttributeMappingTable, entry_type_for, record_class_for, section_for};
use cqm_model::time::to_epoch;
use cqm_model::{ClinicalEvent, ClinicalRecord, Code, EventCategory, Patient, RecordEntry};
use cqm_standards::StandardsRegistry;
use cqm_transform::{RuleExecutor, apply_negation, communication_direction, write_attribute};
use serde_json::{Value, json};
use tracing::{debug, info, info_span, warn};

use crate::characteristics;
use crate::error::Result;
use crate::metadata::copy_passthrough;
use crate::options::ConverterOptions;

/// Status code system on record entries.
pub const STATUS_CODE_SYSTEM: &str = "HL7 ActStatus";

/// Converts patients into flat records.
///
/// Build once and reuse; construction builds the attribute mapping table.
pub struct EventToRecordConverter {
    table: AttributeMappingTable,
    rules: RuleExecutor,
    options: ConverterOptions,
}

impl EventToRecordConverter {
    pub fn new(registry: &StandardsRegistry, options: ConverterOptions) -> Result<Self> {
        Ok(Self {
            table: AttributeMappingTable::build(&registry.datatypes)?,
            rules: RuleExecutor::with_default_rules(),
            options,
        })
    }

    /// Replace the composite rules, for callers that disable or add some.
    pub fn with_rules(mut self, rules: RuleExecutor) -> Self {
        self.rules = rules;
        self
    }

    pub fn to_record(&self, patient: &Patient) -> Result<ClinicalRecord> {
        let span = info_span!(
            "patient_to_record",
            bundle_id = patient.bundle_id.as_deref().unwrap_or("")
        );
        let _guard = span.enter();

        let mut record = ClinicalRecord::default();
        for event in &patient.data_elements {
            let Some(category) = event.category else {
                debug!(event_type = %event.event_type, "event has no category, skipping");
                continue;
            };
            if category == EventCategory::PatientCharacteristic {
                continue;
            }
            let section = section_for(category.as_str());
            if let Some(entry) = self.entry_for(event, category)? {
                record.push_entry(&section, entry);
            }
        }

        characteristics::apply_to_record(patient, &mut record);
        record.first = patient.given_names.first().cloned();
        record.last = patient.family_name.clone();
        record.bundle_id = patient.bundle_id.clone();
        if record.birthdate.is_none() {
            record.birthdate = patient.birth_datetime.as_ref().map(to_epoch);
        }
        copy_passthrough(&patient.extended_data, &mut record.metadata);
        info!(entries = record.entry_count(), "patient converted");
        Ok(record)
    }

    fn entry_for(&self, event: &ClinicalEvent, category: EventCategory) -> Result<Option<RecordEntry>> {
        let type_name = event.type_name();
        let mut entry = RecordEntry::new(entry_type_for(record_class_for(category.as_str())));
        entry.codes = codes_by_system(&event.data_element_codes);
        if self.options.drop_codeless_entries && !entry.has_codes() {
            debug!(event_type = %type_name, "event has no codes, dropping");
            return Ok(None);
        }
        entry.oid = event.hqmf_oid.clone();
        entry.description = event.description.clone();

        let info = self.table.get(type_name);
        let status = event
            .status
            .clone()
            .or_else(|| info.and_then(|info| info.status.clone()));
        if let Some(status) = status {
            entry.status_code = Some(json!({ STATUS_CODE_SYSTEM: [status] }));
        }

        match info {
            Some(info) => {
                for (attribute, target) in &info.mappings {
                    if let Some(value) = event.attribute(attribute) {
                        write_attribute(target, value, &mut entry.attributes);
                    }
                }
            }
            None => warn!(event_type = %type_name, "event type not in the mapping table, core fields only"),
        }
        apply_negation(&mut entry.attributes);
        self.rules
            .execute(&self.options.unpack_context(), &mut entry.attributes)?;
        if let Some(direction) = communication_direction(type_name) {
            entry
                .attributes
                .insert("direction".to_string(), Value::String(direction));
        }
        Ok(Some(entry))
    }
}

/// `{system: [code, ...]}`, systems sorted, codes in event order.
fn codes_by_system(codes: &[Code]) -> BTreeMap<String, Vec<String>> {
    let mut by_system: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for code in codes {
        by_system
            .entry(code.code_system.clone())
            .or_default()
            .push(code.code.clone());
    }
    by_system
}
