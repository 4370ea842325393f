//! Patient characteristics that live in record scalars.
//!
//! Birthdate, expiry, race, ethnicity and sex are top-level record fields,
//! not section entries, so they are carried across by hand in both
//! directions. Payer events come from `insurance_providers`.

use cqm_model::time::{from_epoch, to_epoch};
use cqm_model::{
    AttrValue, ClinicalEvent, ClinicalRecord, Code, CodedConcept, EventCategory, Interval,
    IntervalBound, Patient,
};
use serde_json::Value;
use tracing::debug;

use crate::measure::{BIRTHDATE_DEFINITION, EXPIRED_DEFINITION, MeasureContext};

pub const BIRTHDATE_TYPE: &str = "PatientCharacteristicBirthdate";
pub const EXPIRED_TYPE: &str = "PatientCharacteristicExpired";
pub const ETHNICITY_TYPE: &str = "PatientCharacteristicEthnicity";
pub const RACE_TYPE: &str = "PatientCharacteristicRace";
pub const SEX_TYPE: &str = "PatientCharacteristicSex";
pub const PAYER_TYPE: &str = "PatientCharacteristicPayer";

pub const RACE_CODE_SYSTEM: &str = "CDC Race";
pub const SEX_CODE_SYSTEM: &str = "AdministrativeGender";

pub fn birthdate_code() -> Code {
    Code::new("21112-8", "LOINC").with_descriptor("Birth date")
}

pub fn expired_code() -> Code {
    Code::new("419099009", "SNOMED-CT").with_descriptor("Dead")
}

/// Characteristic events for a record, in a fixed order. Absent fields
/// produce no event.
pub fn synthesize(record: &ClinicalRecord, measure: Option<&MeasureContext>) -> Vec<ClinicalEvent> {
    let concept = |definition: &str, fallback: Code| match measure {
        Some(measure) => measure.concept_for_definition(definition, fallback),
        None => fallback,
    };
    let mut events = Vec::new();

    if let Some(birth) = record.birthdate.and_then(from_epoch) {
        events.push(
            characteristic(BIRTHDATE_TYPE)
                .with_code(concept(BIRTHDATE_DEFINITION, birthdate_code()))
                .with_attribute("birthDatetime", AttrValue::Instant(birth)),
        );
    }
    if let Some(ethnicity) = &record.ethnicity {
        events.push(characteristic(ETHNICITY_TYPE).with_code(coded_concept(ethnicity)));
    }
    if let Some(death) = record.deathdate.and_then(from_epoch) {
        events.push(
            characteristic(EXPIRED_TYPE)
                .with_code(concept(EXPIRED_DEFINITION, expired_code()))
                .with_attribute("expiredDatetime", AttrValue::Instant(death)),
        );
    }
    events.extend(payers(record));
    if let Some(race) = &record.race {
        events.push(characteristic(RACE_TYPE).with_code(coded_concept(race)));
    }
    if let Some(gender) = &record.gender {
        events.push(characteristic(SEX_TYPE).with_code(Code::new(gender, SEX_CODE_SYSTEM)));
    }
    events
}

/// Write characteristic events back onto the record scalars.
pub fn apply_to_record(patient: &Patient, record: &mut ClinicalRecord) {
    for event in patient.data_elements.iter().filter(|event| event.is_patient_characteristic()) {
        match event.type_name() {
            BIRTHDATE_TYPE => {
                if let Some(birth) = event.attribute("birthDatetime").and_then(AttrValue::as_instant) {
                    record.birthdate = Some(to_epoch(birth));
                }
            }
            EXPIRED_TYPE => {
                if let Some(death) = event.attribute("expiredDatetime").and_then(AttrValue::as_instant) {
                    record.deathdate = Some(to_epoch(death));
                }
                record.expired = Some(true);
            }
            ETHNICITY_TYPE => {
                if let Some(code) = event.data_element_codes.first() {
                    record.ethnicity = Some(concept_from_code(code));
                }
            }
            RACE_TYPE => {
                if let Some(code) = event.data_element_codes.first() {
                    record.race = Some(concept_from_code(code));
                }
            }
            SEX_TYPE => {
                if let Some(code) = event.data_element_codes.first() {
                    record.gender = Some(code.code.clone());
                }
            }
            other => debug!(event_type = %other, "characteristic has no record field"),
        }
    }
}

fn characteristic(type_name: &str) -> ClinicalEvent {
    ClinicalEvent::new(type_name, EventCategory::PatientCharacteristic)
}

fn coded_concept(concept: &CodedConcept) -> Code {
    let mut code = Code::new(&concept.code, RACE_CODE_SYSTEM);
    code.descriptor = concept.name.clone();
    code
}

fn concept_from_code(code: &Code) -> CodedConcept {
    CodedConcept {
        code: code.code.clone(),
        name: code.descriptor.clone(),
        code_system: code.code_system.clone(),
    }
}

/// One payer event per insurance provider with a start or end time.
fn payers(record: &ClinicalRecord) -> Vec<ClinicalEvent> {
    let Some(Value::Array(providers)) = record.metadata.get("insurance_providers") else {
        return Vec::new();
    };
    providers
        .iter()
        .filter_map(|provider| {
            let start = epoch_field(provider, "start_time");
            let end = epoch_field(provider, "end_time");
            if start.is_none() && end.is_none() {
                return None;
            }
            let mut event = characteristic(PAYER_TYPE).with_attribute(
                "relevantPeriod",
                AttrValue::Interval(Interval {
                    low: start.map(IntervalBound::Instant),
                    high: end.map(IntervalBound::Instant),
                    ..Interval::default()
                }),
            );
            event.data_element_codes = provider_codes(provider);
            Some(event)
        })
        .collect()
}

fn epoch_field(provider: &Value, key: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    match provider.get(key)? {
        Value::Number(number) => number.as_i64().and_then(from_epoch),
        Value::String(text) => text.trim().parse::<i64>().ok().and_then(from_epoch),
        _ => None,
    }
}

fn provider_codes(provider: &Value) -> Vec<Code> {
    provider
        .get("codes")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .flat_map(|(system, codes)| {
            codes
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(move |code| Code::new(code, system))
        })
        .collect()
}
