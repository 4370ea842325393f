use std::path::PathBuf;
use std::sync::LazyLock;

use cqm_core::{
    ConverterOptions, EventToRecordConverter, MappingMaterializer, MeasureContext,
    RecordToEventConverter, StaticMaterializer,
};
use cqm_map::section_for;
use cqm_model::{
    ClinicalEvent, ClinicalRecord, Code, Concept, EventCategory, Patient, SourceDataCriterion,
    ValueSet,
};
use cqm_standards::StandardsRegistry;
use proptest::prelude::*;
use serde_json::json;

static REGISTRY: LazyLock<StandardsRegistry> = LazyLock::new(|| {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards");
    StandardsRegistry::verify_and_load(&dir)
        .expect("bundled standards")
        .0
});

static TO_RECORD: LazyLock<EventToRecordConverter> = LazyLock::new(|| {
    EventToRecordConverter::new(&REGISTRY, ConverterOptions::default()).expect("converter")
});

static TO_PATIENT: LazyLock<RecordToEventConverter> = LazyLock::new(|| {
    RecordToEventConverter::new(&REGISTRY, ConverterOptions::default()).expect("converter")
});

fn patient(events: Vec<ClinicalEvent>) -> Patient {
    Patient {
        data_elements: events,
        ..Patient::default()
    }
}

#[test]
fn laboratory_events_land_in_vital_signs() {
    let event: ClinicalEvent = serde_json::from_value(json!({
        "_type": "QDM::LaboratoryTestPerformed",
        "category": "laboratory",
        "status": "performed",
        "dataElementCodes": [{"code": "2093-3", "codeSystem": "LOINC"}]
    }))
    .unwrap();
    let record = TO_RECORD.to_record(&patient(vec![event])).unwrap();
    assert_eq!(record.section("vital_signs").len(), 1);
    assert!(record.section("laboratory_tests").is_empty());
    assert_eq!(record.section("vital_signs")[0].entry_type, "VitalSign");
}

#[test]
fn lab_entry_snapshot() {
    let event: ClinicalEvent = serde_json::from_value(json!({
        "_type": "LaboratoryTestPerformed",
        "category": "laboratory_test",
        "status": "performed",
        "dataElementCodes": [{"code": "2093-3", "codeSystem": "LOINC"}],
        "description": "Laboratory Test, Performed: Cholesterol",
        "hqmfOid": "2.16.840.1.113883.3.560.1.5",
        "relevantPeriod": {"low": "2012-04-06T08:00:00Z", "high": null},
        "resultDatetime": "2012-04-06T09:00:00Z",
        "result": {"value": 180, "unit": "mg/dL"}
    }))
    .unwrap();
    let record = TO_RECORD.to_record(&patient(vec![event])).unwrap();
    let entry = &record.section("vital_signs")[0];
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(entry, @r#"
        {
          "_type": "VitalSign",
          "codes": {
            "LOINC": [
              "2093-3"
            ]
          },
          "description": "Laboratory Test, Performed: Cholesterol",
          "oid": "2.16.840.1.113883.3.560.1.5",
          "result_date_time": 1333702800,
          "start_time": 1333699200,
          "status_code": {
            "HL7 ActStatus": [
              "performed"
            ]
          },
          "values": [
            {
              "_type": "PhysicalQuantityResultValue",
              "scalar": "180",
              "units": "mg/dL"
            }
          ]
        }
        "#);
    });
}

#[test]
fn communication_entries_carry_direction() {
    let event = ClinicalEvent::new("CommunicationFromPatientToProvider", EventCategory::Communication)
        .with_code(Code::new("312904009", "SNOMED-CT"));
    let record = TO_RECORD.to_record(&patient(vec![event])).unwrap();
    let entry = &record.section("communications")[0];
    assert_eq!(
        entry.attributes["direction"],
        json!("communication_from_patient_to_provider")
    );
}

#[test]
fn uncategorized_and_unknown_events() {
    let mut uncategorized = ClinicalEvent::new("EncounterPerformed", EventCategory::Encounter)
        .with_code(Code::new("99201", "CPT"));
    uncategorized.category = None;
    let unknown = ClinicalEvent::new("ImagingPerformed", EventCategory::Procedure)
        .with_code(Code::new("1", "CPT"));
    let record = TO_RECORD
        .to_record(&patient(vec![uncategorized, unknown]))
        .unwrap();
    assert_eq!(record.entry_count(), 1);
    let entry = &record.section("procedures")[0];
    assert_eq!(entry.codes["CPT"], vec!["1".to_string()]);
    assert!(entry.attributes.is_empty());
}

#[test]
fn gender_without_birthdate_gives_sex_only() {
    let record: ClinicalRecord = serde_json::from_value(json!({"gender": "M"})).unwrap();
    let patient = TO_PATIENT
        .to_patient(&record, &StaticMaterializer::default())
        .unwrap();
    assert_eq!(patient.data_elements.len(), 1);
    let sex = &patient.data_elements[0];
    assert_eq!(sex.type_name(), "PatientCharacteristicSex");
    assert_eq!(sex.data_element_codes[0].code, "M");
    assert_eq!(sex.data_element_codes[0].code_system, "AdministrativeGender");
    assert_eq!(
        sex.data_element_codes[0].code_system_oid.as_deref(),
        Some("2.16.840.1.113883.5.1")
    );
    assert!(patient.birth_datetime.is_none());
}

#[test]
fn materialized_dicts_are_normalized() {
    let record: ClinicalRecord = serde_json::from_value(json!({"first": "Ada"})).unwrap();
    let materializer = StaticMaterializer::from_json(json!({
        "EncounterPerformed": [{
            "data_element_codes": [{"code": "99201", "system": "CPT", "display": "Visit"}],
            "relevant_period": {"low": "2012-04-06T08:00:00Z", "high": "9999-12-31T23:59:59.99+0000"},
            "description": "Encounter, Performed: Visit"
        }]
    }))
    .unwrap();
    let patient = TO_PATIENT.to_patient(&record, &materializer).unwrap();
    assert_eq!(patient.given_names, vec!["Ada".to_string()]);
    let encounter = &patient.data_elements[0];
    assert_eq!(encounter.category, Some(EventCategory::Encounter));
    assert_eq!(encounter.status.as_deref(), Some("performed"));
    assert_eq!(encounter.data_element_codes[0].descriptor.as_deref(), Some("Visit"));
    assert_eq!(
        encounter.data_element_codes[0].code_system_oid.as_deref(),
        Some("2.16.840.1.113883.6.12")
    );
    assert!(encounter.attribute("relevantPeriod").is_some());
}

#[test]
fn measure_assigns_criterion_oids() {
    let description = "Laboratory Test, Performed: Foo";
    let criterion = |id: &str, code_list_id: &str, oid: &str| SourceDataCriterion {
        id: id.to_string(),
        description: description.to_string(),
        code_list_id: Some(code_list_id.to_string()),
        hqmf_oid: Some(oid.to_string()),
        ..SourceDataCriterion::default()
    };
    let value_set = |oid: &str, code: &str| ValueSet {
        oid: oid.to_string(),
        concepts: vec![Concept {
            code: code.to_string(),
            code_system_name: "LOINC".to_string(),
            ..Concept::default()
        }],
        ..ValueSet::default()
    };
    let measure = MeasureContext::new(
        vec![criterion("a", "1.1", "oid-a"), criterion("b", "2.2", "oid-b")],
        vec![value_set("1.1", "111-1"), value_set("2.2", "222-2")],
    );
    let materializer = StaticMaterializer::from_json(json!({
        "LaboratoryTestPerformed": [{
            "dataElementCodes": [{"code": "222-2", "system": "LOINC"}],
            "description": description
        }]
    }))
    .unwrap();
    let patient = TO_PATIENT
        .to_patient_with_measure(&ClinicalRecord::default(), &materializer, &measure)
        .unwrap();
    assert_eq!(patient.data_elements[0].hqmf_oid.as_deref(), Some("oid-b"));
}

#[test]
fn record_round_trip_keeps_surviving_fields() {
    let record: ClinicalRecord = serde_json::from_value(json!({
        "first": "Ada",
        "last": "Lovelace",
        "gender": "F",
        "birthdate": -315_619_200,
        "race": {"code": "2106-3", "name": "White", "codeSystem": "CDC Race"},
        "bundle_id": "bundle-1",
        "measure_ids": ["40280381-3D61-56A7-013E-66A79D4A4A23"],
        "notes": "round trip",
        "encounters": [{
            "_id": {"$oid": "5a0c1e"},
            "_type": "Encounter",
            "codes": {"CPT": ["99201"]},
            "description": "Encounter, Performed: Office Visit",
            "status_code": {"HL7 ActStatus": ["performed"]},
            "start_date": 1_333_699_200,
            "end_date": 1_333_703_700
        }],
        "vital_signs": [{
            "_type": "VitalSign",
            "codes": {"LOINC": ["8480-6"]},
            "description": "Laboratory Test, Performed: Systolic",
            "status_code": {"HL7 ActStatus": ["performed"]},
            "start_time": 1_333_699_200,
            "end_time": 253_402_300_799i64,
            "values": [{"_type": "PhysicalQuantityResultValue", "scalar": "120", "units": "mm[Hg]"}]
        }]
    }))
    .unwrap();

    let materializer = MappingMaterializer::new(&REGISTRY).unwrap();
    let patient = TO_PATIENT.to_patient(&record, &materializer).unwrap();
    let back = TO_RECORD.to_record(&patient).unwrap();

    assert_eq!(back.first, record.first);
    assert_eq!(back.last, record.last);
    assert_eq!(back.gender, record.gender);
    assert_eq!(back.birthdate, record.birthdate);
    assert_eq!(back.race, record.race);
    assert_eq!(back.bundle_id, record.bundle_id);
    assert_eq!(back.metadata.get("notes"), record.metadata.get("notes"));
    assert_eq!(back.metadata.get("measure_ids"), record.metadata.get("measure_ids"));

    let encounter = &back.section("encounters")[0];
    assert_eq!(encounter.codes["CPT"], vec!["99201".to_string()]);
    assert_eq!(encounter.attributes["start_time"], json!(1_333_699_200));
    assert_eq!(encounter.attributes["end_time"], json!(1_333_703_700));

    let vital = &back.section("vital_signs")[0];
    assert_eq!(vital.status(), Some("performed"));
    assert!(!vital.attributes.contains_key("end_time"));
    assert_eq!(
        vital.attributes["values"],
        json!([{"_type": "PhysicalQuantityResultValue", "scalar": "120", "units": "mm[Hg]"}])
    );
}

const CATEGORIES: &[(&str, EventCategory)] = &[
    ("EncounterPerformed", EventCategory::Encounter),
    ("LaboratoryTestPerformed", EventCategory::LaboratoryTest),
    ("Diagnosis", EventCategory::Condition),
    ("MedicationActive", EventCategory::Medication),
    ("DeviceApplied", EventCategory::Device),
];

fn arb_event() -> impl Strategy<Value = ClinicalEvent> {
    (
        0..CATEGORIES.len(),
        prop::collection::vec(("[0-9]{1,6}", prop::sample::select(vec!["LOINC", "CPT", "SNOMED-CT"])), 0..3),
    )
        .prop_map(|(index, codes)| {
            let (type_name, category) = CATEGORIES[index];
            codes.into_iter().fold(
                ClinicalEvent::new(type_name, category),
                |event, (code, system)| event.with_code(Code::new(code, system)),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn only_coded_events_become_entries(events in prop::collection::vec(arb_event(), 0..8)) {
        let record = TO_RECORD.to_record(&patient(events.clone())).unwrap();
        let coded: Vec<&ClinicalEvent> = events
            .iter()
            .filter(|event| !event.data_element_codes.is_empty())
            .collect();
        prop_assert_eq!(record.entry_count(), coded.len());
        for (_, category) in CATEGORIES {
            let section = section_for(category.as_str());
            let expected = coded.iter().filter(|event| event.category == Some(*category)).count();
            prop_assert_eq!(record.section(&section).len(), expected);
        }
    }
}
