//! Tests for cqm-model types.

use cqm_model::{
    AttrValue, ClinicalEvent, ClinicalRecord, EventCategory, IntervalBound, OPEN_ENDED_EPOCH,
    Patient, is_open_ended,
};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn patient_round_trips_through_json() {
    let patient: Patient = serde_json::from_value(json!({
        "givenNames": ["Jane"],
        "familyName": "Doe",
        "bundleId": "bundle-1",
        "dataElements": [{
            "_type": "MedicationOrder",
            "category": "medication",
            "status": "order",
            "dataElementCodes": [{"code": "197361", "codeSystem": "RxNorm"}],
            "dosage": {"value": 5, "unit": "mg"},
            "authorDatetime": "2012-04-06T08:00:00.000Z"
        }],
        "extendedData": {"notes": "x"}
    }))
    .expect("deserialize patient");

    let json = serde_json::to_value(&patient).expect("serialize patient");
    let round: Patient = serde_json::from_value(json).expect("deserialize again");
    assert_eq!(round, patient);
    assert_eq!(round.events_of_type("MedicationOrder").count(), 1);
}

#[test]
fn every_category_parses_from_its_name() {
    for category in EventCategory::ALL {
        assert_eq!(category.as_str().parse::<EventCategory>().unwrap(), category);
    }
}

#[test]
fn record_keeps_unknown_top_level_fields() {
    let record: ClinicalRecord = serde_json::from_value(json!({
        "last": "Doe",
        "test_id": {"$oid": "5a0c1e"},
        "vital_signs": []
    }))
    .unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["test_id"], json!({"$oid": "5a0c1e"}));
    assert_eq!(json["vital_signs"], json!([]));
}

#[test]
fn event_builder_sets_core_fields() {
    let event = ClinicalEvent::new("EncounterPerformed", EventCategory::Encounter)
        .with_status("performed")
        .with_attribute("lengthOfStay", AttrValue::Null);
    assert!(event.attribute("lengthOfStay").is_none());
    assert!(!event.is_patient_characteristic());
}

proptest! {
    #[test]
    fn epoch_bounds_parse_as_instants(low in 0i64..4_000_000_000i64) {
        let value = json!({"low": low, "high": OPEN_ENDED_EPOCH});
        let parsed = AttrValue::from_json(&value).unwrap();
        let interval = parsed.as_interval().unwrap();
        let parsed_low = interval.low.as_ref().and_then(IntervalBound::as_instant).unwrap();
        prop_assert_eq!(parsed_low.timestamp(), low);
        let parsed_high = interval.high.as_ref().and_then(IntervalBound::as_instant).unwrap();
        prop_assert!(is_open_ended(parsed_high));
    }

    #[test]
    fn alphabetic_text_is_never_temporal(s in "[a-zA-Z][a-zA-Z ]{0,40}") {
        let parsed = AttrValue::from_json(&json!(s)).unwrap();
        prop_assert_eq!(parsed.as_text(), Some(s.as_str()));
    }
}
