//! Event attributes through extraction, wrappers and composite rules.

use cqm_map::AttributeTarget;
use cqm_model::{AttrValue, OPEN_ENDED_EPOCH};
use cqm_transform::{
    RuleExecutor, UnpackContext, apply_negation, extract_json, to_event_value, write_attribute,
};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn single(name: &str) -> AttributeTarget {
    AttributeTarget::Single(name.to_string())
}

fn period() -> AttributeTarget {
    AttributeTarget::Split {
        low: "start_time".to_string(),
        high: "end_time".to_string(),
    }
}

fn convert(event: Value, mappings: &[(&str, AttributeTarget)]) -> Map<String, Value> {
    let mut out = Map::new();
    for (attribute, target) in mappings {
        let Some(raw) = event.get(*attribute) else {
            continue;
        };
        let value = AttrValue::from_json(raw).unwrap();
        write_attribute(target, &value, &mut out);
    }
    apply_negation(&mut out);
    RuleExecutor::with_default_rules()
        .execute(&UnpackContext::default(), &mut out)
        .unwrap();
    out
}

#[test]
fn encounter_attributes_snapshot() {
    let event = json!({
        "relevantPeriod": {"low": "2012-04-06T08:00:00Z", "high": "2012-04-06T09:15:00Z"},
        "facilityLocations": [{
            "code": {"code": "1108-0", "codeSystem": "HSLOC", "descriptor": "ICU"},
            "locationPeriod": {"low": "2012-04-06T08:00:00Z", "high": "2012-04-06T09:15:00Z"}
        }],
        "diagnoses": [{"code": "I10", "codeSystem": "ICD-10-CM", "descriptor": "Hypertension"}],
        "principalDiagnosis": {"code": "I10", "codeSystem": "ICD-10-CM", "descriptor": "Hypertension"},
        "dischargeDisposition": {"code": "01", "codeSystem": "DischargeDisposition"}
    });
    let attrs = convert(
        event,
        &[
            ("relevantPeriod", period()),
            ("facilityLocations", single("facility")),
            ("diagnoses", single("diagnosis")),
            ("principalDiagnosis", single("principalDiagnosis")),
            ("dischargeDisposition", single("discharge_disposition")),
        ],
    );
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(attrs, @r#"
        {
          "discharge_disposition": {
            "code": "01",
            "codeSystem": "DischargeDisposition"
          },
          "end_time": 1333703700,
          "facility": {
            "type": "COL",
            "values": [
              {
                "code": {
                  "code": "1108-0",
                  "codeSystem": "HSLOC"
                },
                "display": "ICU",
                "locationPeriodHigh": "04/06/2012 9:15 AM",
                "locationPeriodLow": "04/06/2012 8:00 AM"
              }
            ]
          },
          "principalDiagnosis": {
            "code": "I10",
            "codeSystem": "ICD-10-CM",
            "title": "Hypertension"
          },
          "start_time": 1333699200
        }
        "#);
    });
}

#[test]
fn negated_intervention_keeps_reason_and_flag() {
    let attrs = convert(
        json!({
            "authorDatetime": "2012-04-06T08:00:00Z",
            "negationRationale": {"code": "183932001", "codeSystem": "SNOMED-CT"},
            "relatedTo": ["5a0c1e"]
        }),
        &[
            ("authorDatetime", single("start_time")),
            ("negationRationale", single("negationReason")),
            ("relatedTo", single("references")),
        ],
    );
    assert_eq!(attrs["negationInd"], json!(true));
    assert_eq!(attrs["start_time"], json!(1_333_699_200));
    assert_eq!(
        attrs["references"],
        json!([{"referenced_id": "5a0c1e", "referenced_type": null, "type": "fulfills"}])
    );
}

#[test]
fn record_period_reads_back_as_event_interval() {
    let value = to_event_value("relevantPeriod", &json!([1_333_699_200, 1_333_703_700])).unwrap();
    let mut out = Map::new();
    write_attribute(&period(), &value, &mut out);
    assert_eq!(
        Value::Object(out),
        json!({"start_time": 1_333_699_200, "end_time": 1_333_703_700})
    );
}

proptest! {
    #[test]
    fn open_ended_high_is_never_kept(low in 0i64..4_102_444_800, as_text in any::<bool>()) {
        let high = if as_text {
            json!("9999-12-31T23:59:59.99+0000")
        } else {
            json!(OPEN_ENDED_EPOCH)
        };
        let raw = json!({"low": low, "high": high});
        prop_assert_eq!(extract_json(&raw).unwrap(), json!([low, null]));

        let mut out = Map::new();
        write_attribute(&period(), &AttrValue::from_json(&raw).unwrap(), &mut out);
        prop_assert!(!out.contains_key("end_time"));
        prop_assert_eq!(out.get("start_time"), Some(&json!(low)));
    }
}
