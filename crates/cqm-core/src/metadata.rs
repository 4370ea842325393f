use serde_json::{Map, Value};

/// Top-level record fields carried verbatim in the patient's extended data.
pub const PASSTHROUGH_KEYS: &[&str] = &[
    "type",
    "measure_ids",
    "source_data_criteria",
    "expected_values",
    "notes",
    "is_shared",
    "origin_data",
    "test_id",
    "medical_record_number",
    "medical_record_assigner",
    "description",
    "description_category",
    "insurance_providers",
];

/// Copy the passthrough keys present in `from` into `to`.
pub fn copy_passthrough(from: &Map<String, Value>, to: &mut Map<String, Value>) {
    for key in PASSTHROUGH_KEYS {
        if let Some(value) = from.get(*key) {
            to.insert((*key).to_string(), value.clone());
        }
    }
}
