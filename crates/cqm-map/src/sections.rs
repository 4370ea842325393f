//! Event category → record section naming.

/// Record class for categories whose record-side name differs.
///
/// Matching is by substring, first rule wins.
const CLASS_RENAMES: &[(&str, &str)] = &[
    ("diagnostic", "procedure"),
    ("physical_exam", "procedure"),
    ("intervention", "procedure"),
    ("device", "medical_equipment"),
    ("laboratory", "vital_sign"),
    ("substance", "medication"),
    ("immunization", "medication"),
];

/// Record classes whose section name is not a plural.
const UNPLURALIZED: &[&str] = &["medical_equipment"];

/// The record class an event category is filed under.
pub fn record_class_for(category: &str) -> &str {
    CLASS_RENAMES
        .iter()
        .find(|(pattern, _)| category.contains(pattern))
        .map_or(category, |(_, class)| class)
}

/// The record section collection for an event category.
pub fn section_for(category: &str) -> String {
    let class = record_class_for(category);
    if UNPLURALIZED.contains(&class) {
        return class.to_string();
    }
    pluralize(class)
}

/// Record entry `_type` for a record class (`vital_sign` → `VitalSign`).
pub fn entry_type_for(class: &str) -> String {
    class
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `CommunicationFromPatientToProvider` → `communication_from_patient_to_provider`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y')
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        return format!("{stem}ies");
    }
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renamed_categories() {
        assert_eq!(record_class_for("laboratory_test"), "vital_sign");
        assert_eq!(record_class_for("diagnostic_study"), "procedure");
        assert_eq!(record_class_for("immunization"), "medication");
        assert_eq!(record_class_for("encounter"), "encounter");
    }

    #[test]
    fn section_names() {
        assert_eq!(section_for("laboratory"), "vital_signs");
        assert_eq!(section_for("device"), "medical_equipment");
        assert_eq!(section_for("allergy"), "allergies");
        assert_eq!(section_for("family_history"), "family_histories");
        assert_eq!(section_for("adverse_event"), "adverse_events");
        assert_eq!(section_for("physical_exam"), "procedures");
    }

    #[test]
    fn entry_types() {
        assert_eq!(entry_type_for("vital_sign"), "VitalSign");
        assert_eq!(entry_type_for("medical_equipment"), "MedicalEquipment");
        assert_eq!(entry_type_for("condition"), "Condition");
    }

    #[test]
    fn snake_cases_type_names() {
        assert_eq!(
            snake_case("CommunicationFromPatientToProvider"),
            "communication_from_patient_to_provider"
        );
    }
}
