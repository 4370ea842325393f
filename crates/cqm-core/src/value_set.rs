//! Stored value sets → event-side value sets.

use std::collections::HashMap;

use cqm_model::{Concept, HdsValueSet, ValueSet, ValueSetPin};
use cqm_standards::CodeSystemOidTable;
use tracing::debug;

/// Pin meaning "any version".
const UNVERSIONED_PIN: &str = "N/A";

/// Convert one value set, resolving each concept's code-system OID.
pub fn to_cqm(value_set: &HdsValueSet, code_systems: &CodeSystemOidTable) -> ValueSet {
    ValueSet {
        oid: value_set.oid.clone(),
        display_name: value_set.display_name.clone(),
        version: value_set.version.clone(),
        concepts: value_set
            .concepts
            .iter()
            .map(|concept| Concept {
                code: concept.code.clone(),
                code_system_name: concept.code_system_name.clone(),
                code_system_oid: code_systems
                    .oid_for(&concept.code_system_name)
                    .map(str::to_string),
                code_system_version: concept.code_system_version.clone(),
                display_name: concept.display_name.clone(),
            })
            .collect(),
    }
}

/// Convert the value sets a measure pins.
///
/// A set is kept when its version equals the pin for its OID or the pin is
/// empty (`N/A` counts as empty). Sets without a pin are dropped.
pub fn list_to_cqm(
    value_sets: &[HdsValueSet],
    pins: &[ValueSetPin],
    code_systems: &CodeSystemOidTable,
) -> Vec<ValueSet> {
    let versions: HashMap<&str, &str> = pins
        .iter()
        .map(|pin| {
            let version = if pin.version == UNVERSIONED_PIN {
                ""
            } else {
                pin.version.as_str()
            };
            (pin.oid.as_str(), version)
        })
        .collect();

    value_sets
        .iter()
        .filter(|set| match versions.get(set.oid.as_str()) {
            Some(&"") => true,
            Some(pinned) => set.version.as_deref() == Some(*pinned),
            None => {
                debug!(oid = %set.oid, "value set not pinned by the measure");
                false
            }
        })
        .map(|set| to_cqm(set, code_systems))
        .collect()
}
