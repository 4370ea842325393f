use std::collections::HashSet;

use cqm_model::{AttrValue, ClinicalEvent, Code};
use cqm_standards::CodeSystemOidTable;
use tracing::warn;

/// Fills code-system OIDs on event codes for one conversion.
///
/// A name missing from the table is logged once and the OID stays unset.
pub(crate) struct OidResolver<'a> {
    table: &'a CodeSystemOidTable,
    warned: HashSet<String>,
}

impl<'a> OidResolver<'a> {
    pub(crate) fn new(table: &'a CodeSystemOidTable) -> Self {
        Self {
            table,
            warned: HashSet::new(),
        }
    }

    pub(crate) fn resolve_event(&mut self, event: &mut ClinicalEvent) {
        for code in &mut event.data_element_codes {
            self.resolve_code(code);
        }
        for value in event.attributes.values_mut() {
            self.resolve_value(value);
        }
    }

    fn resolve_value(&mut self, value: &mut AttrValue) {
        match value {
            AttrValue::Code(code) => self.resolve_code(code),
            AttrValue::Facility(facility) => {
                if let Some(code) = facility.code.as_mut() {
                    self.resolve_code(code);
                }
            }
            AttrValue::Component(component) => {
                if let Some(code) = component.code.as_mut() {
                    self.resolve_code(code);
                }
                if let Some(result) = component.result.as_deref_mut() {
                    self.resolve_value(result);
                }
            }
            AttrValue::List(items) => items.iter_mut().for_each(|item| self.resolve_value(item)),
            AttrValue::Map(map) => map.values_mut().for_each(|item| self.resolve_value(item)),
            _ => {}
        }
    }

    fn resolve_code(&mut self, code: &mut Code) {
        if code.code_system_oid.is_some() || code.code_system.is_empty() {
            return;
        }
        match self.table.oid_for(&code.code_system) {
            Some(oid) => code.code_system_oid = Some(oid.to_string()),
            None => {
                if self.warned.insert(code.code_system.clone()) {
                    warn!(code_system = %code.code_system, "no OID for code system");
                }
            }
        }
    }
}
