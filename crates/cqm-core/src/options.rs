use cqm_transform::{DEFAULT_FACILITY_TIME_FORMAT, UnpackContext};

/// Knobs shared by both conversion directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Fill `codeSystemOid` on event codes from the code-system table.
    pub resolve_code_system_oids: bool,
    /// `strftime` format for facility location period strings (UTC).
    pub facility_time_format: String,
    /// Drop record entries whose `codes` map ends up empty.
    pub drop_codeless_entries: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            resolve_code_system_oids: true,
            facility_time_format: DEFAULT_FACILITY_TIME_FORMAT.to_string(),
            drop_codeless_entries: true,
        }
    }
}

impl ConverterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oid_resolution(mut self, enabled: bool) -> Self {
        self.resolve_code_system_oids = enabled;
        self
    }

    pub fn with_facility_time_format(mut self, format: impl Into<String>) -> Self {
        self.facility_time_format = format.into();
        self
    }

    pub fn with_codeless_entries_dropped(mut self, enabled: bool) -> Self {
        self.drop_codeless_entries = enabled;
        self
    }

    pub(crate) fn unpack_context(&self) -> UnpackContext {
        UnpackContext {
            facility_time_format: self.facility_time_format.clone(),
        }
    }
}
