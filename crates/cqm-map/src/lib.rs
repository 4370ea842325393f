#![deny(unsafe_code)]

//! Attribute mapping between typed events and flat record entries.

pub mod error;
pub mod sections;
pub mod table;

pub use error::{MappingError, Result};
pub use sections::{entry_type_for, record_class_for, section_for, snake_case};
pub use table::{AttributeMappingTable, AttributeTarget, EXCLUDED_ATTRIBUTES, TypeInfo};
