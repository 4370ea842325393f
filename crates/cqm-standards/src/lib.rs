#![deny(unsafe_code)]

//! Versioned standards data for the converter.
//!
//! `standards/manifest.toml` pins every data file by sha256. Loading verifies
//! the manifest, then parses the code-system table and the datatype
//! attribute rules.

pub mod code_systems;
pub mod csv;
pub mod datatypes;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod paths;
pub mod registry;

pub use crate::code_systems::CodeSystemOidTable;
pub use crate::datatypes::{AttributeRule, Bound, DatatypeDefinition, DatatypeDefinitions};
pub use crate::error::{Result, StandardsError};
pub use crate::paths::{STANDARDS_ENV_VAR, standards_root};
pub use crate::registry::{StandardsRegistry, VerifySummary};
