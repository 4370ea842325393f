#![deny(unsafe_code)]

//! Value-level conversion between event attributes and record attributes.
//!
//! - [`extract`]: event value → record value
//! - [`attributes`]: record-side wrappers chosen by the mapping target
//! - [`unpack`]: composite-field repair rules
//! - [`inverse`]: record value → event value
//! - [`normalize`]: key casing and identifier cleanup around the materializer

pub mod attributes;
pub mod error;
pub mod extract;
pub mod inverse;
pub mod normalize;
pub mod unpack;

pub use attributes::{apply_negation, reshape, write_attribute};
pub use error::{Result, TransformError};
pub use extract::{extract, extract_json};
pub use inverse::{split_to_event_json, to_event_json, to_event_value};
pub use normalize::{
    camel_case, communication_direction, fix_infinity_dates, normalize_keys,
    rename_record_time_keys, serialize_identifiers,
};
pub use unpack::{
    COLLECTION_TYPE, CompositeRule, DEFAULT_FACILITY_TIME_FORMAT, RuleExecutor, RuleMetadata,
    UnpackContext,
};
