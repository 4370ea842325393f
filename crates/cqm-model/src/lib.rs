//! Data model for the two patient representations.
//!
//! - [`ClinicalRecord`]: flat record with named sections of [`RecordEntry`].
//! - [`Patient`]: a list of typed [`ClinicalEvent`] values.
//!
//! Attribute values on events are classified into [`AttrValue`] when the raw
//! JSON is first read.

pub mod attr;
pub mod error;
pub mod event;
pub mod measure;
pub mod record;
pub mod time;
pub mod values;

pub use attr::AttrValue;
pub use error::{ModelError, Result};
pub use event::{ClinicalEvent, EventCategory, Patient};
pub use measure::{
    Concept, HdsConcept, HdsValueSet, SourceDataCriterion, ValueSet, ValueSetPin,
};
pub use record::{ClinicalRecord, CodedConcept, RECORD_SECTIONS, RecordEntry, is_record_section};
pub use time::{OPEN_ENDED_EPOCH, format_timestamp, from_epoch, is_open_ended, parse_timestamp};
pub use values::{Code, Component, FacilityLocation, Interval, IntervalBound, Quantity};
