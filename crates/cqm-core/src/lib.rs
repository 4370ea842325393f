#![deny(unsafe_code)]

//! Record ↔ patient conversion.
//!
//! [`RecordToEventConverter`] and [`EventToRecordConverter`] are independent
//! pipelines over the same standards data. Each builds its attribute mapping
//! table once at construction; conversions after that only read it.
//!
//! ```ignore
//! let registry = StandardsRegistry::load_default()?;
//! let to_record = EventToRecordConverter::new(&registry, ConverterOptions::default())?;
//! let record = to_record.to_record(&patient)?;
//! ```

pub mod characteristics;
pub mod error;
pub mod materialize;
pub mod measure;
pub mod metadata;
mod oids;
pub mod options;
pub mod to_patient;
pub mod to_record;
pub mod value_set;

pub use error::{ConvertError, Result};
pub use materialize::{
    AttributeSpec, EventMaterializer, MappingMaterializer, MaterializedEvents, StaticMaterializer,
};
pub use measure::MeasureContext;
pub use metadata::PASSTHROUGH_KEYS;
pub use options::ConverterOptions;
pub use to_patient::RecordToEventConverter;
pub use to_record::EventToRecordConverter;
