use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("{datatype}.{attribute} declares only one bound of a split interval")]
    IncompleteSplit { datatype: String, attribute: String },
}

pub type Result<T> = std::result::Result<T, MappingError>;
