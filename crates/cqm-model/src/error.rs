use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported value shape at {path}: {found}")]
    UnsupportedValue { path: String, found: &'static str },
    #[error("invalid timestamp at {path}: {value}")]
    InvalidTimestamp { path: String, value: String },
    #[error("unknown event category: {0}")]
    UnknownCategory(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
