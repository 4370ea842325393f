use cqm_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// A raw value had a shape neither schema defines.
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("rule {rule} failed: {message}")]
    Rule { rule: String, message: String },
}

pub type Result<T> = std::result::Result<T, TransformError>;
