use cqm_map::MappingError;
use cqm_model::ModelError;
use cqm_standards::StandardsError;
use cqm_transform::TransformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Standards(#[from] StandardsError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event materializer failed: {0}")]
    Materializer(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
