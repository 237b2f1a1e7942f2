use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("{entity} not found: {selector}")]
    NotFound { entity: &'static str, selector: String },
    #[error("{entity} selector {selector} is ambiguous: {count} matches")]
    Ambiguous {
        entity: &'static str,
        selector: String,
        count: usize,
    },
    #[error("Invalid seed plan: {0}")]
    InvalidPlan(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Missing configuration: {0} must be set")]
    MissingConfig(&'static str),
    #[error("Serialization error: {0}")]
    Serialize(#[from] bson::ser::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for MaintError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MaintError::InvalidPlan(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MaintError>;
