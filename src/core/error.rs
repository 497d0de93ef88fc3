

use thiserror::Error;


#[derive(Error, Debug)]
pub enum NullspaceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed record {id}: {reason}")]
    InputMalformed { id: String, reason: String },

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Index not built: no successful build has completed yet")]
    IndexNotBuilt,

    #[error("Build failed: {}", causes.join("; "))]
    BuildFailed { causes: Vec<String> },

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Index error: {0}")]
    Index(#[from] crate::toolkit::index::IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NullspaceError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InputMalformed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn build_failed(causes: Vec<String>) -> Self {
        Self::BuildFailed { causes }
    }
}

impl From<config::ConfigError> for NullspaceError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, NullspaceError>;
