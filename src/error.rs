//! Application-level errors. Request failures never show up here; they are
//! rendered into responses by the route table.

use crate::config::ConfigError;
use resource_framework::{ConfigurationError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
