//! # Framework Errors
//!
//! This module defines the error taxonomy shared by every pipeline. Request-scoped
//! failures are [`PipelineError`]s and always carry an HTTP status; setup-time
//! mistakes are [`ConfigurationError`]s and never reach a request.
//!
//! Store collaborators report failures with [`StoreError`](crate::store::StoreError),
//! which converts into a `PipelineError` with the status the error-reporting
//! collaborator should render:
//!
//! | Store error | Pipeline error | Status |
//! |-------------|----------------|--------|
//! | `NotFound`  | `NotFound`     | 404    |
//! | `Conflict`  | `Conflict`     | 409    |
//! | anything else | `Store`      | 500    |

use crate::store::StoreError;

/// A failed input check raised by a validate hook or by the query builder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The offending field, when the failure is tied to one.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

/// Errors that terminate a single request.
///
/// Once a stage produces one of these the pipeline enters `Errored` and no
/// further hook runs for that request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
    /// Escape hatch for hooks that need a status outside the taxonomy.
    #[error("{message}")]
    Http { status: u16, message: String },
}

impl PipelineError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status the error-reporting collaborator renders.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Store(_) => 500,
            Self::Http { status, .. } => *status,
        }
    }

    /// Short machine-readable name for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Unauthorized(_) => "AuthorizationError",
            Self::Forbidden(_) => "ForbiddenError",
            Self::NotFound(_) => "NotFoundError",
            Self::Conflict(_) => "ConflictError",
            Self::Store(_) => "StoreError",
            Self::Http { .. } => "HttpError",
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PipelineError::NotFound(what),
            StoreError::Conflict(what) => PipelineError::Conflict(what),
            other => PipelineError::Store(other),
        }
    }
}

/// Setup-time errors. These are fatal for the handler being built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Hooks for {resource} are frozen; cannot register a {event} hook after to_handler()")]
    Frozen { resource: String, event: String },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
