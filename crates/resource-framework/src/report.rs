//! # Error Reporting
//!
//! The error-reporting collaborator: renders a [`PipelineError`] as the JSON body
//! the router sends back.
//!
//! ```json
//! { "status": 401, "error": "AuthorizationError", "message": "Unauthorized: missing token" }
//! ```

use crate::error::PipelineError;
use crate::request::Response;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl ErrorReport {
    pub fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => Response::json(status, body),
            Err(_) => Response::json(status, serde_json::Value::String(self.message)),
        }
    }
}

impl From<&PipelineError> for ErrorReport {
    fn from(err: &PipelineError) -> Self {
        Self {
            status: err.status(),
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for Response {
    fn from(err: PipelineError) -> Self {
        ErrorReport::from(&err).into_response()
    }
}
