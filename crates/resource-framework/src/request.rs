//! # Requests & Responses
//!
//! The router hands each invocation a [`Request`] with path parameters, decoded
//! query parameters, and the parsed body. Sanitize hooks may rewrite the query and
//! body in place; everything downstream reads the sanitized values.

use crate::document::Document;
use crate::error::ValidationError;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Path parameters extracted by the router (`id`, `format`).
    pub params: HashMap<String, String>,
    /// Query parameters; values start as strings and may be coerced by sanitize hooks.
    pub query: Document,
    /// Parsed request body, `Null` when absent.
    pub body: Value,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.params.get("id").map(String::as_str)
    }

    pub fn format(&self) -> Option<&str> {
        self.params.get("format").map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Coerces a string query parameter to a boolean in place.
    ///
    /// `""`, `"0"` and `"false"` become `false`; any other string becomes `true`.
    /// Missing parameters and non-string values are left untouched.
    pub fn coerce_query_bool(&mut self, field: &str) {
        if let Some(Value::String(raw)) = self.query.get(field) {
            let flag = !matches!(raw.as_str(), "" | "0" | "false");
            self.query.insert(field.to_string(), Value::Bool(flag));
        }
    }

    /// Fails unless the query parameter is present and not empty.
    pub fn require_query(&self, field: &str) -> Result<(), ValidationError> {
        require(self.query.get(field), field, "query")
    }

    /// Fails unless the body field is present and not empty.
    pub fn require_body(&self, field: &str) -> Result<(), ValidationError> {
        require(self.body.get(field), field, "body")
    }
}

fn require(value: Option<&Value>, field: &str, location: &str) -> Result<(), ValidationError> {
    let empty = match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if empty {
        Err(ValidationError::for_field(
            field,
            format!("{location} parameter '{field}' must not be empty"),
        ))
    } else {
        Ok(())
    }
}

/// Response representation negotiated from the `format` path parameter.
///
/// JSON is the only representation; any other requested format, including an
/// unfilled `:format?` placeholder, is served as JSON too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
}

impl Format {
    pub fn negotiate(request: &Request) -> Self {
        match request.format() {
            None | Some("json") => Format::Json,
            Some(other) => {
                debug!(requested = other, "Unrecognized format, serving JSON");
                Format::Json
            }
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
        }
    }
}

/// What the handler emits to the router on either path.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Value,
}

impl Response {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: Format::Json.content_type(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_query_booleans() {
        let mut req = Request::new()
            .with_query("published", "false")
            .with_query("active", "yes")
            .with_query("limit", 3);
        req.coerce_query_bool("published");
        req.coerce_query_bool("active");
        req.coerce_query_bool("limit");
        req.coerce_query_bool("missing");

        assert_eq!(req.query["published"], json!(false));
        assert_eq!(req.query["active"], json!(true));
        assert_eq!(req.query["limit"], json!(3));
        assert!(!req.query.contains_key("missing"));
    }

    #[test]
    fn require_checks_presence() {
        let req = Request::new()
            .with_query("__v", "")
            .with_body(json!({"name": "Ada"}));
        assert!(req.require_query("__v").is_err());
        assert!(req.require_body("name").is_ok());
        let err = req.require_body("email").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("email"));
    }

    #[test]
    fn every_format_is_served_as_json() {
        for format in ["json", "xml", ":format?"] {
            let req = Request::new().with_param("format", format);
            assert_eq!(Format::negotiate(&req), Format::Json, "{format}");
        }
        assert_eq!(Format::negotiate(&Request::new()), Format::Json);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::new().with_header("X-User", "ada");
        assert_eq!(req.header("x-user"), Some("ada"));
        assert_eq!(req.header("X-USER"), Some("ada"));
    }
}
