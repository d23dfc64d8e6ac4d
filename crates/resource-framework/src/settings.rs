//! # Pipeline Settings
//!
//! [`PipelineSettings`] is the serializable part of the configuration; it is
//! usually read from the application's TOML file. [`Defaults`] adds the parts that
//! only exist in code (default transforms) and is built once at startup, then shared
//! by `Arc` with every action the factory creates. Nothing here is global.

use crate::error::ConfigurationError;
use crate::transform::{FnTransform, Transform};
use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Documents per Index call unless the request or a pre hook says otherwise.
    pub page_size: u64,
    /// Index sort order unless the request or a pre hook says otherwise.
    pub default_sort: String,
    /// Field stripped from every response document before any resource transform.
    pub credential_field: Option<String>,
    /// Upper bound on a single store call; unbounded when absent.
    pub store_timeout_ms: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            default_sort: "createdAt".to_string(),
            credential_field: Some("password".to_string()),
            store_timeout_ms: None,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.page_size == 0 {
            return Err(ConfigurationError::InvalidSettings(
                "page_size must be greater than zero".into(),
            ));
        }
        if matches!(self.credential_field.as_deref(), Some("")) {
            return Err(ConfigurationError::InvalidSettings(
                "credential_field must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

/// Process-wide defaults shared by every action.
#[derive(Clone, Default)]
pub struct Defaults {
    pub settings: PipelineSettings,
    transforms: Vec<Arc<dyn Transform>>,
}

impl Defaults {
    pub fn new(settings: PipelineSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self {
            settings,
            transforms: Vec::new(),
        })
    }

    /// Appends a default transform; defaults run before any resource transform.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Document, &mut Document) + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(FnTransform(transform)));
        self
    }

    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("settings", &self.settings)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.default_sort, "createdAt");
        assert_eq!(settings.credential_field.as_deref(), Some("password"));
        assert!(settings.store_timeout().is_none());
    }

    #[test]
    fn rejects_zero_page_size() {
        let settings = PipelineSettings {
            page_size: 0,
            ..PipelineSettings::default()
        };
        assert!(Defaults::new(settings).is_err());
    }

    #[test]
    fn partial_settings_fill_from_defaults() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"page_size": 25, "store_timeout_ms": 500}"#).unwrap();
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.default_sort, "createdAt");
        assert_eq!(settings.store_timeout(), Some(Duration::from_millis(500)));
    }
}
