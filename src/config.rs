//! # Configuration
//!
//! The demo reads a TOML file with two tables:
//!
//! ```toml
//! [pipeline]
//! page_size = 10
//! default_sort = "createdAt"
//! credential_field = "password"
//! store_timeout_ms = 2000
//!
//! [store]
//! buffer_size = 32
//!
//! [store.collections.User]
//! hidden_fields = ["role"]
//! ```
//!
//! Every key is optional. [`load_config_or_default`] looks in order at an explicit
//! path, the `RESOURCE_RECIPE_CONFIG` environment variable, `./resource-recipe.toml`,
//! and finally falls back to [`AppConfig::default`].

use resource_framework::{CollectionOptions, ConfigurationError, PipelineSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "RESOURCE_RECIPE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./resource-recipe.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineSettings,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of the store actor's request channel.
    pub buffer_size: usize,
    /// Options per entity name.
    pub collections: HashMap<String, CollectionOptions>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let mut collections = HashMap::new();
        collections.insert(
            crate::user_api::ENTITY.to_string(),
            CollectionOptions {
                hidden_fields: vec!["role".to_string()],
            },
        );
        Self {
            buffer_size: 32,
            collections,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.pipeline.validate()?;
        if self.store.buffer_size == 0 {
            return Err(ConfigurationError::InvalidSettings(
                "store.buffer_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Parses and validates a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Loads from the first location that exists, or returns the defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = custom_path {
        return load_config(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_config(Path::new(&path));
    }
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        return load_config(path);
    }
    debug!("No config file found, using defaults");
    Ok(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\npage_size = 5\n\n[store]\nbuffer_size = 8").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pipeline.page_size, 5);
        assert_eq!(config.pipeline.credential_field.as_deref(), Some("password"));
        assert_eq!(config.store.buffer_size, 8);
        assert!(config.store.collections.contains_key("User"));
    }

    #[test]
    fn explicit_collections_replace_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[store.collections.Post]\nhidden_fields = [\"draft\"]"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.store.collections["Post"].hidden_fields,
            vec!["draft".to_string()]
        );
        assert!(!config.store.collections.contains_key("User"));
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\npage_size = 0").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline\npage_size = ").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_path_wins() {
        let missing = Path::new("/nonexistent/resource-recipe.toml");
        assert!(matches!(
            load_config_or_default(Some(missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
