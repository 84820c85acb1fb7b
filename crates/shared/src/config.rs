//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Object storage configuration as read from files and environment.
///
/// Provider-specific fields are optional here; they are checked when the
/// settings are turned into a storage config.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage provider: `gcs`, `local_fs` or `memory`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// GCS bucket name.
    pub bucket: Option<String>,
    /// GCP project ID.
    pub project_id: Option<String>,
    /// Path to a service account JSON file. Application default
    /// credentials are used when unset.
    pub credential_path: Option<String>,
    /// Root directory for the local filesystem provider.
    pub root: Option<PathBuf>,
    /// Prefix prepended to every uploaded object path.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: None,
            project_id: None,
            credential_path: None,
            root: None,
            base_path: default_base_path(),
        }
    }
}

fn default_provider() -> String {
    "gcs".to_string()
}

fn default_base_path() -> String {
    "images".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FOTOS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
