//! Storage configuration types.

use std::path::PathBuf;

use fotos_shared::StorageSettings;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// Google Cloud Storage (production).
    Gcs {
        /// GCS bucket name.
        bucket: String,
        /// GCP project ID.
        project_id: String,
        /// Service account JSON path. Application default credentials
        /// (or workload identity) are used when unset.
        credential_path: Option<String>,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory store (tests and dry runs)
    Memory,
}

impl StorageProvider {
    /// Create a GCS provider using ambient credentials.
    #[must_use]
    pub fn gcs(bucket: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::Gcs {
            bucket: bucket.into(),
            project_id: project_id.into(),
            credential_path: None,
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Create an in-memory provider.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory
    }

    /// Provider identifier reported by the adapter.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcs { .. } => "gcs",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket name (or its local stand-in).
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Gcs { bucket, .. } => bucket,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }

    /// Get the GCP project ID, if any.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Gcs { project_id, .. } => Some(project_id),
            Self::LocalFs { .. } | Self::Memory => None,
        }
    }
}

/// Image storage configuration. Fixed once the adapter is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Prefix prepended to uploaded object paths.
    pub base_path: String,
}

impl StorageConfig {
    /// Default base path for uploads.
    pub const DEFAULT_BASE_PATH: &'static str = "images";

    /// Create a new storage config with the default base path.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            base_path: Self::DEFAULT_BASE_PATH.to_string(),
        }
    }

    /// Set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}

impl TryFrom<&StorageSettings> for StorageConfig {
    type Error = StorageError;

    fn try_from(settings: &StorageSettings) -> Result<Self, Self::Error> {
        let provider = match settings.provider.as_str() {
            "gcs" => {
                let bucket = settings
                    .bucket
                    .clone()
                    .ok_or_else(|| StorageError::initialization("gcs provider requires a bucket"))?;
                let project_id = settings.project_id.clone().ok_or_else(|| {
                    StorageError::initialization("gcs provider requires a project_id")
                })?;
                StorageProvider::Gcs {
                    bucket,
                    project_id,
                    credential_path: settings.credential_path.clone(),
                }
            }
            "local_fs" | "local" => {
                let root = settings.root.clone().ok_or_else(|| {
                    StorageError::initialization("local_fs provider requires a root")
                })?;
                StorageProvider::LocalFs { root }
            }
            "memory" => StorageProvider::Memory,
            other => {
                return Err(StorageError::initialization(format!(
                    "unknown storage provider: {other}"
                )));
            }
        };

        Ok(Self::new(provider).with_base_path(settings.base_path.clone()))
    }
}
