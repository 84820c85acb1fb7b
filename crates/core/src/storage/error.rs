//! Storage error types.

use fotos_shared::AppError;
use thiserror::Error;

/// Storage operation errors.
///
/// Only failures that are surfaced to callers live here. Download and
/// delete failures are logged and folded into an empty result instead.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Provider client could not be built. Fatal at startup.
    #[error("cannot initialize storage: {0}")]
    Initialization(String),

    /// Provider rejected an upload.
    #[error("failed to upload {path}: {source}")]
    Write {
        /// Full object path.
        path: String,
        /// Provider error.
        source: opendal::Error,
    },

    /// Provider could not sign a URL.
    #[error("failed to sign URL for {path}: {source}")]
    Signing {
        /// Full object path.
        path: String,
        /// Provider error.
        source: opendal::Error,
    },

    /// Existence lookup failed.
    #[error("failed to look up {path}: {source}")]
    Lookup {
        /// Full object path.
        path: String,
        /// Provider error.
        source: opendal::Error,
    },
}

impl StorageError {
    /// Create an initialization error.
    #[must_use]
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a write error.
    #[must_use]
    pub fn write(path: impl Into<String>, source: opendal::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(path: impl Into<String>, source: opendal::Error) -> Self {
        Self::Signing {
            path: path.into(),
            source,
        }
    }

    /// Create a lookup error.
    #[must_use]
    pub fn lookup(path: impl Into<String>, source: opendal::Error) -> Self {
        Self::Lookup {
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Initialization(msg) => Self::Configuration(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}
