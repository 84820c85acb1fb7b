//! Object store client seam.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::{ErrorKind, Operator, services};
use reqsign::{GoogleCredential, GoogleCredentialLoader};
use tracing::{debug, info};

use super::config::StorageProvider;
use super::error::StorageError;

const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Provider primitives the image storage adapter is built on.
///
/// Every method returns the raw provider error; translating it is the
/// adapter's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Provider identifier (`gcs`, `local`, `memory`).
    fn provider(&self) -> &'static str;

    /// Bucket the client is bound to.
    fn bucket(&self) -> &str;

    /// Create or overwrite an object with content-type metadata.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> opendal::Result<()>;

    /// Read a whole object. `None` when it does not exist.
    async fn get(&self, key: &str) -> opendal::Result<Option<Bytes>>;

    /// Delete an object. `true` only if something was removed.
    async fn delete(&self, key: &str) -> opendal::Result<bool>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> opendal::Result<bool>;

    /// Sign a GET URL for `key`.
    async fn presign_read(&self, key: &str, expiration: Duration) -> opendal::Result<String>;

    /// Sign a PUT URL for `key`, bound to `content_type`.
    async fn presign_write(
        &self,
        key: &str,
        content_type: &str,
        expiration: Duration,
    ) -> opendal::Result<String>;

    /// Check the bucket. `false` when it does not exist.
    async fn bucket_exists(&self) -> opendal::Result<bool>;
}

/// [`ObjectClient`] backed by an OpenDAL operator.
#[derive(Debug, Clone)]
pub struct OpendalClient {
    operator: Operator,
    provider: &'static str,
    bucket: String,
    local_root: Option<PathBuf>,
}

impl OpendalClient {
    /// Build a client for the configured provider.
    ///
    /// GCS credentials are resolved the ambient way (application default
    /// credentials, workload identity) unless a credential path is set.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialization`] if the operator cannot be
    /// built or a configured credential file cannot be loaded.
    pub fn from_provider(provider: &StorageProvider) -> Result<Self, StorageError> {
        let operator = Self::create_operator(provider)?;
        let mut client = Self::new(operator, provider.name(), provider.bucket());
        if let StorageProvider::LocalFs { root } = provider {
            client.local_root = Some(root.clone());
        }
        Ok(client)
    }

    /// Wrap an existing operator.
    #[must_use]
    pub fn new(operator: Operator, provider: &'static str, bucket: impl Into<String>) -> Self {
        Self {
            operator,
            provider,
            bucket: bucket.into(),
            local_root: None,
        }
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::Gcs {
                bucket,
                credential_path,
                ..
            } => {
                let mut builder = services::Gcs::default().bucket(bucket).root("/");
                if let Some(path) = credential_path {
                    builder = builder.credential_path(path);
                }
                let operator = Operator::new(builder)
                    .map(|b| b.finish())
                    .map_err(|e| StorageError::initialization(e.to_string()))?;
                resolve_gcs_credentials(credential_path.as_deref())?;
                Ok(operator)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::initialization("invalid path"))?,
                );
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::Memory => {
                Operator::new(services::Memory::default()).map(|b| b.finish())
            }
        };

        operator.map_err(|e| StorageError::initialization(e.to_string()))
    }
}

/// Make sure GCS credentials can be resolved before serving.
///
/// OpenDAL drops credential load errors and would only fail on the first
/// request. An explicit path (or `GOOGLE_APPLICATION_CREDENTIALS`) must
/// point at a readable credential file. Without one, the gcloud well-known
/// file is used if present, otherwise the VM metadata server (workload
/// identity), which cannot be checked without a network call.
fn resolve_gcs_credentials(credential_path: Option<&str>) -> Result<(), StorageError> {
    let explicit = credential_path
        .map(str::to_string)
        .or_else(|| std::env::var(GOOGLE_APPLICATION_CREDENTIALS).ok());

    if let Some(path) = explicit {
        let content = std::fs::read(&path).map_err(|e| {
            StorageError::initialization(format!("cannot read GCS credentials {path}: {e}"))
        })?;
        GoogleCredential::from_slice(&content).map_err(|e| {
            StorageError::initialization(format!("invalid GCS credentials {path}: {e}"))
        })?;
        info!(path = %path, "Loaded GCS credentials");
        return Ok(());
    }

    match GoogleCredentialLoader::default().with_disable_env().load() {
        Ok(Some(_)) => info!("Loaded GCS application default credentials"),
        Ok(None) => info!("No GCS credential file, using VM metadata server"),
        Err(e) => {
            return Err(StorageError::initialization(format!(
                "cannot load GCS credentials: {e}"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectClient for OpendalClient {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> opendal::Result<()> {
        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(key, data)
                .content_type(content_type)
                .await?;
        } else {
            debug!(provider = self.provider, key, "content type not stored by provider");
            self.operator.write(key, data).await?;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> opendal::Result<Option<Bytes>> {
        match self.operator.read(key).await {
            Ok(buffer) => Ok(Some(buffer.to_bytes())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> opendal::Result<bool> {
        // OpenDAL deletes are idempotent, so look first to report whether
        // anything was removed.
        if !self.exists(key).await? {
            return Ok(false);
        }
        self.operator.delete(key).await?;
        Ok(true)
    }

    async fn exists(&self, key: &str) -> opendal::Result<bool> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn presign_read(&self, key: &str, expiration: Duration) -> opendal::Result<String> {
        let presigned = self.operator.presign_read(key, expiration).await?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_write(
        &self,
        key: &str,
        content_type: &str,
        expiration: Duration,
    ) -> opendal::Result<String> {
        let presigned = self
            .operator
            .presign_write_with(key, expiration)
            .content_type(content_type)
            .await?;
        Ok(presigned.uri().to_string())
    }

    async fn bucket_exists(&self) -> opendal::Result<bool> {
        // The fs service lists a missing root as empty, so look at it directly.
        if let Some(root) = &self.local_root {
            return Ok(tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()));
        }

        // `Operator::check` treats NotFound as success; list by hand instead.
        let mut lister = match self.operator.lister_with("/").limit(1).await {
            Ok(lister) => lister,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        match lister.next().await {
            Some(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
            Some(Err(e)) => Err(e),
            Some(Ok(_)) | None => Ok(true),
        }
    }
}
