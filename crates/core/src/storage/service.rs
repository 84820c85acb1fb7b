//! Image storage adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::client::{ObjectClient, OpendalClient};
use super::config::StorageConfig;
use super::error::StorageError;

/// Capability interface for storing images.
///
/// Failure handling is deliberately uneven: uploads, URL signing and
/// existence checks return errors, while downloads and deletes log the
/// provider error and report an empty result.
#[async_trait]
pub trait ImageStorageService: Send + Sync {
    /// Store `data` under `{base_path}/{relative_path}`, overwriting any
    /// existing object. Returns the full stored path.
    async fn upload(
        &self,
        data: Bytes,
        relative_path: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Signed GET URL for a stored path. Does not check that the object exists.
    async fn generate_read_url(
        &self,
        stored_path: &str,
        expiration: Duration,
    ) -> Result<String, StorageError>;

    /// Signed PUT URL for `{base_path}/{relative_path}`, bound to `content_type`.
    async fn generate_upload_url(
        &self,
        relative_path: &str,
        content_type: &str,
        expiration: Duration,
    ) -> Result<String, StorageError>;

    /// Whole object content, or `None` if it is missing or the read failed.
    async fn download(&self, stored_path: &str) -> Option<Bytes>;

    /// `true` if an object was removed; `false` if it was missing or the
    /// delete failed.
    async fn delete(&self, stored_path: &str) -> bool;

    /// Whether an object exists at the stored path.
    async fn exists(&self, stored_path: &str) -> Result<bool, StorageError>;

    /// Identifier of the active backend, e.g. `gcs`.
    fn provider_name(&self) -> &str;
}

/// [`ImageStorageService`] over an [`ObjectClient`].
///
/// Holds no mutable state; share it behind an `Arc`.
pub struct ImageStorageAdapter {
    client: Arc<dyn ObjectClient>,
    base_path: String,
}

impl ImageStorageAdapter {
    /// Build the provider client without touching the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialization`] if the client cannot be built
    /// or its credentials cannot be loaded.
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let client = OpendalClient::from_provider(&config.provider).inspect_err(|e| {
            error!(error = %e, provider = config.provider.name(), "Failed to initialize storage");
        })?;

        info!(
            provider = config.provider.name(),
            bucket = config.provider.bucket(),
            project = config.provider.project_id().unwrap_or("-"),
            "Image storage initialized"
        );

        Ok(Self::with_client(Arc::new(client), config.base_path))
    }

    /// Build the provider client and verify the bucket.
    ///
    /// A missing or unreachable bucket is only logged; it may be created
    /// on first upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialization`] if the client cannot be built
    /// or its credentials cannot be loaded.
    pub async fn connect(config: StorageConfig) -> Result<Self, StorageError> {
        let adapter = Self::new(config)?;
        adapter.verify_bucket().await;
        Ok(adapter)
    }

    /// Wrap an already constructed client. No verification is done.
    #[must_use]
    pub fn with_client(client: Arc<dyn ObjectClient>, base_path: impl Into<String>) -> Self {
        Self {
            client,
            base_path: base_path.into(),
        }
    }

    /// Best-effort bucket check. Returns whether the bucket was confirmed.
    pub async fn verify_bucket(&self) -> bool {
        match self.client.bucket_exists().await {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    bucket = self.client.bucket(),
                    "Bucket does not exist (will be created on first upload)"
                );
                false
            }
            Err(e) => {
                warn!(bucket = self.client.bucket(), error = %e, "Could not verify bucket");
                false
            }
        }
    }

    /// Full object path for an upload-relative path.
    #[must_use]
    pub fn stored_path(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_path, relative_path)
    }

    /// Prefix applied to uploads.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Bucket the adapter writes to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.client.bucket()
    }
}

#[async_trait]
impl ImageStorageService for ImageStorageAdapter {
    async fn upload(
        &self,
        data: Bytes,
        relative_path: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.stored_path(relative_path);
        let size = data.len();

        match self.client.put(&path, data, content_type).await {
            Ok(()) => {
                info!(bucket = self.client.bucket(), path = %path, size, "Uploaded object");
                Ok(path)
            }
            Err(e) => {
                error!(path = %path, error = %e, "Failed to upload object");
                Err(StorageError::write(path, e))
            }
        }
    }

    async fn generate_read_url(
        &self,
        stored_path: &str,
        expiration: Duration,
    ) -> Result<String, StorageError> {
        match self.client.presign_read(stored_path, expiration).await {
            Ok(url) => {
                debug!(
                    path = stored_path,
                    expires_in_secs = expiration.as_secs(),
                    "Generated signed read URL"
                );
                Ok(url)
            }
            Err(e) => {
                error!(path = stored_path, error = %e, "Failed to generate signed read URL");
                Err(StorageError::signing(stored_path, e))
            }
        }
    }

    async fn generate_upload_url(
        &self,
        relative_path: &str,
        content_type: &str,
        expiration: Duration,
    ) -> Result<String, StorageError> {
        let path = self.stored_path(relative_path);

        match self
            .client
            .presign_write(&path, content_type, expiration)
            .await
        {
            Ok(url) => {
                debug!(
                    path = %path,
                    content_type,
                    expires_in_secs = expiration.as_secs(),
                    "Generated signed upload URL"
                );
                Ok(url)
            }
            Err(e) => {
                error!(path = %path, error = %e, "Failed to generate signed upload URL");
                Err(StorageError::signing(path, e))
            }
        }
    }

    async fn download(&self, stored_path: &str) -> Option<Bytes> {
        match self.client.get(stored_path).await {
            Ok(Some(data)) => {
                debug!(path = stored_path, size = data.len(), "Downloaded object");
                Some(data)
            }
            Ok(None) => {
                warn!(
                    bucket = self.client.bucket(),
                    path = stored_path,
                    "Object not found"
                );
                None
            }
            Err(e) => {
                error!(path = stored_path, error = %e, "Failed to download object");
                None
            }
        }
    }

    async fn delete(&self, stored_path: &str) -> bool {
        match self.client.delete(stored_path).await {
            Ok(deleted) => {
                if deleted {
                    info!(bucket = self.client.bucket(), path = stored_path, "Deleted object");
                }
                deleted
            }
            Err(e) => {
                error!(path = stored_path, error = %e, "Failed to delete object");
                false
            }
        }
    }

    async fn exists(&self, stored_path: &str) -> Result<bool, StorageError> {
        self.client
            .exists(stored_path)
            .await
            .map_err(|e| StorageError::lookup(stored_path, e))
    }

    fn provider_name(&self) -> &str {
        self.client.provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::MockObjectClient;
    use crate::storage::config::StorageProvider;
    use mockall::predicate::{always, eq};
    use opendal::ErrorKind;
    use tracing_test::traced_test;

    fn logged_at(lines: &[&str], level: &str, message: &str) -> Result<(), String> {
        if lines.iter().any(|l| l.contains(level) && l.contains(message)) {
            Ok(())
        } else {
            Err(format!("no {level} line containing {message:?}"))
        }
    }

    fn provider_error() -> opendal::Error {
        opendal::Error::new(ErrorKind::Unexpected, "backend unavailable")
    }

    fn mock() -> MockObjectClient {
        let mut client = MockObjectClient::new();
        client.expect_bucket().return_const("demeter-photos".to_string());
        client.expect_provider().return_const("gcs");
        client
    }

    fn adapter(client: MockObjectClient) -> ImageStorageAdapter {
        ImageStorageAdapter::with_client(Arc::new(client), "images")
    }

    #[test]
    fn test_stored_path_prefixes_base_path() {
        let storage = adapter(mock());
        assert_eq!(storage.stored_path("a/b.jpg"), "images/a/b.jpg");
        assert_eq!(storage.base_path(), "images");
        assert_eq!(storage.bucket(), "demeter-photos");
    }

    #[test]
    fn test_provider_name_comes_from_client() {
        assert_eq!(adapter(mock()).provider_name(), "gcs");
    }

    #[tokio::test]
    async fn test_upload_writes_to_prefixed_path() {
        let mut client = mock();
        client
            .expect_put()
            .with(
                eq("images/plants/1.jpg"),
                eq(Bytes::from_static(b"hello")),
                eq("image/jpeg"),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let path = adapter(client)
            .upload(Bytes::from_static(b"hello"), "plants/1.jpg", "image/jpeg")
            .await
            .expect("upload should succeed");

        assert_eq!(path, "images/plants/1.jpg");
    }

    #[tokio::test]
    async fn test_upload_failure_is_surfaced() {
        let mut client = mock();
        client
            .expect_put()
            .returning(|_, _, _| Err(provider_error()));

        let err = adapter(client)
            .upload(Bytes::from_static(b"hello"), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Write { ref path, .. } if path == "images/a.jpg"));
    }

    #[tokio::test]
    async fn test_read_url_uses_stored_path_verbatim() {
        let mut client = mock();
        client
            .expect_presign_read()
            .with(eq("images/a.jpg"), eq(Duration::from_secs(900)))
            .times(1)
            .returning(|key, _| Ok(format!("https://storage.example/{key}?sig=abc")));

        let url = adapter(client)
            .generate_read_url("images/a.jpg", Duration::from_secs(900))
            .await
            .expect("signing should succeed");

        assert_eq!(url, "https://storage.example/images/a.jpg?sig=abc");
    }

    #[tokio::test]
    async fn test_read_url_failure_is_signing_error() {
        let mut client = mock();
        client
            .expect_presign_read()
            .returning(|_, _| Err(opendal::Error::new(ErrorKind::Unsupported, "no key")));

        let err = adapter(client)
            .generate_read_url("images/a.jpg", Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Signing { ref path, .. } if path == "images/a.jpg"));
    }

    #[tokio::test]
    async fn test_upload_url_is_prefixed_and_typed() {
        let mut client = mock();
        client
            .expect_presign_write()
            .with(eq("images/a/b.png"), eq("image/png"), always())
            .times(1)
            .returning(|key, _, _| Ok(format!("https://storage.example/{key}?put")));

        let url = adapter(client)
            .generate_upload_url("a/b.png", "image/png", Duration::from_secs(300))
            .await
            .expect("signing should succeed");

        assert_eq!(url, "https://storage.example/images/a/b.png?put");
    }

    #[tokio::test]
    async fn test_upload_url_failure_is_signing_error() {
        let mut client = mock();
        client
            .expect_presign_write()
            .returning(|_, _, _| Err(provider_error()));

        let err = adapter(client)
            .generate_upload_url("a.png", "image/png", Duration::from_secs(300))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Signing { ref path, .. } if path == "images/a.png"));
    }

    #[tokio::test]
    async fn test_signed_urls_are_not_memoized() {
        let mut client = mock();
        client
            .expect_presign_read()
            .times(3)
            .returning(|key, ttl| Ok(format!("https://s/{key}?ttl={}", ttl.as_secs())));

        let storage = adapter(client);
        let a = storage
            .generate_read_url("images/a.jpg", Duration::from_secs(60))
            .await
            .expect("sign a");
        let b = storage
            .generate_read_url("images/a.jpg", Duration::from_secs(120))
            .await
            .expect("sign b");
        let c = storage
            .generate_read_url("images/c.jpg", Duration::from_secs(60))
            .await
            .expect("sign c");

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[tokio::test]
    async fn test_download_returns_content() {
        let mut client = mock();
        client
            .expect_get()
            .with(eq("images/a.jpg"))
            .returning(|_| Ok(Some(Bytes::from_static(b"jpeg"))));

        let data = adapter(client).download("images/a.jpg").await;
        assert_eq!(data, Some(Bytes::from_static(b"jpeg")));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_download_missing_is_none() {
        let mut client = mock();
        client.expect_get().returning(|_| Ok(None));

        assert_eq!(adapter(client).download("images/none.jpg").await, None);
        logs_assert(|lines| logged_at(lines, "WARN", "Object not found"));
        assert!(!logs_contain("Failed to download object"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_download_error_is_swallowed() {
        let mut client = mock();
        client.expect_get().returning(|_| Err(provider_error()));

        assert_eq!(adapter(client).download("images/a.jpg").await, None);
        logs_assert(|lines| logged_at(lines, "ERROR", "Failed to download object"));
        assert!(logs_contain("backend unavailable"));
        assert!(!logs_contain("Object not found"));
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let mut client = mock();
        client
            .expect_delete()
            .with(eq("images/a.jpg"))
            .returning(|_| Ok(true));

        assert!(adapter(client).delete("images/a.jpg").await);
    }

    #[tokio::test]
    async fn test_delete_missing_is_false() {
        let mut client = mock();
        client.expect_delete().returning(|_| Ok(false));

        assert!(!adapter(client).delete("images/a.jpg").await);
    }

    #[tokio::test]
    async fn test_delete_error_is_false() {
        let mut client = mock();
        client.expect_delete().returning(|_| Err(provider_error()));

        assert!(!adapter(client).delete("images/a.jpg").await);
    }

    #[tokio::test]
    async fn test_exists_passes_through() {
        let mut client = mock();
        client
            .expect_exists()
            .with(eq("images/a.jpg"))
            .returning(|_| Ok(true));
        client
            .expect_exists()
            .with(eq("images/b.jpg"))
            .returning(|_| Ok(false));

        let storage = adapter(client);
        assert!(storage.exists("images/a.jpg").await.expect("lookup"));
        assert!(!storage.exists("images/b.jpg").await.expect("lookup"));
    }

    #[tokio::test]
    async fn test_exists_error_propagates() {
        let mut client = mock();
        client.expect_exists().returning(|_| Err(provider_error()));

        let err = adapter(client).exists("images/a.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::Lookup { ref path, .. } if path == "images/a.jpg"));
    }

    #[tokio::test]
    async fn test_verify_bucket() {
        let mut present = mock();
        present.expect_bucket_exists().returning(|| Ok(true));
        assert!(adapter(present).verify_bucket().await);

        let mut absent = mock();
        absent.expect_bucket_exists().returning(|| Ok(false));
        assert!(!adapter(absent).verify_bucket().await);

        let mut failing = mock();
        failing
            .expect_bucket_exists()
            .returning(|| Err(provider_error()));
        assert!(!adapter(failing).verify_bucket().await);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_missing_bucket_is_logged() {
        let mut absent = mock();
        absent.expect_bucket_exists().returning(|| Ok(false));

        assert!(!adapter(absent).verify_bucket().await);
        logs_assert(|lines| logged_at(lines, "WARN", "Bucket does not exist"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_removed_local_root_fails_verification() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().join("bucket");
        let storage = ImageStorageAdapter::connect(StorageConfig::new(StorageProvider::local_fs(
            &root,
        )))
        .await
        .expect("fs storage");
        assert!(!logs_contain("Bucket does not exist"));

        std::fs::remove_dir_all(&root).expect("remove root");

        assert!(!storage.verify_bucket().await);
        logs_assert(|lines| logged_at(lines, "WARN", "Bucket does not exist"));
    }

    #[test]
    fn test_new_rejects_unreadable_credentials() {
        let provider = StorageProvider::Gcs {
            bucket: "demeter-photos".to_string(),
            project_id: "demeter-prod".to_string(),
            credential_path: Some("/definitely/not/here.json".to_string()),
        };

        let result = ImageStorageAdapter::new(StorageConfig::new(provider));
        assert!(matches!(result, Err(StorageError::Initialization(_))));
    }
}
