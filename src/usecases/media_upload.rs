//! Upload a picked file to object storage, trying buckets in order.
//!
//! Object path: `<folder>/<unix millis>-<seq>.<ext>`. Returns the public URL of the
//! first bucket that accepts the file.

use crate::domain::{DomainError, UploadFile};
use crate::ports::StoragePort;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

pub struct MediaUploader {
    storage: Arc<dyn StoragePort>,
    seq: AtomicU64,
}

impl MediaUploader {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self {
            storage,
            seq: AtomicU64::new(0),
        }
    }

    fn object_path(&self, folder: &str, file: &UploadFile) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}/{}-{}.{}",
            folder,
            Utc::now().timestamp_millis(),
            seq,
            file.extension()
        )
    }

    /// Try each bucket in `buckets`; the error of the last attempt when all fail.
    pub async fn upload_with_fallback(
        &self,
        buckets: &[String],
        folder: &str,
        file: &UploadFile,
    ) -> Result<String, DomainError> {
        let path = self.object_path(folder, file);
        let mut last_err = DomainError::Storage("no bucket configured".into());
        for bucket in buckets {
            match self
                .storage
                .upload(bucket, &path, &file.content_type, &file.bytes)
                .await
            {
                Ok(()) => {
                    let url = self.storage.public_url(bucket, &path);
                    info!(bucket = %bucket, path = %path, "upload stored");
                    return Ok(url);
                }
                Err(e) => {
                    warn!(bucket = %bucket, path = %path, error = %e, "upload failed, trying next bucket");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    /// Single-bucket upload.
    pub async fn upload(
        &self,
        bucket: &str,
        folder: &str,
        file: &UploadFile,
    ) -> Result<String, DomainError> {
        self.upload_with_fallback(&[bucket.to_string()], folder, file)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStorage;

    fn png() -> UploadFile {
        UploadFile::new("cover.png", "image/png", vec![1, 2, 3])
    }

    fn buckets() -> Vec<String> {
        vec!["project-images".to_string(), "image".to_string()]
    }

    #[tokio::test]
    async fn first_bucket_wins() {
        let storage = Arc::new(InMemoryStorage::new());
        let up = MediaUploader::new(Arc::clone(&storage) as Arc<dyn StoragePort>);
        let url = up
            .upload_with_fallback(&buckets(), "projects", &png())
            .await
            .unwrap();
        assert!(url.starts_with("memory://project-images/projects/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn falls_back_to_next_bucket() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.reject_bucket("project-images");
        let up = MediaUploader::new(Arc::clone(&storage) as Arc<dyn StoragePort>);
        let url = up
            .upload_with_fallback(&buckets(), "projects", &png())
            .await
            .unwrap();
        assert!(url.starts_with("memory://image/projects/"));
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn all_buckets_failing_is_an_error() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.reject_bucket("project-images");
        storage.reject_bucket("image");
        let up = MediaUploader::new(Arc::clone(&storage) as Arc<dyn StoragePort>);
        let err = up
            .upload_with_fallback(&buckets(), "projects", &png())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert_eq!(storage.object_count(), 0);
    }
}
