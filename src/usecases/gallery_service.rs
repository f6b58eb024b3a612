//! Gallery management: list, add from URL or upload, delete.

use super::media_upload::MediaUploader;
use crate::domain::{DomainError, GalleryImage, UploadFile};
use crate::ports::GalleryRepoPort;
use std::sync::Arc;
use tracing::info;

const GALLERY_FOLDER: &str = "gallery";

/// Image to add. At least one of `image_url` / `file`; the file wins when both are set.
#[derive(Debug, Clone, Default)]
pub struct NewImage {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub file: Option<UploadFile>,
}

pub struct GalleryService {
    repo: Arc<dyn GalleryRepoPort>,
    uploader: Arc<MediaUploader>,
    bucket: String,
    max_upload_bytes: usize,
}

impl GalleryService {
    pub fn new(
        repo: Arc<dyn GalleryRepoPort>,
        uploader: Arc<MediaUploader>,
        bucket: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repo,
            uploader,
            bucket: bucket.into(),
            max_upload_bytes,
        }
    }

    pub async fn list(&self) -> Result<Vec<GalleryImage>, DomainError> {
        self.repo.list().await
    }

    /// Reject non-images and oversized files before any upload.
    pub fn check_file(&self, file: &UploadFile) -> Result<(), DomainError> {
        if !file.is_image() {
            return Err(DomainError::Validation("please upload an image file".into()));
        }
        if file.bytes.len() > self.max_upload_bytes {
            return Err(DomainError::Validation(format!(
                "file size must be at most {} bytes",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    pub async fn add(&self, image: NewImage) -> Result<(), DomainError> {
        let title = image
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let url = match (image.file, image.image_url.filter(|u| !u.trim().is_empty())) {
            (Some(file), _) => {
                self.check_file(&file)?;
                self.uploader
                    .upload(&self.bucket, GALLERY_FOLDER, &file)
                    .await?
            }
            (None, Some(url)) => url.trim().to_string(),
            (None, None) => {
                return Err(DomainError::Validation(
                    "provide an image URL or upload an image".into(),
                ));
            }
        };
        self.repo.insert(title.as_deref(), &url).await?;
        info!(url = %url, "gallery image added");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        self.repo.delete(id).await?;
        info!(id, "gallery image deleted");
        Ok(())
    }
}
