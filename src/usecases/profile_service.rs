//! Own profile: load and save, with optional avatar / city picture uploads.

use super::media_upload::MediaUploader;
use crate::domain::{DomainError, Profile, UploadFile, UserId};
use crate::ports::{IdentityPort, ProfileRepoPort};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProfileService {
    identity: Arc<dyn IdentityPort>,
    repo: Arc<dyn ProfileRepoPort>,
    uploader: Arc<MediaUploader>,
    bucket: String,
}

impl ProfileService {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        repo: Arc<dyn ProfileRepoPort>,
        uploader: Arc<MediaUploader>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            repo,
            uploader,
            bucket: bucket.into(),
        }
    }

    async fn current_user(&self) -> Result<UserId, DomainError> {
        self.identity
            .current_session()
            .await?
            .map(|s| s.user_id)
            .ok_or(DomainError::SessionAbsent)
    }

    /// Own profile; all-empty when no row exists yet.
    pub async fn load(&self) -> Result<Profile, DomainError> {
        let user = self.current_user().await?;
        Ok(self.repo.get(&user).await?.unwrap_or_default())
    }

    /// Upsert the profile. A picture that fails to upload keeps its previous URL.
    pub async fn save(
        &self,
        mut profile: Profile,
        avatar: Option<UploadFile>,
        city_image: Option<UploadFile>,
    ) -> Result<Profile, DomainError> {
        let user = self.current_user().await?;
        if let Some(file) = avatar {
            if let Some(url) = self.try_upload("avatars", &file).await {
                profile.avatar_url = url;
            }
        }
        if let Some(file) = city_image {
            if let Some(url) = self.try_upload("cities", &file).await {
                profile.city_image_url = url;
            }
        }
        self.repo.upsert(&user, &profile).await?;
        info!(user_id = %user, "profile saved");
        Ok(profile)
    }

    async fn try_upload(&self, folder: &str, file: &UploadFile) -> Option<String> {
        match self.uploader.upload(&self.bucket, folder, file).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(folder, error = %e, "profile picture upload failed");
                None
            }
        }
    }
}
