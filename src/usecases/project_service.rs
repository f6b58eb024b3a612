//! Admin project management: list, create, update, delete, with optional cover upload.
//!
//! A cover that fails to upload in every bucket does not block the save; the project
//! keeps its URL field and the outcome reports the failure.

use super::media_upload::MediaUploader;
use crate::domain::slug::generate_slug;
use crate::domain::{DomainError, Project, ProjectDraft, UploadFile, UserId};
use crate::ports::{IdentityPort, ProjectRepoPort};
use std::sync::Arc;
use tracing::{info, warn};

const COVER_FOLDER: &str = "projects";

/// Result of a create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOutcome {
    pub cover_upload_failed: bool,
}

pub struct ProjectService {
    identity: Arc<dyn IdentityPort>,
    repo: Arc<dyn ProjectRepoPort>,
    uploader: Arc<MediaUploader>,
    cover_buckets: Vec<String>,
}

impl ProjectService {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        repo: Arc<dyn ProjectRepoPort>,
        uploader: Arc<MediaUploader>,
        cover_buckets: Vec<String>,
    ) -> Self {
        Self {
            identity,
            repo,
            uploader,
            cover_buckets,
        }
    }

    async fn current_user(&self) -> Result<UserId, DomainError> {
        self.identity
            .current_session()
            .await?
            .map(|s| s.user_id)
            .ok_or(DomainError::SessionAbsent)
    }

    /// Projects of the signed-in user, newest first. Empty without a session.
    pub async fn list_own(&self) -> Result<Vec<Project>, DomainError> {
        match self.identity.current_session().await? {
            Some(session) => self.repo.list_owned(&session.user_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn create(
        &self,
        draft: ProjectDraft,
        cover: Option<UploadFile>,
    ) -> Result<SaveOutcome, DomainError> {
        let owner = self.current_user().await?;
        let (draft, outcome) = self.prepare(draft, cover).await?;
        self.repo.insert(&owner, &draft).await?;
        info!(slug = %draft.slug, owner = %owner, "project created");
        Ok(outcome)
    }

    pub async fn update(
        &self,
        id: &str,
        draft: ProjectDraft,
        cover: Option<UploadFile>,
    ) -> Result<SaveOutcome, DomainError> {
        let (draft, outcome) = self.prepare(draft, cover).await?;
        self.repo.update(id, &draft).await?;
        info!(id, slug = %draft.slug, "project updated");
        Ok(outcome)
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        self.repo.delete(id).await?;
        info!(id, "project deleted");
        Ok(())
    }

    /// Validate, fill the slug from the title, upload the cover if one was picked.
    async fn prepare(
        &self,
        mut draft: ProjectDraft,
        cover: Option<UploadFile>,
    ) -> Result<(ProjectDraft, SaveOutcome), DomainError> {
        draft.title = draft.title.trim().to_string();
        if draft.title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        draft.slug = if draft.slug.trim().is_empty() {
            generate_slug(&draft.title)
        } else {
            draft.slug.trim().to_string()
        };
        draft.cover_url = draft.cover_url.filter(|u| !u.trim().is_empty());
        draft.repo_url = draft.repo_url.filter(|u| !u.trim().is_empty());
        draft.demo_url = draft.demo_url.filter(|u| !u.trim().is_empty());

        let mut outcome = SaveOutcome::default();
        if let Some(file) = cover {
            match self
                .uploader
                .upload_with_fallback(&self.cover_buckets, COVER_FOLDER, &file)
                .await
            {
                Ok(url) => draft.cover_url = Some(url),
                Err(e) => {
                    warn!(error = %e, file = %file.name, "cover upload failed, saving without it");
                    outcome.cover_upload_failed = true;
                }
            }
        }
        Ok((draft, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryIdentity, InMemoryStorage, InMemoryStore};
    use crate::ports::StoragePort;

    struct Fixture {
        identity: Arc<InMemoryIdentity>,
        storage: Arc<InMemoryStorage>,
        service: ProjectService,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(InMemoryIdentity::new());
        identity.set_session(Some(identity.make_session("u1")));
        let store = Arc::new(InMemoryStore::new());
        let storage = Arc::new(InMemoryStorage::new());
        let uploader = Arc::new(MediaUploader::new(
            Arc::clone(&storage) as Arc<dyn StoragePort>
        ));
        let service = ProjectService::new(
            Arc::clone(&identity) as Arc<dyn IdentityPort>,
            store as Arc<dyn ProjectRepoPort>,
            uploader,
            vec!["project-images".into(), "image".into()],
        );
        Fixture {
            identity,
            storage,
            service,
        }
    }

    fn draft(title: &str) -> ProjectDraft {
        ProjectDraft {
            title: title.into(),
            published: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_fills_slug_and_owner() {
        let f = fixture();
        f.service.create(draft("Alpha Tool"), None).await.unwrap();
        let listed = f.service.list_own().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "alpha-tool");
        assert_eq!(listed[0].owner.as_ref().map(|o| o.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn cover_falls_back_then_save_proceeds_without_it() {
        let f = fixture();
        f.storage.reject_bucket("project-images");
        let cover = UploadFile::new("c.jpg", "image/jpeg", vec![0]);
        let out = f.service.create(draft("One"), Some(cover)).await.unwrap();
        assert!(!out.cover_upload_failed);
        let p = &f.service.list_own().await.unwrap()[0];
        assert!(p.cover_url.as_deref().unwrap().starts_with("memory://image/projects/"));

        f.storage.reject_bucket("image");
        let cover = UploadFile::new("d.jpg", "image/jpeg", vec![0]);
        let mut d = draft("Two");
        d.cover_url = Some("https://example.com/keep.png".into());
        let out = f.service.create(d, Some(cover)).await.unwrap();
        assert!(out.cover_upload_failed);
        let two = f
            .service
            .list_own()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.slug == "two")
            .unwrap();
        assert_eq!(two.cover_url.as_deref(), Some("https://example.com/keep.png"));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let f = fixture();
        f.service.create(draft("Old Name"), None).await.unwrap();
        let id = f.service.list_own().await.unwrap()[0].id.clone();

        let mut d = draft("New Name");
        d.slug = "custom".into();
        f.service.update(&id, d, None).await.unwrap();
        let p = &f.service.list_own().await.unwrap()[0];
        assert_eq!(p.title, "New Name");
        assert_eq!(p.slug, "custom");

        f.service.delete(&id).await.unwrap();
        assert!(f.service.list_own().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn requires_title_and_session() {
        let f = fixture();
        assert!(matches!(
            f.service.create(draft("   "), None).await,
            Err(DomainError::Validation(_))
        ));
        f.identity.set_session(None);
        assert!(matches!(
            f.service.create(draft("X"), None).await,
            Err(DomainError::SessionAbsent)
        ));
        assert!(f.service.list_own().await.unwrap().is_empty());
    }
}
