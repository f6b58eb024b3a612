//! Read-only queries behind the public pages.

use crate::domain::{DomainError, GalleryImage, OwnerContact, Project};
use crate::ports::{GalleryRepoPort, ProfileRepoPort, ProjectRepoPort};
use std::sync::Arc;

pub struct PublicCatalog {
    projects: Arc<dyn ProjectRepoPort>,
    gallery: Arc<dyn GalleryRepoPort>,
    profiles: Arc<dyn ProfileRepoPort>,
}

impl PublicCatalog {
    pub fn new(
        projects: Arc<dyn ProjectRepoPort>,
        gallery: Arc<dyn GalleryRepoPort>,
        profiles: Arc<dyn ProfileRepoPort>,
    ) -> Self {
        Self {
            projects,
            gallery,
            profiles,
        }
    }

    /// Published projects, newest first.
    pub async fn projects(&self) -> Result<Vec<Project>, DomainError> {
        self.projects.list_published().await
    }

    pub async fn project_by_slug(&self, slug: &str) -> Result<Option<Project>, DomainError> {
        Ok(self
            .projects
            .list_published()
            .await?
            .into_iter()
            .find(|p| p.slug == slug))
    }

    pub async fn gallery(&self) -> Result<Vec<GalleryImage>, DomainError> {
        self.gallery.list().await
    }

    pub async fn owner_contact(&self) -> Result<OwnerContact, DomainError> {
        self.profiles.owner_contact().await
    }
}
