//! In-memory data store. Implements the table-backed ports for demo mode and tests.
//!
//! Admin lookups can be held open (`hold_authorization`) or made to fail, so callers
//! can exercise suspended and failing collaborator calls.

use crate::domain::{
    AuthorizationRecord, ContactMessage, DomainError, GalleryImage, OwnerContact, Profile,
    Project, ProjectDraft, UserId,
};
use crate::ports::{
    AuthorizationPort, ContactRepoPort, GalleryRepoPort, ProfileRepoPort, ProjectRepoPort,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    admins: Mutex<HashMap<UserId, bool>>,
    authz_failures: AtomicU32,
    authz_fetches: AtomicUsize,
    holds: Mutex<HashMap<UserId, Arc<Notify>>>,
    projects: Mutex<Vec<Project>>,
    gallery: Mutex<Vec<GalleryImage>>,
    profiles: Mutex<Vec<(UserId, Profile)>>,
    messages: Mutex<Vec<ContactMessage>>,
    next_id: AtomicI64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `is_admin` column for a user (creates the profile row).
    pub fn set_admin(&self, user_id: &str, is_admin: bool) {
        lock(&self.admins).insert(UserId::new(user_id), is_admin);
    }

    /// Fail the next `n` admin lookups.
    pub fn fail_authorization(&self, n: u32) {
        self.authz_failures.store(n, Ordering::SeqCst);
    }

    /// Hold admin lookups for `user_id` until the returned gate is notified.
    pub fn hold_authorization(&self, user_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.holds).insert(UserId::new(user_id), Arc::clone(&gate));
        gate
    }

    pub fn authorization_fetches(&self) -> usize {
        self.authz_fetches.load(Ordering::SeqCst)
    }

    /// Seed a project as-is (tests, demo data).
    pub fn seed_project(&self, project: Project) {
        lock(&self.projects).push(project);
    }

    pub fn seed_gallery(&self, image: GalleryImage) {
        lock(&self.gallery).push(image);
    }

    pub fn messages(&self) -> Vec<ContactMessage> {
        lock(&self.messages).clone()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl AuthorizationPort for InMemoryStore {
    async fn fetch_authorization_record(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AuthorizationRecord>, DomainError> {
        self.authz_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.holds).get(user_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failing = self
            .authz_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::DataStore("profiles lookup failed".into()));
        }
        Ok(lock(&self.admins)
            .get(user_id)
            .map(|&is_admin| AuthorizationRecord { is_admin }))
    }
}

#[async_trait]
impl ProjectRepoPort for InMemoryStore {
    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Project>, DomainError> {
        let mut rows: Vec<Project> = lock(&self.projects)
            .iter()
            .filter(|p| p.owner.as_ref() == Some(owner))
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn list_published(&self) -> Result<Vec<Project>, DomainError> {
        let mut rows: Vec<Project> = lock(&self.projects)
            .iter()
            .filter(|p| p.published)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, owner: &UserId, draft: &ProjectDraft) -> Result<(), DomainError> {
        let mut projects = lock(&self.projects);
        if projects.iter().any(|p| p.slug == draft.slug) {
            return Err(DomainError::DataStore(format!(
                "duplicate slug '{}'",
                draft.slug
            )));
        }
        let now = Utc::now();
        projects.push(Project {
            id: self.next_id().to_string(),
            title: draft.title.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
            tags: draft.tags.clone(),
            cover_url: draft.cover_url.clone(),
            repo_url: draft.repo_url.clone(),
            demo_url: draft.demo_url.clone(),
            published: draft.published,
            owner: Some(owner.clone()),
            created_at: Some(now),
            updated_at: Some(now),
        });
        Ok(())
    }

    async fn update(&self, id: &str, draft: &ProjectDraft) -> Result<(), DomainError> {
        let mut projects = lock(&self.projects);
        let p = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::DataStore(format!("project {} not found", id)))?;
        p.title = draft.title.clone();
        p.slug = draft.slug.clone();
        p.description = draft.description.clone();
        p.tags = draft.tags.clone();
        p.cover_url = draft.cover_url.clone();
        p.repo_url = draft.repo_url.clone();
        p.demo_url = draft.demo_url.clone();
        p.published = draft.published;
        p.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        lock(&self.projects).retain(|p| p.id != id);
        Ok(())
    }
}

/// Newest first; rows without a timestamp last, later insertions before earlier ones.
fn newest_first(rows: &mut [Project]) {
    rows.reverse();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl GalleryRepoPort for InMemoryStore {
    async fn list(&self) -> Result<Vec<GalleryImage>, DomainError> {
        let mut rows = lock(&self.gallery).clone();
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, title: Option<&str>, image_url: &str) -> Result<(), DomainError> {
        let id = self.next_id();
        lock(&self.gallery).push(GalleryImage {
            id,
            title: title.map(String::from),
            image_url: image_url.to_string(),
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        lock(&self.gallery).retain(|g| g.id != id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepoPort for InMemoryStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(lock(&self.profiles)
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, p)| p.clone()))
    }

    async fn upsert(&self, user_id: &UserId, profile: &Profile) -> Result<(), DomainError> {
        let mut profiles = lock(&self.profiles);
        match profiles.iter_mut().find(|(id, _)| id == user_id) {
            Some((_, existing)) => *existing = profile.clone(),
            None => profiles.push((user_id.clone(), profile.clone())),
        }
        Ok(())
    }

    async fn owner_contact(&self) -> Result<OwnerContact, DomainError> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(lock(&self.profiles)
            .first()
            .map(|(_, p)| OwnerContact {
                email_contact: non_empty(&p.email_contact),
                number_contact: non_empty(&p.number_contact),
                github_url: non_empty(&p.github_url),
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContactRepoPort for InMemoryStore {
    async fn insert_message(&self, message: &ContactMessage) -> Result<(), DomainError> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_profile_row_is_none_and_failures_are_consumed() {
        let store = InMemoryStore::new();
        let uid = UserId::new("u1");
        assert_eq!(store.fetch_authorization_record(&uid).await.unwrap(), None);

        store.set_admin("u1", true);
        store.fail_authorization(1);
        assert!(store.fetch_authorization_record(&uid).await.is_err());
        assert_eq!(
            store.fetch_authorization_record(&uid).await.unwrap(),
            Some(AuthorizationRecord { is_admin: true })
        );
        assert_eq!(store.authorization_fetches(), 3);
    }

    #[tokio::test]
    async fn projects_list_newest_first_and_reject_duplicate_slug() {
        let store = InMemoryStore::new();
        let owner = UserId::new("u1");
        let mut draft = ProjectDraft {
            title: "First".into(),
            slug: "first".into(),
            ..Default::default()
        };
        ProjectRepoPort::insert(&store, &owner, &draft).await.unwrap();
        draft.title = "Second".into();
        draft.slug = "second".into();
        ProjectRepoPort::insert(&store, &owner, &draft).await.unwrap();

        let listed = store.list_owned(&owner).await.unwrap();
        assert_eq!(listed[0].title, "Second");
        assert_eq!(listed[1].title, "First");

        assert!(ProjectRepoPort::insert(&store, &owner, &draft).await.is_err());
        assert!(store.list_owned(&UserId::new("other")).await.unwrap().is_empty());
    }
}
