//! Table access over the REST endpoint (`/rest/v1/<table>`).
//!
//! One repo implements every table-backed port. Filters use the `column=eq.value`
//! syntax; writes ask for `return=minimal`.

use super::client::{self, SupabaseClient};
use super::rows::{
    AdminRow, ContactPayload, GalleryPayload, GalleryRow, PROFILE_COLUMNS, PROJECT_COLUMNS,
    ProfilePayload, ProfileRow, ProjectPayload, ProjectRow,
};
use crate::domain::{
    AuthorizationRecord, ContactMessage, DomainError, GalleryImage, OwnerContact, Profile,
    Project, ProjectDraft, UserId,
};
use crate::ports::{
    AuthorizationPort, ContactRepoPort, GalleryRepoPort, ProfileRepoPort, ProjectRepoPort,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;

pub struct SupabaseRepo {
    client: Arc<SupabaseClient>,
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

impl SupabaseRepo {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DomainError> {
        debug!(table, "select");
        let req = self
            .client
            .request(Method::GET, &format!("/rest/v1/{}", table))
            .query(query);
        let res = client::send(req, DomainError::DataStore).await?;
        client::json(res, DomainError::DataStore).await
    }

    async fn write<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        prefer: &str,
        body: Option<&B>,
    ) -> Result<(), DomainError> {
        debug!(table, method = method.as_str(), "write");
        let mut req = self
            .client
            .request(method, &format!("/rest/v1/{}", table))
            .query(query)
            .header("Prefer", prefer);
        if let Some(body) = body {
            req = req.json(body);
        }
        client::send(req, DomainError::DataStore).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthorizationPort for SupabaseRepo {
    async fn fetch_authorization_record(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AuthorizationRecord>, DomainError> {
        let rows: Vec<AdminRow> = self
            .select(
                "profiles",
                &[
                    ("select", "is_admin".into()),
                    ("id", eq(user_id.as_str())),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(AuthorizationRecord::from))
    }
}

#[async_trait]
impl ProjectRepoPort for SupabaseRepo {
    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Project>, DomainError> {
        let rows: Vec<ProjectRow> = self
            .select(
                "projects",
                &[
                    ("select", PROJECT_COLUMNS.into()),
                    ("owner", eq(owner.as_str())),
                    ("order", "created_at.desc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn list_published(&self) -> Result<Vec<Project>, DomainError> {
        let rows: Vec<ProjectRow> = self
            .select(
                "projects",
                &[
                    ("select", PROJECT_COLUMNS.into()),
                    ("published", eq("true")),
                    ("order", "created_at.desc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn insert(&self, owner: &UserId, draft: &ProjectDraft) -> Result<(), DomainError> {
        let body = [ProjectPayload {
            draft,
            owner: Some(owner.as_str()),
            updated_at: None,
        }];
        self.write(Method::POST, "projects", &[], "return=minimal", Some(&body[..]))
            .await
    }

    async fn update(&self, id: &str, draft: &ProjectDraft) -> Result<(), DomainError> {
        let body = ProjectPayload {
            draft,
            owner: None,
            updated_at: Some(Utc::now()),
        };
        self.write(
            Method::PATCH,
            "projects",
            &[("id", eq(id))],
            "return=minimal",
            Some(&body),
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        self.write::<()>(
            Method::DELETE,
            "projects",
            &[("id", eq(id))],
            "return=minimal",
            None,
        )
        .await
    }
}

#[async_trait]
impl GalleryRepoPort for SupabaseRepo {
    async fn list(&self) -> Result<Vec<GalleryImage>, DomainError> {
        let rows: Vec<GalleryRow> = self
            .select(
                "gallery",
                &[
                    ("select", "*".into()),
                    ("order", "created_at.desc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(GalleryImage::from).collect())
    }

    async fn insert(&self, title: Option<&str>, image_url: &str) -> Result<(), DomainError> {
        let body = [GalleryPayload { title, image_url }];
        self.write(Method::POST, "gallery", &[], "return=minimal", Some(&body[..]))
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        self.write::<()>(
            Method::DELETE,
            "gallery",
            &[("id", eq(&id.to_string()))],
            "return=minimal",
            None,
        )
        .await
    }
}

#[async_trait]
impl ProfileRepoPort for SupabaseRepo {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[
                    ("select", PROFILE_COLUMNS.into()),
                    ("id", eq(user_id.as_str())),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn upsert(&self, user_id: &UserId, profile: &Profile) -> Result<(), DomainError> {
        let body = ProfilePayload {
            id: user_id.as_str(),
            profile,
            updated_at: Utc::now(),
        };
        self.write(
            Method::POST,
            "profiles",
            &[("on_conflict", "id".into())],
            "resolution=merge-duplicates,return=minimal",
            Some(&body),
        )
        .await
    }

    async fn owner_contact(&self) -> Result<OwnerContact, DomainError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[
                    ("select", "email_contact,number_contact,github_url".into()),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(OwnerContact::from).unwrap_or_default())
    }
}

#[async_trait]
impl ContactRepoPort for SupabaseRepo {
    async fn insert_message(&self, message: &ContactMessage) -> Result<(), DomainError> {
        let body = ContactPayload {
            message,
            status: "new",
            created_at: Utc::now(),
        };
        self.write(
            Method::POST,
            "contact_messages",
            &[],
            "return=minimal",
            Some(&body),
        )
        .await
    }
}
