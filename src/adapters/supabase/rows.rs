//! Wire rows of the hosted backend. Every column is optional on the wire and
//! mapped into domain entities here; nothing outside this adapter sees these types.

use crate::domain::{
    AuthorizationRecord, ContactMessage, GalleryImage, OwnerContact, Profile, Project,
    ProjectDraft, Session, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Body of `/auth/v1/token`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<i64>,
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|s| now.timestamp() + s));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: UserId::new(self.user.id),
            email: self.user.email,
            expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminRow {
    pub is_admin: Option<bool>,
}

impl From<AdminRow> for AuthorizationRecord {
    fn from(row: AdminRow) -> Self {
        Self {
            is_admin: row.is_admin.unwrap_or(false),
        }
    }
}

pub const PROJECT_COLUMNS: &str =
    "id,title,slug,description,tags,cover_url,repo_url,demo_url,published,owner,created_at,updated_at";

#[derive(Debug, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub published: Option<bool>,
    pub owner: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            title: row.title.unwrap_or_default(),
            slug: row.slug.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            tags: row.tags.unwrap_or_default(),
            cover_url: row.cover_url.filter(|s| !s.is_empty()),
            repo_url: row.repo_url.filter(|s| !s.is_empty()),
            demo_url: row.demo_url.filter(|s| !s.is_empty()),
            published: row.published.unwrap_or(false),
            owner: row.owner.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert/update payload. `owner` only on insert.
#[derive(Debug, Serialize)]
pub struct ProjectPayload<'a> {
    #[serde(flatten)]
    pub draft: &'a ProjectDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GalleryRow {
    pub id: i64,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<GalleryRow> for GalleryImage {
    fn from(row: GalleryRow) -> Self {
        Self {
            id: row.id,
            title: row.title.filter(|t| !t.is_empty()),
            image_url: row.image_url.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GalleryPayload<'a> {
    pub title: Option<&'a str>,
    pub image_url: &'a str,
}

pub const PROFILE_COLUMNS: &str = "display_name,bio,avatar_url,city_name,city_image_url,profession,email_contact,number_contact,github_url";

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRow {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub city_name: Option<String>,
    pub city_image_url: Option<String>,
    pub profession: Option<String>,
    pub email_contact: Option<String>,
    pub number_contact: Option<String>,
    pub github_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            display_name: row.display_name.unwrap_or_default(),
            bio: row.bio.unwrap_or_default(),
            avatar_url: row.avatar_url.unwrap_or_default(),
            city_name: row.city_name.unwrap_or_default(),
            city_image_url: row.city_image_url.unwrap_or_default(),
            profession: row.profession.unwrap_or_default(),
            email_contact: row.email_contact.unwrap_or_default(),
            number_contact: row.number_contact.unwrap_or_default(),
            github_url: row.github_url.unwrap_or_default(),
        }
    }
}

impl From<ProfileRow> for OwnerContact {
    fn from(row: ProfileRow) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            email_contact: present(row.email_contact),
            number_contact: present(row.number_contact),
            github_url: present(row.github_url),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfilePayload<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub profile: &'a Profile,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ContactPayload<'a> {
    #[serde(flatten)]
    pub message: &'a ContactMessage,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_response_maps_to_session() {
        let body = r#"{"access_token":"a","refresh_token":"r","expires_in":3600,
            "token_type":"bearer","user":{"id":"u1","email":"me@site"}}"#;
        let t: TokenResponse = serde_json::from_str(body).unwrap();
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let s = t.into_session(now);
        assert_eq!(s.user_id.as_str(), "u1");
        assert_eq!(s.expires_at, Some(4_600));
    }

    #[test]
    fn sparse_rows_fill_defaults() {
        let p: Project = serde_json::from_str::<ProjectRow>(r#"{"id":"7","title":null,"cover_url":""}"#)
            .unwrap()
            .into();
        assert_eq!(p.title, "");
        assert!(p.tags.is_empty());
        assert_eq!(p.cover_url, None);
        assert!(!p.published);

        let admin: AuthorizationRecord =
            serde_json::from_str::<AdminRow>(r#"{"is_admin":null}"#).unwrap().into();
        assert!(!admin.is_admin);

        let contact: OwnerContact =
            serde_json::from_str::<ProfileRow>(r#"{"email_contact":" ","github_url":"gh"}"#)
                .unwrap()
                .into();
        assert_eq!(contact.email_contact, None);
        assert_eq!(contact.github_url.as_deref(), Some("gh"));
    }

    #[test]
    fn payloads_flatten_domain_fields() {
        let draft = ProjectDraft {
            title: "T".into(),
            slug: "t".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(ProjectPayload {
            draft: &draft,
            owner: Some("u1"),
            updated_at: None,
        })
        .unwrap();
        assert_eq!(v["title"], "T");
        assert_eq!(v["owner"], "u1");
        assert!(v.get("updated_at").is_none());

        let msg = ContactMessage {
            sender_name: "A".into(),
            sender_email: "a@b.co".into(),
            message: "hi".into(),
        };
        let v = serde_json::to_value(ContactPayload {
            message: &msg,
            status: "new",
            created_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(v["status"], "new");
        assert_eq!(v["sender_email"], "a@b.co");
    }
}
