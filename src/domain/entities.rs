//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/SDK types here; rows from the hosted backend are validated and mapped
//! into these by adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated identity handle. Opaque to the core apart from `user_id`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    pub email: Option<String>,
    /// Unix seconds. `None` when the provider did not report an expiry.
    pub expires_at: Option<i64>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Admin attribute keyed by user id (`profiles.is_admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Session-state change notification from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: SessionEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: SessionEventKind::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: SessionEventKind::TokenRefreshed,
            session: Some(session),
        }
    }
}

/// A portfolio project, owned by an admin user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub published: bool,
    pub owner: Option<UserId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable project fields (create/update payload).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub published: bool,
}

impl ProjectDraft {
    /// Parse a comma-separated tag input, dropping empty entries.
    pub fn parse_tags(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub title: Option<String>,
    pub image_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Public profile of the site owner. Missing columns are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub city_name: String,
    pub city_image_url: String,
    pub profession: String,
    pub email_contact: String,
    pub number_contact: String,
    pub github_url: String,
}

/// Owner contact card shown on the public contact page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnerContact {
    pub email_contact: Option<String>,
    pub number_contact: Option<String>,
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
}

/// Dashboard activity line derived from a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: String,
    pub action: String,
    pub project: String,
    pub time: String,
    pub slug: String,
}

/// File picked for upload (cover, avatar, gallery image).
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Extension after the last dot; the whole name when there is none.
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_empty_ones_dropped() {
        assert_eq!(
            ProjectDraft::parse_tags(" rust, , wasm ,cli,"),
            vec!["rust", "wasm", "cli"]
        );
    }

    #[test]
    fn upload_extension_uses_last_segment() {
        let f = UploadFile::new("cover.final.png", "image/png", vec![]);
        assert_eq!(f.extension(), "png");
        assert!(f.is_image());
        let g = UploadFile::new("README", "text/plain", vec![]);
        assert_eq!(g.extension(), "README");
        assert!(!g.is_image());
    }

    #[test]
    fn session_debug_hides_tokens() {
        let s = Session {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            user_id: UserId::new("u1"),
            email: None,
            expires_at: None,
        };
        let dbg = format!("{:?}", s);
        assert!(dbg.contains("u1"));
        assert!(!dbg.contains("secret"));
    }
}
