//! Outbound ports. Application calls into the hosted backend.
//!
//! Implemented by adapters.

use crate::domain::{
    AuthorizationRecord, ContactMessage, DomainError, GalleryImage, OwnerContact, Profile,
    Project, ProjectDraft, Session, SessionEvent, UserId,
};
use tokio::sync::mpsc;

/// Stream of session-state changes. Dropping the receiver unsubscribes.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Identity provider: sessions and their lifecycle.
#[async_trait::async_trait]
pub trait IdentityPort: Send + Sync {
    /// Snapshot of the live session, if any.
    async fn current_session(&self) -> Result<Option<Session>, DomainError>;

    /// Subscribe to sign-in / sign-out / token-refresh notifications.
    fn subscribe(&self) -> SessionEvents;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, DomainError>;

    /// Invalidate the current session. Emits `SignedOut` to subscribers.
    async fn sign_out(&self) -> Result<(), DomainError>;

    /// Sign out only while `session` is still the live one; returns whether it was.
    ///
    /// A session replaced in the meantime (newer sign-in or refresh) is left alone and
    /// nothing is emitted.
    async fn sign_out_session(&self, session: &Session) -> Result<bool, DomainError>;

    /// Exchange the refresh token. Emits `TokenRefreshed` to subscribers.
    async fn refresh_session(&self) -> Result<Session, DomainError>;
}

/// Admin attribute lookup (`profiles.is_admin`).
#[async_trait::async_trait]
pub trait AuthorizationPort: Send + Sync {
    /// `Ok(None)` when the user has no profile row.
    async fn fetch_authorization_record(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AuthorizationRecord>, DomainError>;
}

#[async_trait::async_trait]
pub trait ProjectRepoPort: Send + Sync {
    /// Projects owned by `owner`, newest first.
    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Project>, DomainError>;

    /// Published projects of every owner, newest first.
    async fn list_published(&self) -> Result<Vec<Project>, DomainError>;

    async fn insert(&self, owner: &UserId, draft: &ProjectDraft) -> Result<(), DomainError>;

    async fn update(&self, id: &str, draft: &ProjectDraft) -> Result<(), DomainError>;

    async fn delete(&self, id: &str) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
pub trait GalleryRepoPort: Send + Sync {
    /// All images, newest first.
    async fn list(&self) -> Result<Vec<GalleryImage>, DomainError>;

    async fn insert(&self, title: Option<&str>, image_url: &str) -> Result<(), DomainError>;

    async fn delete(&self, id: i64) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
pub trait ProfileRepoPort: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Insert or update the row keyed by `user_id`.
    async fn upsert(&self, user_id: &UserId, profile: &Profile) -> Result<(), DomainError>;

    /// Contact card of the site owner (first profile row).
    async fn owner_contact(&self) -> Result<OwnerContact, DomainError>;
}

#[async_trait::async_trait]
pub trait ContactRepoPort: Send + Sync {
    /// Store a visitor message with status `new`.
    async fn insert_message(&self, message: &ContactMessage) -> Result<(), DomainError>;
}

/// Object storage buckets.
#[async_trait::async_trait]
pub trait StoragePort: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), DomainError>;

    /// Public URL of an object. Pure; does not check existence.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Outgoing email.
#[async_trait::async_trait]
pub trait MailPort: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        reply_to: &str,
    ) -> Result<(), DomainError>;
}
