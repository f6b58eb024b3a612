//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod guard;
pub mod search;
pub mod slug;

pub use entities::{
    ActivityEntry, AuthorizationRecord, ContactMessage, GalleryImage, OwnerContact, Profile,
    Project, ProjectDraft, Session, SessionEvent, SessionEventKind, UploadFile, UserId,
};
pub use errors::DomainError;
pub use guard::{GuardDecision, RenderState};
pub use search::{SEARCH_PARAM, SearchQuery, Searchable};
