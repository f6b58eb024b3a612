//! Application use cases. Orchestrate domain logic via ports.

pub mod contact_service;
pub mod gallery_service;
pub mod login_service;
pub mod media_upload;
pub mod profile_service;
pub mod project_service;
pub mod public_catalog;
pub mod search_bus;
pub mod search_views;
pub mod session_guard;
pub mod session_refresh;

pub use contact_service::{ContactService, Notification};
pub use gallery_service::{GalleryService, NewImage};
pub use login_service::LoginService;
pub use media_upload::MediaUploader;
pub use profile_service::ProfileService;
pub use project_service::{ProjectService, SaveOutcome};
pub use public_catalog::PublicCatalog;
pub use search_bus::{SearchBus, SearchSubscription};
pub use search_views::{
    DashboardData, DashboardView, GalleryView, ListView, ProjectCounts, ProjectsView, SearchFilter,
    SearchInput,
};
pub use session_guard::{GuardSettings, MountedGuard, SessionGuard};
pub use session_refresh::SessionRefresher;
