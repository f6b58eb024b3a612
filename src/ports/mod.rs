//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into the hosted backend
//! - Browser: Navigation and address bar of the current tab

pub mod browser;
pub mod inbound;
pub mod outbound;

pub use browser::{AddressBarPort, NavigatorPort};
pub use inbound::InputPort;
pub use outbound::{
    AuthorizationPort, ContactRepoPort, GalleryRepoPort, IdentityPort, MailPort,
    ProfileRepoPort, ProjectRepoPort, SessionEvents, StoragePort,
};
