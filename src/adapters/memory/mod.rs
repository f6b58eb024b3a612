//! In-memory backend. Used when no Supabase project is configured, and as test fakes.

pub mod identity;
pub mod storage;
pub mod store;

pub use identity::InMemoryIdentity;
pub use storage::{InMemoryStorage, MemoryOutbox, SentMail};
pub use store::InMemoryStore;
