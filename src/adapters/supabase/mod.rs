//! Hosted backend adapters (auth, REST tables, storage) sharing one HTTP client.

pub mod auth_adapter;
pub mod client;
pub mod rest_repo;
pub mod rows;
pub mod storage;

pub use auth_adapter::SupabaseIdentity;
pub use client::SupabaseClient;
pub use rest_repo::SupabaseRepo;
pub use storage::SupabaseStorage;
