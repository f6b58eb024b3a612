//! Infrastructure adapters. Implement outbound ports.
//!
//! Hosted backend over HTTP, mail, in-memory demo backend, tab location, terminal UI.
//! Map errors to DomainError.

pub mod browser;
pub mod mail;
pub mod memory;
pub mod supabase;
pub mod ui;
