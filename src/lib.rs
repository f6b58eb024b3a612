//! folio-admin: portfolio site core with Hexagonal Architecture.
//!
//! Admin session guard, page-scoped search synchronization and content management
//! over a hosted backend.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
