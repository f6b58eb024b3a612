//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is not an admin")]
    NotAdmin,

    #[error("No active session")]
    SessionAbsent,

    /// Session present but the admin check failed or could not be confirmed.
    #[error("Authorization denied")]
    AuthorizationDenied,

    #[error("Data store error: {0}")]
    DataStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("UI error: {0}")]
    Ui(String),
}
