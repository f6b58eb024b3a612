//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: UI/CLI drives the admin console.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Run the interactive console until the user quits.
    async fn run(&self) -> Result<(), DomainError>;
}
