//! Admin login: password sign-in, then the same admin check the guard performs.

use crate::domain::{DomainError, Session};
use crate::ports::{AuthorizationPort, IdentityPort, NavigatorPort};
use std::sync::Arc;
use tracing::{info, warn};

pub struct LoginService {
    identity: Arc<dyn IdentityPort>,
    authorization: Arc<dyn AuthorizationPort>,
    navigator: Arc<dyn NavigatorPort>,
    admin_home: String,
}

impl LoginService {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        authorization: Arc<dyn AuthorizationPort>,
        navigator: Arc<dyn NavigatorPort>,
        admin_home: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            authorization,
            navigator,
            admin_home: admin_home.into(),
        }
    }

    /// Sign in and require `is_admin`. Non-admins are signed out again.
    ///
    /// Errors are `InvalidCredentials` or `NotAdmin` only; the cause is logged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let session = self
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                warn!(error = %e, "sign-in rejected");
                DomainError::InvalidCredentials
            })?;

        let is_admin = match self
            .authorization
            .fetch_authorization_record(&session.user_id)
            .await
        {
            Ok(record) => record.is_some_and(|r| r.is_admin),
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "admin lookup failed at login");
                false
            }
        };

        if !is_admin {
            if let Err(e) = self.identity.sign_out_session(&session).await {
                warn!(error = %e, "sign-out of non-admin failed");
            }
            return Err(DomainError::NotAdmin);
        }

        info!(user_id = %session.user_id, "admin signed in");
        self.navigator.redirect(&self.admin_home);
        Ok(session)
    }

    /// End the session. The mounted guard reacts to the `SignedOut` event.
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.identity.sign_out().await
    }
}
