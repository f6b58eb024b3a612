//! Implements IdentityPort against the hosted auth API (`/auth/v1`).
//!
//! The session lives in the shared client so REST and storage calls use it.
//! Every change is fanned out to subscribers; closed receivers are pruned on emit.

use super::client::{self, SupabaseClient};
use super::rows::TokenResponse;
use crate::domain::{DomainError, Session, SessionEvent};
use crate::ports::{IdentityPort, SessionEvents};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct SupabaseIdentity {
    client: Arc<SupabaseClient>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl SupabaseIdentity {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self {
            client,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<SessionEvent>>> {
        self.subscribers.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The subscriber lock is held across the session update so events arrive in
    /// the order the session changed.
    fn emit(&self, event: SessionEvent) {
        let mut subscribers = self.subscribers();
        self.client.set_session(event.session.clone());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Clear and announce sign-out only while `session` is still the live one.
    fn emit_signed_out_if_live(&self, session: &Session) -> bool {
        let mut subscribers = self.subscribers();
        if !self.client.clear_session_if(&session.access_token) {
            return false;
        }
        let event = SessionEvent::signed_out();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        true
    }

    fn is_live(&self, session: &Session) -> bool {
        self.client
            .session()
            .is_some_and(|s| s.access_token == session.access_token)
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, DomainError> {
        let req = self
            .client
            .request(Method::POST, &format!("/auth/v1/token?grant_type={}", grant_type))
            .json(&body);
        let res = client::send(req, DomainError::Identity).await?;
        let token: TokenResponse = client::json(res, DomainError::Identity).await?;
        Ok(token.into_session(Utc::now()))
    }
}

#[async_trait]
impl IdentityPort for SupabaseIdentity {
    async fn current_session(&self) -> Result<Option<Session>, DomainError> {
        Ok(self.client.session())
    }

    fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().push(tx);
        rx
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, DomainError> {
        let session = self
            .token(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        info!(user_id = %session.user_id, "signed in");
        self.emit(SessionEvent::signed_in(session.clone()));
        Ok(session)
    }

    /// Revokes remotely when possible; the local session is always cleared.
    async fn sign_out(&self) -> Result<(), DomainError> {
        if self.client.session().is_some() {
            let req = self.client.request(Method::POST, "/auth/v1/logout");
            if let Err(e) = client::send(req, DomainError::Identity).await {
                warn!(error = %e, "remote sign-out failed, clearing local session");
            }
        }
        self.emit(SessionEvent::signed_out());
        info!("signed out");
        Ok(())
    }

    /// Revokes `session` remotely, then clears it locally unless it was replaced meanwhile.
    async fn sign_out_session(&self, session: &Session) -> Result<bool, DomainError> {
        if !self.is_live(session) {
            debug!(user_id = %session.user_id, "session already replaced, sign-out skipped");
            return Ok(false);
        }
        let req = self
            .client
            .request_as(Method::POST, "/auth/v1/logout", &session.access_token);
        if let Err(e) = client::send(req, DomainError::Identity).await {
            warn!(error = %e, "remote sign-out failed, clearing local session");
        }
        let cleared = self.emit_signed_out_if_live(session);
        if cleared {
            info!(user_id = %session.user_id, "signed out");
        } else {
            debug!(user_id = %session.user_id, "session replaced during sign-out, kept");
        }
        Ok(cleared)
    }

    async fn refresh_session(&self) -> Result<Session, DomainError> {
        let refresh_token = self
            .client
            .session()
            .map(|s| s.refresh_token)
            .ok_or(DomainError::SessionAbsent)?;
        let session = self
            .token(
                "refresh_token",
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;
        self.emit(SessionEvent::token_refreshed(session.clone()));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionEventKind, UserId};

    fn session() -> Session {
        Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            user_id: UserId::new("u1"),
            email: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn emit_updates_shared_session_and_prunes_closed_subscribers() {
        let client = Arc::new(SupabaseClient::new("http://localhost:1", "anon"));
        let identity = SupabaseIdentity::new(Arc::clone(&client));
        let mut live = identity.subscribe();
        drop(identity.subscribe());

        identity.emit(SessionEvent::signed_in(session()));
        assert_eq!(identity.subscribers().len(), 1);
        assert_eq!(live.recv().await.map(|e| e.kind), Some(SessionEventKind::SignedIn));
        assert_eq!(
            identity.current_session().await.unwrap().map(|s| s.user_id),
            Some(UserId::new("u1"))
        );
    }

    #[tokio::test]
    async fn refresh_without_session_is_absent() {
        let client = Arc::new(SupabaseClient::new("http://localhost:1", "anon"));
        let identity = SupabaseIdentity::new(client);
        assert!(matches!(
            identity.refresh_session().await,
            Err(DomainError::SessionAbsent)
        ));
    }

    #[tokio::test]
    async fn targeted_sign_out_of_a_replaced_session_is_a_no_op() {
        let client = Arc::new(SupabaseClient::new("http://localhost:1", "anon"));
        let identity = SupabaseIdentity::new(Arc::clone(&client));
        let mut newer = session();
        newer.access_token = "b".into();
        identity.emit(SessionEvent::signed_in(newer));
        let mut rx = identity.subscribe();

        assert!(!identity.sign_out_session(&session()).await.unwrap());
        assert!(!identity.emit_signed_out_if_live(&session()));
        assert_eq!(client.session().map(|s| s.access_token), Some("b".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sign_out_without_session_emits_locally() {
        let client = Arc::new(SupabaseClient::new("http://localhost:1", "anon"));
        let identity = SupabaseIdentity::new(client);
        let mut rx = identity.subscribe();
        identity.sign_out().await.unwrap();
        assert_eq!(rx.recv().await.map(|e| e.kind), Some(SessionEventKind::SignedOut));
    }
}
