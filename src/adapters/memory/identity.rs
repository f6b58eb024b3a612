//! In-memory identity provider. Implements IdentityPort for demo mode and tests.
//!
//! Session events fan out to every live subscriber; closed receivers are pruned on emit.

use crate::domain::{DomainError, Session, SessionEvent, UserId};
use crate::ports::{IdentityPort, SessionEvents};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct InMemoryIdentity {
    /// email -> (password, user id)
    users: Mutex<HashMap<String, (String, UserId)>>,
    session: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    sign_outs: AtomicUsize,
    issued: AtomicUsize,
    sign_out_gate: Mutex<Option<Arc<Notify>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a password account.
    pub fn with_user(self, email: &str, password: &str, user_id: &str) -> Self {
        lock(&self.users).insert(
            email.to_string(),
            (password.to_string(), UserId::new(user_id)),
        );
        self
    }

    /// Mint a session for `user_id` without emitting anything.
    pub fn make_session(&self, user_id: &str) -> Session {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Session {
            access_token: format!("access-{}-{}", user_id, n),
            refresh_token: format!("refresh-{}-{}", user_id, n),
            user_id: UserId::new(user_id),
            email: None,
            expires_at: None,
        }
    }

    /// Replace the stored session silently (e.g. restored from storage at startup).
    pub fn set_session(&self, session: Option<Session>) {
        *lock(&self.session) = session;
    }

    /// Apply an event's session and deliver the event to subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let mut session = lock(&self.session);
        *session = event.session.clone();
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Hold `sign_out_session` before it looks at the live session until notified.
    pub fn hold_sign_out(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.sign_out_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Number of live subscriptions (closed receivers are counted until the next emit).
    pub fn subscriber_count(&self) -> usize {
        let mut subs = lock(&self.subscribers);
        subs.retain(|tx| !tx.is_closed());
        subs.len()
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityPort for InMemoryIdentity {
    async fn current_session(&self) -> Result<Option<Session>, DomainError> {
        Ok(lock(&self.session).clone())
    }

    fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, DomainError> {
        let user_id = {
            let users = lock(&self.users);
            match users.get(email) {
                Some((pw, id)) if pw == password => id.clone(),
                _ => return Err(DomainError::InvalidCredentials),
            }
        };
        let mut session = self.make_session(user_id.as_str());
        session.email = Some(email.to_string());
        info!(user_id = %user_id, "signed in (memory)");
        self.emit(SessionEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), DomainError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.emit(SessionEvent::signed_out());
        Ok(())
    }

    async fn sign_out_session(&self, target: &Session) -> Result<bool, DomainError> {
        let gate = lock(&self.sign_out_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut session = lock(&self.session);
        if session.as_ref().map(|s| &s.access_token) != Some(&target.access_token) {
            debug!(user_id = %target.user_id, "session already replaced, sign-out skipped");
            return Ok(false);
        }
        *session = None;
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        let event = SessionEvent::signed_out();
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
        Ok(true)
    }

    async fn refresh_session(&self) -> Result<Session, DomainError> {
        let current = lock(&self.session).clone().ok_or(DomainError::SessionAbsent)?;
        let mut session = self.make_session(current.user_id.as_str());
        session.email = current.email;
        self.emit(SessionEvent::token_refreshed(session.clone()));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionEventKind;

    #[tokio::test]
    async fn sign_in_emits_and_stores_session() {
        let idp = InMemoryIdentity::new().with_user("a@b.c", "pw", "u1");
        let mut events = idp.subscribe();

        assert!(matches!(
            idp.sign_in_with_password("a@b.c", "nope").await,
            Err(DomainError::InvalidCredentials)
        ));

        let s = idp.sign_in_with_password("a@b.c", "pw").await.unwrap();
        assert_eq!(s.user_id.as_str(), "u1");
        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, SessionEventKind::SignedIn);
        assert_eq!(idp.current_session().await.unwrap(), Some(s));

        let refreshed = idp.refresh_session().await.unwrap();
        assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::TokenRefreshed);
        assert_eq!(refreshed.email.as_deref(), Some("a@b.c"));

        idp.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::SignedOut);
        assert_eq!(idp.current_session().await.unwrap(), None);
        assert_eq!(idp.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn targeted_sign_out_leaves_a_newer_session() {
        let idp = InMemoryIdentity::new();
        let old = idp.make_session("u1");
        let newer = idp.make_session("u2");
        idp.emit(SessionEvent::signed_in(old.clone()));
        idp.emit(SessionEvent::signed_in(newer.clone()));
        let mut events = idp.subscribe();

        assert!(!idp.sign_out_session(&old).await.unwrap());
        assert_eq!(idp.current_session().await.unwrap(), Some(newer.clone()));
        assert!(events.try_recv().is_err());
        assert_eq!(idp.sign_out_count(), 0);

        assert!(idp.sign_out_session(&newer).await.unwrap());
        assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::SignedOut);
        assert_eq!(idp.current_session().await.unwrap(), None);
        assert_eq!(idp.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned() {
        let idp = InMemoryIdentity::new();
        let rx = idp.subscribe();
        assert_eq!(idp.subscriber_count(), 1);
        drop(rx);
        assert_eq!(idp.subscriber_count(), 0);
    }
}
