//! Background token refresh.
//!
//! Exchanges the refresh token shortly before the access token expires. The provider
//! emits `TokenRefreshed`, so mounted guards re-check the admin attribute. A failed
//! refresh signs the expired session out instead of leaving it to fail every call.

use crate::domain::{Session, SessionEvent};
use crate::ports::IdentityPort;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Time until `expires_at - margin`, zero when already due. `None` if the session
/// never expires.
pub fn refresh_delay(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    margin: Duration,
) -> Option<Duration> {
    let left = (expires_at? - now).to_std().unwrap_or(Duration::ZERO);
    Some(left.saturating_sub(margin))
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

pub struct SessionRefresher {
    identity: Arc<dyn IdentityPort>,
    margin: Duration,
}

impl SessionRefresher {
    pub fn new(identity: Arc<dyn IdentityPort>, margin: Duration) -> Self {
        Self { identity, margin }
    }

    /// Start the refresh loop. Must be called inside a tokio runtime; abort the
    /// handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut events = self.identity.subscribe();
        let mut live = self.identity.current_session().await.ok().flatten();

        loop {
            let delay = live
                .as_ref()
                .and_then(|s| refresh_delay(s.expires_at, Utc::now(), self.margin));
            tokio::select! {
                event = events.recv() => match event {
                    Some(SessionEvent { session, .. }) => live = session,
                    None => break,
                },
                _ = sleep_for(delay) => {
                    // The provider's own event delivers the next session.
                    if let Some(session) = live.take() {
                        self.refresh(session).await;
                    }
                }
            }
        }
        debug!("session refresher stopped");
    }

    async fn refresh(&self, session: Session) {
        debug!(user_id = %session.user_id, "refreshing session");
        match self.identity.refresh_session().await {
            Ok(refreshed) => info!(user_id = %refreshed.user_id, "session refreshed"),
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "session refresh failed, signing out");
                if let Err(e) = self.identity.sign_out_session(&session).await {
                    warn!(error = %e, "sign-out after failed refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryIdentity;
    use crate::domain::SessionEventKind;
    use chrono::TimeZone;

    fn expiring_in(idp: &InMemoryIdentity, user: &str, ms: i64) -> Session {
        let mut s = idp.make_session(user);
        s.expires_at = Some(Utc::now() + chrono::Duration::milliseconds(ms));
        s
    }

    #[test]
    fn delay_counts_down_to_the_margin() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let in_an_hour = now + chrono::Duration::hours(1);
        let margin = Duration::from_secs(60);

        assert_eq!(
            refresh_delay(Some(in_an_hour), now, margin),
            Some(Duration::from_secs(3540))
        );
        assert_eq!(
            refresh_delay(Some(now + chrono::Duration::seconds(30)), now, margin),
            Some(Duration::ZERO)
        );
        assert_eq!(
            refresh_delay(Some(now - chrono::Duration::seconds(5)), now, margin),
            Some(Duration::ZERO)
        );
        assert_eq!(refresh_delay(None, now, margin), None);
    }

    #[tokio::test]
    async fn expiring_session_is_refreshed_before_expiry() {
        let idp = Arc::new(InMemoryIdentity::new());
        let session = expiring_in(&idp, "u1", 40);
        idp.set_session(Some(session.clone()));
        let mut events = idp.subscribe();

        let handle = SessionRefresher::new(
            Arc::clone(&idp) as Arc<dyn IdentityPort>,
            Duration::from_millis(10),
        )
        .spawn();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, SessionEventKind::TokenRefreshed);
        let refreshed = event.session.unwrap();
        assert_eq!(refreshed.user_id, session.user_id);
        assert_ne!(refreshed.access_token, session.access_token);
        handle.abort();
    }

    #[tokio::test]
    async fn signed_out_session_is_not_refreshed() {
        let idp = Arc::new(InMemoryIdentity::new());
        idp.emit(SessionEvent::signed_in(expiring_in(&idp, "u1", 80)));
        let mut events = idp.subscribe();

        let handle = SessionRefresher::new(
            Arc::clone(&idp) as Arc<dyn IdentityPort>,
            Duration::ZERO,
        )
        .spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        idp.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(events.recv().await.map(|e| e.kind), Some(SessionEventKind::SignedOut));
        assert!(events.try_recv().is_err());
        assert_eq!(idp.current_session().await.unwrap(), None);
        handle.abort();
    }
}
