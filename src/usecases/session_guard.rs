//! Session guard for the admin area: live session + `is_admin`, re-checked on every
//! session change.
//!
//! - Each mount owns its decision state (a `watch` channel) and one session subscription
//! - Every triggering event opens a new evaluation cycle with a fresh generation token;
//!   an evaluation only commits (or signs the user out) while its token is the latest
//! - Admin lookup errors fail closed
//! - Unmount bumps the generation and aborts in-flight evaluations

use crate::domain::{
    DomainError, GuardDecision, RenderState, Session, SessionEvent, SessionEventKind, UserId,
};
use crate::ports::{AuthorizationPort, IdentityPort, NavigatorPort, SessionEvents};
use crate::shared::config::{AppConfig, DEFAULT_LOGIN_PATH};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Routing and admin-lookup policy for the guard.
#[derive(Debug, Clone)]
pub struct GuardSettings {
    /// Always let through; denial redirects here.
    pub login_path: String,
    /// Extra admin lookups after a failed one, before failing closed.
    pub authz_retries: u32,
    pub authz_retry_delay: Duration,
    /// `None`: a hanging lookup keeps the guard pending.
    pub authz_timeout: Option<Duration>,
}

impl GuardSettings {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            authz_retries: 0,
            authz_retry_delay: Duration::from_millis(250),
            authz_timeout: None,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            login_path: cfg.login_path_or_default(),
            authz_retries: cfg.authz_retries_or_default(),
            authz_retry_delay: cfg.authz_retry_delay(),
            authz_timeout: cfg.authz_timeout(),
        }
    }
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}

/// Observable guard state. `generation` counts evaluation cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardState {
    pub generation: u64,
    pub decision: GuardDecision,
}

/// Builds one guard per mounted protected subtree.
pub struct SessionGuard {
    identity: Arc<dyn IdentityPort>,
    authorization: Arc<dyn AuthorizationPort>,
    navigator: Arc<dyn NavigatorPort>,
    settings: GuardSettings,
}

impl SessionGuard {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        authorization: Arc<dyn AuthorizationPort>,
        navigator: Arc<dyn NavigatorPort>,
        settings: GuardSettings,
    ) -> Self {
        Self {
            identity,
            authorization,
            navigator,
            settings,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.settings.login_path
    }

    /// Mount the protected subtree for `path`. Must be called inside a tokio runtime.
    ///
    /// The login path is granted immediately and never subscribes, so it cannot loop.
    pub fn mount(&self, path: &str) -> MountedGuard {
        let (state, rx) = watch::channel(GuardState::default());
        let core = Arc::new(GuardCore {
            identity: Arc::clone(&self.identity),
            authorization: Arc::clone(&self.authorization),
            navigator: Arc::clone(&self.navigator),
            settings: self.settings.clone(),
            state,
            mounted: AtomicBool::new(true),
        });

        if path == self.settings.login_path {
            debug!(path, "login route: guard bypassed");
            core.state.send_modify(|s| {
                s.generation += 1;
                s.decision = GuardDecision::Granted;
            });
            return MountedGuard {
                core,
                rx,
                listener: None,
            };
        }

        // Subscribe before the first lookup so no transition is missed.
        let events = self.identity.subscribe();
        let initial = core.begin_cycle();
        debug!(path, generation = initial, "guard mounted");
        let listener = tokio::spawn(Arc::clone(&core).run(initial, events));

        MountedGuard {
            core,
            rx,
            listener: Some(listener),
        }
    }
}

struct GuardCore {
    identity: Arc<dyn IdentityPort>,
    authorization: Arc<dyn AuthorizationPort>,
    navigator: Arc<dyn NavigatorPort>,
    settings: GuardSettings,
    state: watch::Sender<GuardState>,
    mounted: AtomicBool,
}

impl GuardCore {
    /// Listener loop: initial evaluation plus one evaluation per session event.
    async fn run(self: Arc<Self>, initial: u64, mut events: SessionEvents) {
        let mut tasks = JoinSet::new();
        tasks.spawn(Arc::clone(&self).evaluate_current(initial));

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.on_event(event, &mut tasks),
                    None => break,
                },
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Provider went away; let in-flight evaluations settle.
        while tasks.join_next().await.is_some() {}
    }

    fn on_event(self: &Arc<Self>, event: SessionEvent, tasks: &mut JoinSet<()>) {
        match event {
            SessionEvent {
                kind: SessionEventKind::SignedOut,
                ..
            }
            | SessionEvent { session: None, .. } => self.deny_signed_out(),
            SessionEvent {
                kind,
                session: Some(session),
            } => {
                let token = self.begin_cycle();
                debug!(generation = token, ?kind, user_id = %session.user_id, "re-checking admin access");
                let core = Arc::clone(self);
                tasks.spawn(async move { core.authorize(token, session).await });
            }
        }
    }

    /// Open a new cycle. The decision is pending until this token commits.
    fn begin_cycle(&self) -> u64 {
        let mut token = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.decision = GuardDecision::Pending;
            token = s.generation;
        });
        token
    }

    fn is_current(&self, token: u64) -> bool {
        self.mounted.load(Ordering::SeqCst) && self.state.borrow().generation == token
    }

    /// Store `decision` if `token` is still the latest cycle of a mounted guard.
    fn commit(&self, token: u64, decision: GuardDecision) -> bool {
        let mounted = &self.mounted;
        self.state.send_if_modified(|s| {
            if !mounted.load(Ordering::SeqCst) || s.generation != token {
                return false;
            }
            s.decision = decision;
            true
        })
    }

    async fn evaluate_current(self: Arc<Self>, token: u64) {
        let session = match self.identity.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return self.deny(token, DomainError::SessionAbsent),
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                return self.deny(token, DomainError::SessionAbsent);
            }
        };
        self.authorize(token, session).await;
    }

    async fn authorize(&self, token: u64, session: Session) {
        match self.check_admin(&session.user_id).await {
            Ok(()) => {
                if self.commit(token, GuardDecision::Granted) {
                    info!(generation = token, user_id = %session.user_id, "admin access granted");
                } else {
                    debug!(generation = token, "stale grant dropped");
                }
            }
            Err(reason) => {
                if !self.is_current(token) {
                    debug!(generation = token, "stale denial dropped");
                    return;
                }
                // Targets the evaluated session only; a newer sign-in survives.
                match self.identity.sign_out_session(&session).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(generation = token, "session replaced during denial, sign-out skipped")
                    }
                    Err(e) => warn!(error = %e, "sign-out after denial failed"),
                }
                self.deny(token, reason);
            }
        }
    }

    /// `Ok` only for a confirmed `is_admin = true`. Errors fold into denial after retries.
    async fn check_admin(&self, user_id: &UserId) -> Result<(), DomainError> {
        let mut attempt = 0;
        loop {
            let lookup = self.authorization.fetch_authorization_record(user_id);
            let result = match self.settings.authz_timeout {
                Some(limit) => tokio::time::timeout(limit, lookup)
                    .await
                    .unwrap_or_else(|_| Err(DomainError::DataStore("admin lookup timed out".into()))),
                None => lookup.await,
            };
            match result {
                Ok(Some(record)) if record.is_admin => return Ok(()),
                Ok(_) => return Err(DomainError::AuthorizationDenied),
                Err(e) if attempt < self.settings.authz_retries => {
                    attempt += 1;
                    warn!(user_id = %user_id, attempt, error = %e, "admin lookup failed, retrying");
                    tokio::time::sleep(self.settings.authz_retry_delay).await;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "admin lookup failed, failing closed");
                    return Err(DomainError::AuthorizationDenied);
                }
            }
        }
    }

    fn deny(&self, token: u64, reason: DomainError) {
        if self.commit(token, GuardDecision::Denied) {
            warn!(generation = token, reason = %reason, "admin access denied");
            self.navigator.redirect(&self.settings.login_path);
        } else {
            debug!(generation = token, "stale denial dropped");
        }
    }

    /// Sign-out needs no lookup. Already denied means the redirect was issued.
    fn deny_signed_out(&self) {
        let mounted = &self.mounted;
        let mut token = None;
        self.state.send_if_modified(|s| {
            if !mounted.load(Ordering::SeqCst) || s.decision == GuardDecision::Denied {
                return false;
            }
            s.generation += 1;
            s.decision = GuardDecision::Denied;
            token = Some(s.generation);
            true
        });
        if let Some(token) = token {
            warn!(generation = token, reason = %DomainError::SessionAbsent, "admin access denied");
            self.navigator.redirect(&self.settings.login_path);
        }
    }

    fn teardown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.state.send_modify(|s| s.generation += 1);
    }
}

/// A mounted protected subtree. Dropping it unmounts.
pub struct MountedGuard {
    core: Arc<GuardCore>,
    rx: watch::Receiver<GuardState>,
    listener: Option<JoinHandle<()>>,
}

impl MountedGuard {
    pub fn decision(&self) -> GuardDecision {
        self.rx.borrow().decision
    }

    pub fn state(&self) -> GuardState {
        *self.rx.borrow()
    }

    pub fn render(&self) -> RenderState {
        self.decision().into()
    }

    /// Receiver for guard state changes (e.g. to re-render).
    pub fn changes(&self) -> watch::Receiver<GuardState> {
        self.rx.clone()
    }

    /// Wait for the current cycle to reach a terminal decision.
    pub async fn settled(&mut self) -> GuardDecision {
        self.wait_for(|s| s.decision.is_terminal()).await.decision
    }

    /// Wait until `predicate` holds for the guard state.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&GuardState) -> bool) -> GuardState {
        let waited = self.rx.wait_for(predicate).await.map(|state| *state);
        match waited {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    pub fn unmount(self) {}
}

impl Drop for MountedGuard {
    fn drop(&mut self) {
        self.core.teardown();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        debug!("guard unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::browser::BrowserLocation;
    use crate::adapters::memory::{InMemoryIdentity, InMemoryStore};

    struct Fixture {
        identity: Arc<InMemoryIdentity>,
        store: Arc<InMemoryStore>,
        location: Arc<BrowserLocation>,
        guard: SessionGuard,
    }

    fn fixture(settings: GuardSettings) -> Fixture {
        let identity = Arc::new(InMemoryIdentity::new());
        let store = Arc::new(InMemoryStore::new());
        let location = Arc::new(BrowserLocation::new("/admin"));
        let guard = SessionGuard::new(
            Arc::clone(&identity) as Arc<dyn IdentityPort>,
            Arc::clone(&store) as Arc<dyn AuthorizationPort>,
            Arc::clone(&location) as Arc<dyn NavigatorPort>,
            settings,
        );
        Fixture {
            identity,
            store,
            location,
            guard,
        }
    }

    async fn pause() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn no_session_denies_and_redirects_once() {
        let f = fixture(GuardSettings::default());
        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Denied);
        assert_eq!(g.render(), RenderState::RedirectingToLogin);
        pause().await;
        assert_eq!(f.location.redirects(), vec!["/admin/login"]);
        assert_eq!(f.location.history_len(), 1);
    }

    #[tokio::test]
    async fn non_admin_is_signed_out_and_denied() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", false);

        let mut g = f.guard.mount("/admin/projects");
        assert_eq!(g.settled().await, GuardDecision::Denied);
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Denied);
        assert_eq!(f.identity.sign_out_count(), 1);
        assert_eq!(f.location.redirects().len(), 1);
    }

    #[tokio::test]
    async fn missing_profile_row_is_denied() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("ghost")));
        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Denied);
        pause().await;
        assert_eq!(f.identity.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn admin_is_granted() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Granted);
        assert_eq!(g.render(), RenderState::Protected);
        assert_eq!(f.identity.sign_out_count(), 0);
        assert!(f.location.redirects().is_empty());
    }

    #[tokio::test]
    async fn login_path_bypasses_without_session() {
        let f = fixture(GuardSettings::default());
        let g = f.guard.mount("/admin/login");
        assert_eq!(g.decision(), GuardDecision::Granted);
        pause().await;
        assert!(f.location.redirects().is_empty());
        assert_eq!(f.identity.subscriber_count(), 0);
        assert_eq!(f.store.authorization_fetches(), 0);
    }

    #[tokio::test]
    async fn lookup_error_fails_closed() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);
        f.store.fail_authorization(1);

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Denied);
        pause().await;
        assert_eq!(f.identity.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn bounded_retry_recovers_transient_failure() {
        let mut settings = GuardSettings::default();
        settings.authz_retries = 2;
        settings.authz_retry_delay = Duration::from_millis(1);
        let f = fixture(settings);
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);
        f.store.fail_authorization(2);

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Granted);
        assert_eq!(f.store.authorization_fetches(), 3);
    }

    #[tokio::test]
    async fn hanging_lookup_stays_pending_without_timeout() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);
        let _gate = f.store.hold_authorization("u1");

        let g = f.guard.mount("/admin");
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Pending);
        assert_eq!(g.render(), RenderState::CheckingAuthentication);
        assert!(f.location.redirects().is_empty());
    }

    #[tokio::test]
    async fn hanging_lookup_times_out_closed() {
        let mut settings = GuardSettings::default();
        settings.authz_timeout = Some(Duration::from_millis(10));
        let f = fixture(settings);
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);
        let _gate = f.store.hold_authorization("u1");

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Denied);
    }

    #[tokio::test]
    async fn sign_out_then_sign_in_ends_granted() {
        let f = fixture(GuardSettings::default());
        let session = f.identity.make_session("u1");
        f.identity.set_session(Some(session.clone()));
        f.store.set_admin("u1", true);

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Granted);
        let before = g.state().generation;

        f.identity.emit(SessionEvent::signed_out());
        f.identity.emit(SessionEvent::signed_in(session));

        let end = g
            .wait_for(|s| s.generation >= before + 2 && s.decision.is_terminal())
            .await;
        assert_eq!(end.decision, GuardDecision::Granted);
    }

    #[tokio::test]
    async fn slow_earlier_evaluation_cannot_overwrite_newer_denial() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);
        let gate = f.store.hold_authorization("u1");

        let mut g = f.guard.mount("/admin");
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Pending);

        f.identity.emit(SessionEvent::signed_out());
        assert_eq!(g.settled().await, GuardDecision::Denied);

        gate.notify_one();
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Denied);
        assert_eq!(f.location.redirects().len(), 1);
    }

    #[tokio::test]
    async fn stale_non_admin_evaluation_does_not_sign_out_newer_admin() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("intruder")));
        f.store.set_admin("intruder", false);
        f.store.set_admin("admin", true);
        let gate = f.store.hold_authorization("intruder");

        let mut g = f.guard.mount("/admin");
        pause().await;

        let admin = f.identity.make_session("admin");
        f.identity.emit(SessionEvent::signed_in(admin));
        assert_eq!(
            g.wait_for(|s| s.generation >= 2 && s.decision.is_terminal())
                .await
                .decision,
            GuardDecision::Granted
        );

        gate.notify_one();
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Granted);
        assert_eq!(f.identity.sign_out_count(), 0);
        assert!(f.location.redirects().is_empty());
    }

    #[tokio::test]
    async fn slow_denial_sign_out_spares_a_newer_admin_session() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("intruder")));
        f.store.set_admin("intruder", false);
        f.store.set_admin("admin", true);
        let gate = f.identity.hold_sign_out();

        let mut g = f.guard.mount("/admin");
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Pending);

        let admin = f.identity.make_session("admin");
        f.identity.emit(SessionEvent::signed_in(admin.clone()));
        assert_eq!(
            g.wait_for(|s| s.generation >= 2 && s.decision.is_terminal())
                .await
                .decision,
            GuardDecision::Granted
        );

        gate.notify_one();
        pause().await;
        assert_eq!(g.decision(), GuardDecision::Granted);
        assert_eq!(f.identity.current_session().await.unwrap(), Some(admin));
        assert_eq!(f.identity.sign_out_count(), 0);
        assert!(f.location.redirects().is_empty());
    }

    #[tokio::test]
    async fn token_refresh_rechecks_admin_attribute() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", true);

        let mut g = f.guard.mount("/admin");
        assert_eq!(g.settled().await, GuardDecision::Granted);
        let fetches = f.store.authorization_fetches();

        f.store.set_admin("u1", false);
        let refreshed = f.identity.make_session("u1");
        f.identity.emit(SessionEvent::token_refreshed(refreshed));

        let end = g
            .wait_for(|s| s.generation >= 2 && s.decision.is_terminal())
            .await;
        assert_eq!(end.decision, GuardDecision::Denied);
        assert_eq!(f.store.authorization_fetches(), fetches + 1);
        pause().await;
        assert_eq!(f.identity.sign_out_count(), 1);
        assert_eq!(f.location.redirects().len(), 1);
    }

    #[tokio::test]
    async fn unmount_releases_subscription_and_ignores_in_flight_result() {
        let f = fixture(GuardSettings::default());
        f.identity.set_session(Some(f.identity.make_session("u1")));
        f.store.set_admin("u1", false);
        let gate = f.store.hold_authorization("u1");

        let g = f.guard.mount("/admin");
        let changes = g.changes();
        pause().await;
        assert_eq!(f.identity.subscriber_count(), 1);

        g.unmount();
        gate.notify_one();
        pause().await;

        assert_eq!(changes.borrow().decision, GuardDecision::Pending);
        assert_eq!(f.identity.subscriber_count(), 0);
        assert_eq!(f.identity.sign_out_count(), 0);
        assert!(f.location.redirects().is_empty());
    }
}
