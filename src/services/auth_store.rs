use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::session::{Identity, PersistedSession, Session, SessionSnapshot};
use crate::repository::SessionPersistence;

/// The single authentication session of the client.
///
/// Cloning is cheap and every clone observes the same session. Reads are
/// synchronous so the request interceptor can attach the token without
/// awaiting; mutations persist through the injected [`SessionPersistence`]
/// and notify subscribers. Persistence failures are logged and never
/// surfaced to callers.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    state: RwLock<AuthState>,
    persistence: Arc<dyn SessionPersistence>,
    changes: watch::Sender<SessionSnapshot>,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    hydrated: bool,
    active_sessions: u32,
}

impl AuthState {
    fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let live = self.session.as_ref().filter(|s| !s.is_expired_at(now));
        SessionSnapshot {
            hydrated: self.hydrated,
            token: live.map(|s| s.token.clone()),
            user: live.map(|s| s.user.clone()),
            is_logged_in: live.is_some(),
            active_sessions: self.active_sessions,
        }
    }

    fn persisted(&self) -> PersistedSession {
        match &self.session {
            Some(session) => PersistedSession {
                token: Some(session.token.clone()),
                username: Some(session.user.username.clone()),
                user_id: session.user.user_id,
                expires_at: Some(session.expires_at),
                active_sessions: self.active_sessions,
            },
            None => PersistedSession {
                active_sessions: self.active_sessions,
                ..Default::default()
            },
        }
    }
}

impl AuthStore {
    pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
        let (changes, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(AuthInner {
                state: RwLock::new(AuthState::default()),
                persistence,
                changes,
            }),
        }
    }

    /// Restore the persisted session. A persisted token is re-validated, so an
    /// expired or corrupt record comes back as "no session".
    pub async fn hydrate(&self) {
        let now = Utc::now();
        let persisted = match self.inner.persistence.load().await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session");
                PersistedSession::default()
            }
        };

        let restored = persisted
            .token
            .as_deref()
            .map(|token| Session::from_token(token, now));

        let discard_stale = {
            let mut state = self.inner.state.write();
            state.active_sessions = persisted.active_sessions;
            state.hydrated = true;
            match restored {
                Some(Ok(session)) => {
                    info!(username = %session.user.username, "Restored session");
                    state.session = Some(session);
                    false
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Discarding persisted session");
                    state.session = None;
                    true
                }
                None => {
                    state.session = None;
                    false
                }
            }
        };

        if discard_stale {
            self.persist_clear().await;
        }
        self.notify();
    }

    /// Install a bearer token. `None`, an undecodable token or an expired token
    /// all leave the store without a session. Returns whether a session is now active.
    pub async fn set_token(&self, token: Option<&str>) -> bool {
        self.set_token_at(token, Utc::now()).await
    }

    pub async fn set_token_at(&self, token: Option<&str>, now: DateTime<Utc>) -> bool {
        let Some(token) = token else {
            self.clear("no token").await;
            return false;
        };

        match Session::from_token(token, now) {
            Ok(session) => {
                info!(
                    username = %session.user.username,
                    token = %session.token_hint(),
                    expires_at = %session.expires_at,
                    "Token accepted"
                );
                let record = {
                    let mut state = self.inner.state.write();
                    state.session = Some(session);
                    state.persisted()
                };
                self.persist(&record).await;
                self.notify();
                true
            }
            Err(e) => {
                warn!(error = %e, "Token rejected");
                self.clear("rejected token").await;
                false
            }
        }
    }

    /// Returns whether there was a session to clear.
    pub async fn logout(&self) -> bool {
        self.clear("logout").await
    }

    pub async fn clear_token(&self) -> bool {
        self.clear("clear token").await
    }

    /// Clear the session if its expiry has passed.
    pub async fn expire_if_stale(&self) -> bool {
        let stale = self
            .inner
            .state
            .read()
            .session
            .as_ref()
            .is_some_and(|s| s.is_expired_at(Utc::now()));

        if stale {
            self.clear("expired").await
        } else {
            false
        }
    }

    async fn clear(&self, reason: &str) -> bool {
        let removed = self.inner.state.write().session.take();

        match removed {
            Some(session) => {
                info!(username = %session.user.username, reason, "Session cleared");
                self.persist_clear().await;
                self.notify();
                true
            }
            None => {
                debug!(reason, "No session to clear");
                false
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token
    }

    pub fn user(&self) -> Option<Identity> {
        self.snapshot().user
    }

    pub fn is_logged_in(&self) -> bool {
        self.snapshot().is_logged_in
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.state.read().hydrated
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().snapshot(Utc::now())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.changes.subscribe()
    }

    pub fn active_sessions(&self) -> u32 {
        self.inner.state.read().active_sessions
    }

    /// Count one more finished pomodoro focus session.
    pub async fn record_pomodoro_session(&self) -> u32 {
        let (count, record) = {
            let mut state = self.inner.state.write();
            state.active_sessions = state.active_sessions.saturating_add(1);
            (state.active_sessions, state.persisted())
        };
        self.persist(&record).await;
        self.notify();
        count
    }

    async fn persist(&self, record: &PersistedSession) {
        if let Err(e) = self.inner.persistence.save(record).await {
            warn!(error = %e, "Failed to persist session");
        }
    }

    async fn persist_clear(&self) {
        if let Err(e) = self.inner.persistence.clear().await {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    fn notify(&self) {
        self.inner.changes.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::session_repository::MockSessionPersistence;
    use crate::test_helpers::mint_token;
    use chrono::Duration;
    use rstest::rstest;

    fn permissive_persistence() -> MockSessionPersistence {
        let mut mock = MockSessionPersistence::new();
        mock.expect_load().returning(|| Ok(None));
        mock.expect_save().returning(|_| Ok(()));
        mock.expect_clear().returning(|| Ok(()));
        mock
    }

    fn store_with(mock: MockSessionPersistence) -> AuthStore {
        AuthStore::new(Arc::new(mock))
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3600)]
    #[case(86_400 * 365)]
    #[tokio::test]
    async fn test_expired_tokens_leave_no_session(#[case] seconds_ago: i64) {
        let store = store_with(permissive_persistence());
        let now = Utc::now();
        let token = mint_token("asha", Some(1), now - Duration::seconds(seconds_ago));

        assert!(!store.set_token_at(Some(&token), now).await);
        assert!(!store.is_logged_in());
        assert!(store.token().is_none());
        assert!(store.user().is_none());
    }

    #[rstest]
    #[case("")]
    #[case("garbage")]
    #[case("a.b")]
    #[case("a.!!!.c")]
    #[case("eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.sig")]
    #[tokio::test]
    async fn test_undecodable_tokens_clear_session(#[case] token: &str) {
        let store = store_with(permissive_persistence());
        let valid = mint_token("asha", Some(1), Utc::now() + Duration::hours(1));
        assert!(store.set_token(Some(&valid)).await);

        assert!(!store.set_token(Some(token)).await);
        assert!(!store.is_logged_in());
        assert!(store.token().is_none());
    }

    #[tokio::test]
    async fn test_valid_token_sets_identity_and_persists() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_save()
            .withf(|record| {
                record.username.as_deref() == Some("asha") && record.user_id == Some(42)
            })
            .times(1)
            .returning(|_| Ok(()));
        let store = store_with(mock);

        let token = mint_token("asha", Some(42), Utc::now() + Duration::hours(1));
        assert!(store.set_token(Some(&token)).await);

        assert!(store.is_logged_in());
        assert_eq!(store.token().as_deref(), Some(token.as_str()));
        let user = store.user().unwrap();
        assert_eq!(user.username, "asha");
        assert_eq!(user.user_id, Some(42));
    }

    #[tokio::test]
    async fn test_none_token_clears() {
        let store = store_with(permissive_persistence());
        let token = mint_token("asha", None, Utc::now() + Duration::hours(1));
        store.set_token(Some(&token)).await;

        assert!(!store.set_token(None).await);
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_save().returning(|_| Ok(()));
        mock.expect_clear().times(1).returning(|| Ok(()));
        let store = store_with(mock);

        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(1));
        store.set_token(Some(&token)).await;

        assert!(store.logout().await);
        assert!(!store.logout().await);
        assert!(!store.clear_token().await);
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_persistence_failures_are_swallowed() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_save().returning(|_| Err(anyhow::anyhow!("disk full")));
        mock.expect_clear().returning(|| Err(anyhow::anyhow!("disk full")));
        let store = store_with(mock);

        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(1));
        assert!(store.set_token(Some(&token)).await);
        assert!(store.logout().await);
    }

    #[tokio::test]
    async fn test_hydrate_restores_valid_session() {
        let token = mint_token("asha", Some(3), Utc::now() + Duration::hours(1));
        let persisted = PersistedSession {
            token: Some(token.clone()),
            username: Some("asha".into()),
            user_id: Some(3),
            expires_at: None,
            active_sessions: 4,
        };

        let mut mock = MockSessionPersistence::new();
        mock.expect_load().times(1).returning(move || Ok(Some(persisted.clone())));
        mock.expect_clear().never();
        let store = store_with(mock);

        assert!(!store.is_hydrated());
        store.hydrate().await;

        assert!(store.is_hydrated());
        assert!(store.is_logged_in());
        assert_eq!(store.token(), Some(token));
        assert_eq!(store.active_sessions(), 4);
    }

    #[tokio::test]
    async fn test_hydrate_discards_expired_session() {
        let token = mint_token("asha", Some(3), Utc::now() - Duration::minutes(1));
        let persisted = PersistedSession {
            token: Some(token),
            ..Default::default()
        };

        let mut mock = MockSessionPersistence::new();
        mock.expect_load().returning(move || Ok(Some(persisted.clone())));
        mock.expect_clear().times(1).returning(|| Ok(()));
        let store = store_with(mock);

        store.hydrate().await;
        assert!(store.is_hydrated());
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_hydrate_survives_load_failure() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_load().returning(|| Err(anyhow::anyhow!("corrupt database")));
        let store = store_with(mock);

        store.hydrate().await;
        assert!(store.is_hydrated());
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let store = store_with(permissive_persistence());
        let mut rx = store.subscribe();
        assert!(!rx.borrow().is_logged_in);

        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(1));
        store.set_token(Some(&token)).await;
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_logged_in);

        store.logout().await;
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_logged_in);
    }

    #[tokio::test]
    async fn test_pomodoro_counter_persists() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_save()
            .withf(|record| record.active_sessions == 1 && record.token.is_none())
            .times(1)
            .returning(|_| Ok(()));
        let store = store_with(mock);

        assert_eq!(store.record_pomodoro_session().await, 1);
        assert_eq!(store.active_sessions(), 1);
        assert_eq!(store.snapshot().active_sessions, 1);
    }
}
