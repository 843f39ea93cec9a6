//! Session manager: owns the in-memory session state, bridges it to the
//! durable token store, and coordinates refreshes so at most one is in
//! flight process-wide.
//!
//! The single-flight slot is leader/follower: the first caller to find the
//! slot empty installs a `Notify`, performs the refresh, publishes the
//! outcome, clears the slot, and wakes every waiter. Late arrivals attach to
//! the existing `Notify` instead of issuing a second refresh. The slot is
//! cleared unconditionally once the refresh settles.

use super::backend::AuthBackend;
use super::error::AuthError;
use super::state::SessionState;
use super::store::TokenStore;
use super::tokens::AuthTokens;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, instrument, warn};

/// One in-flight refresh. The leader settles `outcome` before the slot is
/// cleared, so every follower that captured this flight reads the outcome of
/// the call it actually waited on.
struct RefreshFlight {
    notify: Notify,
    outcome: Mutex<Option<Result<(), AuthError>>>,
}

impl RefreshFlight {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            outcome: Mutex::new(None),
        }
    }
}

pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: TokenStore,
    state: RwLock<SessionState>,
    refresh_slot: Mutex<Option<Arc<RefreshFlight>>>,
}

impl SessionManager {
    /// Creates a manager hydrated with whatever the store currently holds.
    /// No network traffic happens here; see [`Self::init_from_storage`].
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, store: TokenStore) -> Self {
        let state = SessionState {
            user: None,
            tokens: store.get(),
            loading: false,
        };

        Self {
            backend,
            store,
            state: RwLock::new(state),
            refresh_slot: Mutex::new(None),
        }
    }

    /// Clones the current state snapshot.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Single mutation entry point for the session state.
    async fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.write().await;
        apply(&mut state);
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn has_any_role(&self, required: &[&str]) -> bool {
        self.state.read().await.has_any_role(required)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .map(|tokens| tokens.refresh_token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Bridges durable storage into the live session at startup: refreshes an
    /// expired pair, then loads the profile. Any failure along the way clears
    /// the session back to anonymous. Safe to call more than once; concurrent
    /// calls share one refresh.
    #[instrument(skip(self))]
    pub async fn init_from_storage(&self) -> Result<(), AuthError> {
        let Some(tokens) = self.store.get() else {
            debug!("no stored tokens; starting anonymous");
            return Ok(());
        };

        self.update(|state| state.tokens = Some(tokens.clone())).await;

        if tokens.is_expired() {
            debug!("stored access token expired; attempting refresh");
            if let Err(err) = self.refresh_access_token().await {
                warn!("startup refresh failed: {err}");
                self.logout().await;
                return Err(err);
            }
        }

        let access = self.access_token().await.unwrap_or_default();
        match self.backend.me(&access).await {
            Ok(user) => {
                self.update(|state| state.user = Some(user)).await;
                Ok(())
            }
            Err(err) => {
                // Fail closed: a session whose profile cannot be loaded is
                // not worth keeping, even right after a successful refresh.
                warn!("profile fetch failed: {err}");
                self.logout().await;
                Err(err)
            }
        }
    }

    /// Exchanges credentials for a token pair and the signed-in profile.
    /// On failure nothing is committed beyond resetting the loading flag.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.update(|state| state.loading = true).await;

        match self.backend.login(email, password).await {
            Ok(response) => {
                let tokens = AuthTokens::new(
                    response.access_token,
                    response.refresh_token,
                    response.expires_in_sec,
                );
                if let Err(err) = self.store.set(&tokens) {
                    warn!("failed to persist tokens: {err}");
                }

                let user = response.user;
                self.update(move |state| {
                    state.user = Some(user);
                    state.tokens = Some(tokens);
                    state.loading = false;
                })
                .await;

                info!("login succeeded; session entering admin area");
                Ok(())
            }
            Err(err) => {
                self.update(|state| state.loading = false).await;
                Err(err)
            }
        }
    }

    /// Drops the durable pair and resets the session to anonymous. Callable
    /// from any state.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.store.clear();
        self.update(|state| *state = SessionState::default()).await;
        info!("session cleared; returning to login");
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Concurrent callers are collapsed into one backend call: whoever finds
    /// the slot empty leads, everyone else waits on the same settlement and
    /// observes the same outcome.
    pub async fn refresh_access_token(&self) -> Result<(), AuthError> {
        let flight = {
            let mut slot = self.refresh_slot.lock().await;
            if let Some(in_flight) = slot.as_ref() {
                let in_flight = in_flight.clone();
                drop(slot);
                return self.join_refresh(in_flight).await;
            }

            let flight = Arc::new(RefreshFlight::new());
            *slot = Some(flight.clone());
            flight
        };

        let result = self.perform_refresh().await;

        // Settle the outcome before clearing the slot, then wake everyone.
        *flight.outcome.lock().await = Some(result.clone());
        *self.refresh_slot.lock().await = None;
        flight.notify.notify_waiters();

        result
    }

    /// Follower side of the single flight: wait for the leader to settle,
    /// then surface its outcome.
    async fn join_refresh(&self, flight: Arc<RefreshFlight>) -> Result<(), AuthError> {
        let notified = flight.notify.notified();
        tokio::pin!(notified);
        // Register interest before re-checking the slot so a settlement
        // between the check and the await cannot be missed.
        notified.as_mut().enable();

        let still_in_flight = self
            .refresh_slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &flight));

        if still_in_flight {
            notified.await;
        }

        match flight.outcome.lock().await.clone() {
            Some(result) => result,
            // The leader settles before clearing the slot, so an empty
            // outcome here cannot happen; fail conservatively if it does.
            None => Err(AuthError::Transport(
                "refresh settled without an outcome".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn perform_refresh(&self) -> Result<(), AuthError> {
        let current = self
            .state
            .read()
            .await
            .tokens
            .clone()
            .filter(|tokens| !tokens.refresh_token.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self.backend.refresh(&current.refresh_token).await?;

        let next = current.with_access(response.access_token, response.expires_in_sec);
        if let Err(err) = self.store.set(&next) {
            warn!("failed to persist refreshed tokens: {err}");
        }
        self.update(move |state| state.tokens = Some(next)).await;

        debug!("access token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::backend::{LoginResponse, RefreshResponse, UserProfile};
    use crate::auth::tokens::now_ms;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedBackend {
        login_ok: bool,
        refresh_ok: bool,
        me_ok: bool,
        refresh_delay: Duration,
        refresh_calls: AtomicUsize,
    }

    impl Default for ScriptedBackend {
        fn default() -> Self {
            Self {
                login_ok: true,
                refresh_ok: true,
                me_ok: true,
                refresh_delay: Duration::from_millis(50),
                refresh_calls: AtomicUsize::new(0),
            }
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: "u_1".into(),
            email: "admin@panpan.dev".into(),
            name: "Panpan Admin".into(),
            roles: vec!["admin".into()],
        }
    }

    #[async_trait]
    impl AuthBackend for ScriptedBackend {
        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse, AuthError> {
            if !self.login_ok {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(LoginResponse {
                access_token: "access_initial".into(),
                refresh_token: "refresh_initial".into(),
                expires_in_sec: 10,
                user: profile(),
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<RefreshResponse, AuthError> {
            tokio::time::sleep(self.refresh_delay).await;
            let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if !self.refresh_ok {
                return Err(AuthError::RefreshInvalid);
            }
            Ok(RefreshResponse {
                access_token: format!("access_refreshed_{call}"),
                expires_in_sec: 10,
            })
        }

        async fn me(&self, _access_token: &str) -> Result<UserProfile, AuthError> {
            if !self.me_ok {
                return Err(AuthError::Backend {
                    status: 401,
                    code: "ACCESS_INVALID".into(),
                });
            }
            Ok(profile())
        }
    }

    fn manager(backend: ScriptedBackend, dir: &tempfile::TempDir) -> Arc<SessionManager> {
        let store = TokenStore::new(dir.path().join("tokens.json"));
        Arc::new(SessionManager::new(Arc::new(backend), store))
    }

    fn expired_tokens() -> AuthTokens {
        AuthTokens {
            access_token: "access_stale".into(),
            refresh_token: "refresh_initial".into(),
            expires_at: now_ms().saturating_sub(1_000),
        }
    }

    #[tokio::test]
    async fn test_login_commits_tokens_and_profile() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(ScriptedBackend::default(), &dir);

        manager.login("admin@panpan.dev", "1234").await.unwrap();

        let state = manager.snapshot().await;
        assert!(!state.loading);
        assert!(state.is_authenticated());
        assert_eq!(state.user.unwrap().email, "admin@panpan.dev");

        let stored = TokenStore::new(dir.path().join("tokens.json")).get().unwrap();
        assert_eq!(stored.access_token, "access_initial");
    }

    #[tokio::test]
    async fn test_failed_login_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(
            ScriptedBackend {
                login_ok: false,
                ..ScriptedBackend::default()
            },
            &dir,
        );

        let err = manager.login("admin@panpan.dev", "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);

        let state = manager.snapshot().await;
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert!(state.tokens.is_none());
        assert!(TokenStore::new(dir.path().join("tokens.json")).get().is_none());
    }

    #[tokio::test]
    async fn test_logout_is_callable_from_any_state() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(ScriptedBackend::default(), &dir);

        manager.logout().await;
        assert!(!manager.is_authenticated().await);

        manager.login("admin@panpan.dev", "1234").await.unwrap();
        manager.logout().await;

        let state = manager.snapshot().await;
        assert!(state.user.is_none());
        assert!(state.tokens.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_tokens_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(ScriptedBackend::default(), &dir);

        let err = manager.refresh_access_token().await.unwrap_err();
        assert_eq!(err, AuthError::NoRefreshToken);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_collapse_to_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::default());
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let shared: Arc<dyn AuthBackend> = backend.clone();
        let manager = Arc::new(SessionManager::new(shared, store));
        manager.login("admin@panpan.dev", "1234").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.refresh_access_token().await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        let state = manager.snapshot().await;
        assert_eq!(state.tokens.unwrap().access_token, "access_refreshed_0");
    }

    #[tokio::test]
    async fn test_failed_refresh_reaches_every_waiter() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend {
            refresh_ok: false,
            ..ScriptedBackend::default()
        });
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let shared: Arc<dyn AuthBackend> = backend.clone();
        let manager = Arc::new(SessionManager::new(shared, store));
        manager.login("admin@panpan.dev", "1234").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.refresh_access_token().await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap_err(), AuthError::RefreshInvalid);
        }
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_slot_clears_after_settlement() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(
            ScriptedBackend {
                refresh_ok: false,
                ..ScriptedBackend::default()
            },
            &dir,
        );
        manager.login("admin@panpan.dev", "1234").await.unwrap();

        manager.refresh_access_token().await.unwrap_err();
        assert!(manager.refresh_slot.lock().await.is_none());

        // A later refresh starts a fresh flight rather than reusing a stale
        // outcome.
        manager.refresh_access_token().await.unwrap_err();
    }

    #[tokio::test]
    async fn test_init_from_storage_refreshes_expired_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.set(&expired_tokens()).unwrap();

        let manager = manager(ScriptedBackend::default(), &dir);
        manager.init_from_storage().await.unwrap();

        let state = manager.snapshot().await;
        assert!(state.is_authenticated());
        assert_eq!(state.user.unwrap().id, "u_1");
        assert_eq!(state.tokens.unwrap().access_token, "access_refreshed_0");
    }

    #[tokio::test]
    async fn test_init_from_storage_is_idempotent_under_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.set(&expired_tokens()).unwrap();

        let backend = ScriptedBackend::default();
        let manager = {
            let store = TokenStore::new(dir.path().join("tokens.json"));
            Arc::new(SessionManager::new(Arc::new(backend), store))
        };

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.init_from_storage().await })
        };
        let second = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.init_from_storage().await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        // Both initializations shared one refresh flight.
        let state = manager.snapshot().await;
        assert_eq!(state.tokens.unwrap().access_token, "access_refreshed_0");
    }

    #[tokio::test]
    async fn test_init_from_storage_logs_out_when_refresh_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.set(&expired_tokens()).unwrap();

        let manager = manager(
            ScriptedBackend {
                refresh_ok: false,
                ..ScriptedBackend::default()
            },
            &dir,
        );
        manager.init_from_storage().await.unwrap_err();

        assert!(!manager.is_authenticated().await);
        assert!(TokenStore::new(dir.path().join("tokens.json")).get().is_none());
    }

    #[tokio::test]
    async fn test_init_from_storage_logs_out_when_profile_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.set(&expired_tokens()).unwrap();

        let manager = manager(
            ScriptedBackend {
                me_ok: false,
                ..ScriptedBackend::default()
            },
            &dir,
        );
        manager.init_from_storage().await.unwrap_err();

        // The refresh succeeded, but the unusable session is still discarded.
        assert!(!manager.is_authenticated().await);
        assert!(TokenStore::new(dir.path().join("tokens.json")).get().is_none());
    }
}
