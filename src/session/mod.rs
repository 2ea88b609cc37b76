//! Session/identity provider.
//!
//! Tracks who is signed in and purges every user-scoped collection of the
//! [`SyncStore`] whenever that changes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::MovieBackend;
use crate::errors::ClientError;
use crate::models::User;
use crate::sync::SyncStore;

/// Identity as far as the client knows it.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The initial current-user check has not completed.
    Unknown,
    Authenticated(User),
    Anonymous,
}

pub struct SessionProvider<B> {
    store: Arc<SyncStore<B>>,
    state: Mutex<SessionState>,
}

impl<B: MovieBackend> SessionProvider<B> {
    pub fn new(store: Arc<SyncStore<B>>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState::Unknown),
        }
    }

    pub fn store(&self) -> &Arc<SyncStore<B>> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn user(&self) -> Option<User> {
        match &*self.state.lock() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Unknown)
    }

    /// Resolve the current user from the backend.
    ///
    /// A missing session and a failed check both end in `Anonymous`. If the
    /// identity changes while the check is in flight, its answer is dropped.
    pub async fn refresh(&self) -> SessionState {
        let epoch = self.store.identity_epoch();
        let result = self.store.current_user().await;

        let mut state = self.state.lock();
        if self.store.identity_epoch() != epoch {
            tracing::debug!("Identity changed during current-user check, keeping {:?}", *state);
            return state.clone();
        }
        *state = match result {
            Ok(Some(user)) => SessionState::Authenticated(user),
            Ok(None) => SessionState::Anonymous,
            Err(err) => {
                tracing::warn!("Current-user check failed: {}", err);
                SessionState::Anonymous
            }
        };
        state.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let response = self.store.backend().login(username, password).await?;
        tracing::info!("Signed in as {}", response.user.username);
        self.become_user(response.user.clone());
        Ok(response.user)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let response = self.store.backend().register(username, email, password).await?;
        tracing::info!("Registered {}", response.user.username);
        self.become_user(response.user.clone());
        Ok(response.user)
    }

    /// Sign out. A failed request leaves the session untouched.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.backend().logout().await?;
        self.store.purge_user_scope();
        self.store.clear_user();
        *self.state.lock() = SessionState::Anonymous;
        tracing::info!("Signed out");
        Ok(())
    }

    fn become_user(&self, user: User) {
        self.store.purge_user_scope();
        self.store.set_signed_in(user.clone());
        *self.state.lock() = SessionState::Authenticated(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{CacheStatus, Collection, RATING_DEPENDENTS};
    use crate::testing::{user, FakeBackend, PASSWORD};

    fn provider(backend: &Arc<FakeBackend>) -> SessionProvider<FakeBackend> {
        SessionProvider::new(Arc::new(SyncStore::new(backend.clone())))
    }

    #[tokio::test]
    async fn test_starts_unknown_then_resolves() {
        let backend = FakeBackend::with_catalog(5);
        let session = provider(&backend);
        assert!(session.is_loading());

        assert_eq!(session.refresh().await, SessionState::Anonymous);
        assert!(!session.is_loading());

        backend.sign_in_as(user(1, "alice"));
        session.store().invalidate(Collection::User);
        assert_eq!(
            session.refresh().await,
            SessionState::Authenticated(user(1, "alice"))
        );
    }

    #[tokio::test]
    async fn test_failed_check_is_anonymous() {
        let backend = FakeBackend::with_catalog(5);
        backend.fail_current_user(true);
        let session = provider(&backend);

        assert_eq!(session.refresh().await, SessionState::Anonymous);
        assert_eq!(session.user(), None);
    }

    #[tokio::test]
    async fn test_login_purges_previous_user_data() {
        let backend = FakeBackend::with_catalog(30);
        backend.sign_in_as(user(1, "alice"));
        backend.seed_rating(4, 5);
        let session = provider(&backend);
        session.refresh().await;

        let store = session.store();
        store.rating_history().await.unwrap();
        store.user_stats().await.unwrap();
        store.recommendations().await.unwrap();
        store.apply_rating(8, 2).await.unwrap();

        let signed_in = session.login("bob", PASSWORD).await.unwrap();
        assert_eq!(signed_in.username, "bob");
        assert_eq!(session.user().map(|u| u.username), Some("bob".to_string()));

        for collection in RATING_DEPENDENTS {
            assert_eq!(store.status(collection), CacheStatus::Empty);
        }
        assert_eq!(store.status(Collection::MovieDetails), CacheStatus::Empty);
        assert_eq!(store.local_rating(8), None);
        assert_eq!(store.status(Collection::User), CacheStatus::Stale);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_state() {
        let backend = FakeBackend::with_catalog(5);
        let session = provider(&backend);
        session.refresh().await;
        let epoch = session.store().identity_epoch();

        let err = session.login("alice", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.store().identity_epoch(), epoch);
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let backend = FakeBackend::with_catalog(5);
        let session = provider(&backend);

        let created = session
            .register("carol", "carol@example.com", "longenough")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Authenticated(created));
        assert_eq!(session.store().identity_epoch(), 1);

        assert!(session.register("dave", "dave@example.com", "short").await.is_err());
    }

    #[tokio::test]
    async fn test_logout_forces_history_refetch() {
        let backend = FakeBackend::with_catalog(30);
        backend.sign_in_as(user(1, "alice"));
        for id in 1..=10 {
            backend.seed_rating(id, 4);
        }
        let session = provider(&backend);
        session.refresh().await;

        assert_eq!(session.store().rating_history().await.unwrap().len(), 10);
        assert_eq!(backend.calls("rating_history"), 1);

        session.logout().await.unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(
            session.store().status(Collection::RatingHistory),
            CacheStatus::Empty
        );

        // Anonymous now, so the refetch is rejected, but it does reach the backend.
        assert!(session.store().rating_history().await.is_err());
        assert_eq!(backend.calls("rating_history"), 2);
    }

    #[tokio::test]
    async fn test_logout_while_anonymous_still_purges() {
        let backend = FakeBackend::with_catalog(5);
        let session = provider(&backend);
        session.refresh().await;

        session.logout().await.unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.store().identity_epoch(), 1);
        assert_eq!(backend.calls("logout"), 1);
    }
}
