use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::credential::{Credential, Validity};
use crate::error::Result;
use crate::storage::{Store, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
    pub loading: bool,
}

impl SessionState {
    pub const LOADING: Self = Self {
        authenticated: false,
        loading: true,
    };

    pub fn resolved(authenticated: bool) -> Self {
        Self {
            authenticated,
            loading: false,
        }
    }
}

/// Owns the login state derived from the stored bearer token.
///
/// Starts in [`SessionState::LOADING`]. Call [`SessionManager::init`] to run
/// the first check and follow changes made by other store contexts, and
/// [`SessionManager::dispose`] to stop following them. Clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Store,
    state: Arc<watch::Sender<SessionState>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(store: Store) -> Self {
        let (state, _) = watch::channel(SessionState::LOADING);
        Self {
            inner: Arc::new(Inner {
                store,
                state: Arc::new(state),
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Runs [`SessionManager::initialize`] and starts following storage
    /// changes from other contexts. Must be called inside a tokio runtime.
    pub fn init(&self) -> SessionState {
        // Subscribe first so a write landing during the check is still seen.
        let mut events = self.inner.store.subscribe();
        let state = self.initialize();

        let store = self.inner.store.clone();
        let sender = Arc::clone(&self.inner.state);

        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let relevant = event
                    .key
                    .as_deref()
                    .is_none_or(|key| key == keys::AUTH_TOKEN);
                if relevant {
                    debug!(origin = event.origin, "credential changed in another context");
                    evaluate(&store, &sender, Utc::now());
                }
            }
        });

        if let Some(previous) = self.replace_watcher(Some(handle)) {
            previous.abort();
        }

        state
    }

    pub fn dispose(&self) {
        if let Some(handle) = self.replace_watcher(None) {
            handle.abort();
        }
    }

    /// Re-derives the state from the stored token. Missing, expired and
    /// undecodable tokens all clear storage and leave the session signed out.
    pub fn initialize(&self) -> SessionState {
        self.initialize_at(Utc::now())
    }

    pub fn initialize_at(&self, now: DateTime<Utc>) -> SessionState {
        evaluate(&self.inner.store, &self.inner.state, now)
    }

    pub fn login(&self, token: &str) -> Result<()> {
        self.inner.store.set(keys::AUTH_TOKEN, token)?;
        self.inner.state.send_replace(SessionState::resolved(true));
        info!("session started");
        Ok(())
    }

    /// Local sign-out. The state flips even if the store cannot be written.
    pub fn logout(&self) -> Result<()> {
        let removed = self.inner.store.remove(keys::AUTH_TOKEN);
        self.inner.state.send_replace(SessionState::resolved(false));
        info!("session ended");
        removed
    }

    pub fn token(&self) -> Option<String> {
        match self.inner.store.get(keys::AUTH_TOKEN) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "cannot read stored credential");
                None
            }
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.token().and_then(|token| Credential::parse(&token).ok())
    }

    fn replace_watcher(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.inner.watcher.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, handle),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), handle),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.watcher.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

fn evaluate(
    store: &Store,
    state: &watch::Sender<SessionState>,
    now: DateTime<Utc>,
) -> SessionState {
    let validity = match store.get(keys::AUTH_TOKEN) {
        Ok(Some(token)) => Some(Credential::check(&token, now)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "cannot read stored credential, treating as signed out");
            Some(Validity::Malformed)
        }
    };

    let authenticated = match validity {
        Some(Validity::Valid) => true,
        Some(reason) => {
            debug!(?reason, "discarding stored credential");
            if let Err(e) = store.remove(keys::AUTH_TOKEN) {
                warn!(error = %e, "cannot clear stored credential");
            }
            false
        }
        None => false,
    };

    let resolved = SessionState::resolved(authenticated);
    state.send_replace(resolved);
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::storage::{Backend, MemoryBackend};

    // Removes the token through a sibling context right after the first
    // token read, while `init` is still running its check.
    struct RemoveOnFirstRead {
        inner: MemoryBackend,
        sibling: Arc<OnceLock<Store>>,
        fired: AtomicBool,
    }

    impl Backend for RemoveOnFirstRead {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let value = self.inner.get(key)?;
            if key == keys::AUTH_TOKEN && !self.fired.swap(true, Ordering::SeqCst) {
                if let Some(sibling) = self.sibling.get() {
                    sibling.remove(key)?;
                }
            }
            Ok(value)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<bool> {
            self.inner.remove(key)
        }
    }

    fn token_expiring_in(offset: Duration) -> String {
        let exp = (Utc::now() + offset).timestamp();
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{}}}"#, exp));
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload)
    }

    #[test]
    fn test_starts_loading() {
        let session = SessionManager::new(Store::memory());
        assert_eq!(session.state(), SessionState::LOADING);
    }

    #[test]
    fn test_expired_token_is_cleared() {
        let store = Store::memory();
        store
            .set(keys::AUTH_TOKEN, &token_expiring_in(Duration::minutes(-1)))
            .unwrap();

        let session = SessionManager::new(store.clone());
        let state = session.initialize();

        assert_eq!(state, SessionState::resolved(false));
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_future_token_authenticates() {
        let store = Store::memory();
        store
            .set(keys::AUTH_TOKEN, &token_expiring_in(Duration::minutes(30)))
            .unwrap();

        let session = SessionManager::new(store.clone());
        assert!(session.initialize().authenticated);
        assert!(store.get(keys::AUTH_TOKEN).unwrap().is_some());
    }

    #[test]
    fn test_malformed_token_fails_closed() {
        let store = Store::memory();
        store.set(keys::AUTH_TOKEN, "garbage").unwrap();

        let session = SessionManager::new(store.clone());
        assert!(!session.initialize().authenticated);
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_missing_token_leaves_loading_false() {
        let session = SessionManager::new(Store::memory());
        assert_eq!(session.initialize(), SessionState::resolved(false));
    }

    #[test]
    fn test_login_then_initialize_stays_authenticated() {
        let session = SessionManager::new(Store::memory());
        let token = token_expiring_in(Duration::minutes(30));

        session.login(&token).unwrap();
        assert!(session.is_authenticated());
        assert!(session.initialize().authenticated);
        assert_eq!(session.token(), Some(token));
    }

    #[test]
    fn test_logout_then_initialize_is_signed_out() {
        let session = SessionManager::new(Store::memory());
        session
            .login(&token_expiring_in(Duration::minutes(30)))
            .unwrap();

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!session.initialize().authenticated);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_expiry_checked_against_given_clock() {
        let session = SessionManager::new(Store::memory());
        session
            .login(&token_expiring_in(Duration::minutes(10)))
            .unwrap();

        let later = Utc::now() + Duration::hours(1);
        assert!(!session.initialize_at(later).authenticated);
    }

    #[tokio::test]
    async fn test_logout_in_other_context_propagates() {
        let tab_a = Store::memory();
        let tab_b = tab_a.open_context();

        let session_a = SessionManager::new(tab_a);
        let session_b = SessionManager::new(tab_b);

        session_a
            .login(&token_expiring_in(Duration::minutes(30)))
            .unwrap();
        assert!(session_b.init().authenticated);

        let mut changes = session_b.subscribe();
        session_a.logout().unwrap();

        changes.changed().await.unwrap();
        assert!(!changes.borrow().authenticated);

        session_b.dispose();
    }

    #[tokio::test]
    async fn test_logout_during_init_check_is_not_missed() {
        let sibling = Arc::new(OnceLock::new());
        let store = Store::new(RemoveOnFirstRead {
            inner: MemoryBackend::new(),
            sibling: Arc::clone(&sibling),
            fired: AtomicBool::new(false),
        });
        store
            .set(keys::AUTH_TOKEN, &token_expiring_in(Duration::minutes(30)))
            .unwrap();
        let _ = sibling.set(store.open_context());

        let session = SessionManager::new(store.clone());
        assert!(session.init().authenticated);
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);

        let settled = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while session.is_authenticated() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(settled.is_ok(), "removal during init must sign the session out");

        session.dispose();
    }

    #[tokio::test]
    async fn test_dispose_stops_following() {
        let tab_a = Store::memory();
        let tab_b = tab_a.open_context();

        let session_a = SessionManager::new(tab_a);
        let session_b = SessionManager::new(tab_b);
        session_b.init();
        session_b.dispose();

        session_a
            .login(&token_expiring_in(Duration::minutes(30)))
            .unwrap();
        tokio::task::yield_now().await;
        assert!(!session_b.is_authenticated());
    }
}
