//! Session service over an external identity provider.
//!
//! The service is constructed explicitly, initialized once on start-up and
//! terminated on sign-out, and handed by `Arc` to whatever needs it: the
//! session gate and the transport pipeline's credential layers.
//!
//! State machine: Loading -> SignedIn | SignedOut, then SignedIn <-> SignedOut

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Identity provider contract
// ---------------------------------------------------------------------------

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
}

/// The external identity provider. Its protocol is opaque to this crate.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a persisted session at start-up, if any.
    async fn restore(&self) -> anyhow::Result<Option<Session>>;

    /// Signs in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<Session>;

    /// Ends the provider-side session.
    async fn sign_out(&self) -> anyhow::Result<()>;

    /// Returns a bearer credential for the current user, minting a fresh one
    /// when `force_refresh` is set.
    async fn id_token(&self, force_refresh: bool) -> anyhow::Result<String>;
}

/// What the transport pipeline needs from the session.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Whether a session currently exists.
    fn has_session(&self) -> bool;

    /// Bearer credential for the current session; `None` when signed out.
    async fn bearer_token(&self, force_refresh: bool) -> anyhow::Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// SessionService
// ---------------------------------------------------------------------------

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The provider has not yet reported whether a session exists.
    Loading,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

/// Injectable session holder.
pub struct SessionService {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
}

impl SessionService {
    /// Creates the service in the `Loading` state.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _rx) = watch::channel(SessionState::Loading);
        Self { provider, state }
    }

    /// Resolves the start-up session. A provider failure leaves the user
    /// signed out rather than stuck in `Loading`.
    pub async fn initialize(&self) -> SessionState {
        let next = match self.provider.restore().await {
            Ok(Some(session)) => SessionState::SignedIn(session),
            Ok(None) => SessionState::SignedOut,
            Err(err) => {
                warn!(error = %err, "session restore failed, continuing signed out");
                SessionState::SignedOut
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Signs in and publishes the new session.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the state is left unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<Session> {
        let session = self
            .provider
            .sign_in(email, password)
            .await
            .context("sign in")?;
        info!(user_id = %session.user_id, "signed in");
        self.state.send_replace(SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    /// Terminates the session. The local state becomes `SignedOut` even if
    /// the provider call fails.
    ///
    /// # Errors
    ///
    /// Returns the provider's error after updating local state.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        let result = self.provider.sign_out().await.context("sign out");
        self.state.send_replace(SessionState::SignedOut);
        info!("signed out");
        result
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Waits until the state is no longer `Loading`.
    pub async fn resolved(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let resolved = match rx.wait_for(|state| *state != SessionState::Loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        };
        resolved
    }
}

#[async_trait]
impl CredentialSource for SessionService {
    fn has_session(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::SignedIn(_))
    }

    async fn bearer_token(&self, force_refresh: bool) -> anyhow::Result<Option<String>> {
        if !self.has_session() {
            return Ok(None);
        }
        self.provider.id_token(force_refresh).await.map(Some)
    }
}

// ---------------------------------------------------------------------------
// StaticTokenProvider
// ---------------------------------------------------------------------------

/// Identity provider backed by a pre-issued token, for the CLI and tests.
///
/// With no token it behaves as permanently signed out.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn restore(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.token.as_ref().map(|_| Session {
            user_id: "token".to_string(),
            email: None,
        }))
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> anyhow::Result<Session> {
        anyhow::bail!("static token provider does not support interactive sign-in")
    }

    async fn sign_out(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn id_token(&self, _force_refresh: bool) -> anyhow::Result<String> {
        self.token.clone().context("no token configured")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    /// Provider whose token changes on every forced refresh.
    #[derive(Default)]
    struct CountingProvider {
        refreshes: AtomicU32,
        fail_restore: bool,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn restore(&self) -> anyhow::Result<Option<Session>> {
            if self.fail_restore {
                anyhow::bail!("provider offline");
            }
            Ok(None)
        }

        async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<Session> {
            if password != "secret" {
                anyhow::bail!("bad credentials");
            }
            Ok(Session {
                user_id: "u1".to_string(),
                email: Some(email.to_string()),
            })
        }

        async fn sign_out(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn id_token(&self, force_refresh: bool) -> anyhow::Result<String> {
            if force_refresh {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(format!("token-{}", self.refreshes.load(Ordering::SeqCst)))
        }
    }

    #[tokio::test]
    async fn starts_loading_and_resolves_signed_out() {
        let service = SessionService::new(Arc::new(CountingProvider::default()));
        assert_eq!(service.state(), SessionState::Loading);
        assert_eq!(service.initialize().await, SessionState::SignedOut);
        assert!(!service.has_session());
        assert_eq!(service.bearer_token(false).await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_failure_signs_out() {
        let provider = CountingProvider {
            fail_restore: true,
            ..CountingProvider::default()
        };
        let service = SessionService::new(Arc::new(provider));
        assert_eq!(service.initialize().await, SessionState::SignedOut);
    }

    #[tokio::test]
    async fn sign_in_publishes_session_and_tokens() {
        let service = SessionService::new(Arc::new(CountingProvider::default()));
        service.initialize().await;
        let mut rx = service.subscribe();

        let session = service.sign_in("ada@example.com", "secret").await.unwrap();
        assert_eq!(session.email.as_deref(), Some("ada@example.com"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().session(), Some(&session));

        assert_eq!(service.bearer_token(false).await.unwrap().as_deref(), Some("token-0"));
        assert_eq!(service.bearer_token(true).await.unwrap().as_deref(), Some("token-1"));

        service.sign_out().await.unwrap();
        assert_eq!(service.state(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_state() {
        let service = SessionService::new(Arc::new(CountingProvider::default()));
        service.initialize().await;
        assert!(service.sign_in("ada@example.com", "wrong").await.is_err());
        assert_eq!(service.state(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn resolved_waits_for_initialize() {
        let service = Arc::new(SessionService::new(Arc::new(StaticTokenProvider::new(
            Some("abc".to_string()),
        ))));
        let waiter = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.resolved().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        service.initialize().await;
        let state = waiter.await.unwrap();
        assert!(matches!(state, SessionState::SignedIn(_)));
        assert_eq!(service.bearer_token(true).await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn static_provider_without_token_is_signed_out() {
        let service = SessionService::new(Arc::new(StaticTokenProvider::new(Some(String::new()))));
        assert_eq!(service.initialize().await, SessionState::SignedOut);
    }
}
