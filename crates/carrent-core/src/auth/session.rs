use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderValue;
use tracing::{debug, info, warn};

use super::storage::TokenStorage;

/// Snapshot of the authentication state.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl Session {
    fn with_token(token: Option<String>) -> Self {
        Self {
            is_authenticated: token.is_some(),
            token,
        }
    }
}

/// Whether `token` can be sent as `Authorization: Bearer <token>`
fn is_header_safe(token: &str) -> bool {
    HeaderValue::from_str(&format!("Bearer {}", token)).is_ok()
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Single source of truth for the session token.
///
/// Only `set_session` and `clear_session` mutate the state; every other
/// component holds an `Arc<SessionStore>` and reads through it. Updates are
/// visible to all readers as soon as the call returns.
pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
    state: RwLock<Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create the store, reading the persisted token once.
    /// An unreadable or unusable token is treated as logged out.
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        let token = match storage.load() {
            Ok(Some(token)) if !is_header_safe(&token) => {
                warn!("Persisted session token is not a valid header value, starting logged out");
                None
            }
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not load persisted session, starting logged out");
                None
            }
        };
        debug!(authenticated = token.is_some(), "Session store initialised");
        Self {
            storage: Box::new(storage),
            state: RwLock::new(Session::with_token(token)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the bearer token if logged in
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// Default `Authorization` value for outgoing requests.
    /// Logged out yields an empty credential, left for the server to reject.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.read().token.as_deref().unwrap_or_default())
    }

    /// Install `token` as the current session and persist it.
    /// Memory is updated before persistence, so a storage failure still
    /// leaves this process logged in. A token that cannot be carried in an
    /// `Authorization` header is rejected and the session is left untouched.
    pub fn set_session(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if !is_header_safe(&token) {
            bail!("Session token contains characters not allowed in a header");
        }
        *self.write() = Session::with_token(Some(token.clone()));
        info!("Session established");
        self.storage
            .store(&token)
            .context("Failed to persist session token")
    }

    /// Drop the session from memory and storage
    pub fn clear_session(&self) -> Result<()> {
        *self.write() = Session::default();
        info!("Session cleared");
        self.storage
            .remove()
            .context("Failed to remove persisted session token")
    }

    /// React to the wallet connector: a disconnected wallet ends the session.
    pub fn wallet_changed(&self, account: Option<&str>) -> Result<()> {
        match account {
            Some(account) => {
                debug!(account = %account, "Wallet connected");
                Ok(())
            }
            None if self.is_authenticated() => {
                info!("Wallet disconnected, logging out");
                self.clear_session()
            }
            None => Ok(()),
        }
    }
}
