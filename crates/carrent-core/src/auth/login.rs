use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::{AuthError, SessionStore, WalletSigner};
use crate::api::ApiClient;

/// Progress of a single login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    NonceRequested,
    SignaturePending,
    VerifyRequested,
    Authenticated,
    Failed,
}

/// Message the wallet is asked to sign for `nonce`
pub fn challenge_message(nonce: &str) -> String {
    format!("Please sign this nonce: {}", nonce)
}

/// Wallet challenge-response login.
///
/// nonce → sign → verify → token, strictly in sequence. The issued token is
/// handed to the [`SessionStore`]. Failures propagate without retry.
pub struct LoginFlow {
    api: ApiClient,
    session: Arc<SessionStore>,
    state: Mutex<LoginState>,
}

impl LoginFlow {
    /// The login endpoints are public, so requests go out without the
    /// session's interceptors even when `api` is an authenticated client.
    pub fn new(api: &ApiClient, session: Arc<SessionStore>) -> Self {
        Self {
            api: api.anonymous(),
            session,
            state: Mutex::new(LoginState::Idle),
        }
    }

    pub fn state(&self) -> LoginState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: LoginState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*state, to = ?next, "Login state change");
        *state = next;
    }

    /// Log in with the connected wallet, returning the issued token.
    pub async fn login(&self, wallet: Option<&dyn WalletSigner>) -> Result<String, AuthError> {
        let Some(wallet) = wallet else {
            self.transition(LoginState::Failed);
            return Err(AuthError::WalletNotConnected);
        };

        match self.run(wallet).await {
            Ok(token) => {
                self.transition(LoginState::Authenticated);
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.transition(LoginState::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, wallet: &dyn WalletSigner) -> Result<String, AuthError> {
        let address = wallet.address();
        info!(address = %address, "Starting wallet login");

        self.transition(LoginState::NonceRequested);
        let nonce = self.api.request_nonce(address).await?;

        self.transition(LoginState::SignaturePending);
        let signature = wallet
            .sign_message(&challenge_message(&nonce))
            .await
            .map_err(AuthError::SignatureRejected)?;

        self.transition(LoginState::VerifyRequested);
        let token = self.api.verify_signature(address, &signature).await?;

        self.session
            .set_session(token.clone())
            .map_err(AuthError::Session)?;
        info!(address = %address, "Wallet login succeeded");
        Ok(token)
    }

    /// Explicit logout
    pub fn logout(&self) -> anyhow::Result<()> {
        self.transition(LoginState::Idle);
        self.session.clear_session()
    }
}
