//! Authentication module for the wallet login and session lifecycle.
//!
//! This module provides:
//! - `SessionStore`: the bearer token, persisted across restarts
//! - `LoginFlow`: nonce → wallet signature → token handshake
//! - `RouteGuard`: gate for views that need a session
//! - `TokenStorage` backends: session file, OS keyring, memory
//!
//! A 401 from any authenticated request clears the session (see
//! [`crate::api::AuthInterceptor`]).

pub mod credentials;
pub mod guard;
pub mod login;
pub mod session;
pub mod storage;
pub mod wallet;

pub use credentials::KeyringTokenStorage;
pub use guard::{Access, Route, RouteGuard};
pub use login::{challenge_message, LoginFlow, LoginState};
pub use session::{Session, SessionStore};
pub use storage::{open_token_storage, FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use wallet::{StaticSigner, WalletError, WalletSigner};

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Signature rejected: {0}")]
    SignatureRejected(WalletError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server issued a token but it could not be stored
    #[error("Session could not be saved: {0:#}")]
    Session(anyhow::Error),
}
