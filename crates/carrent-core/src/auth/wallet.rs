//! Wallet identity as seen by the login flow.
//!
//! The wallet itself lives outside this crate; all the login flow needs is
//! the account address and a way to have a message signed.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Signature request was rejected")]
    Rejected,

    #[error("Wallet error: {0}")]
    Other(String),
}

/// A connected wallet: an account plus a signing capability.
///
/// `sign_message` may wait indefinitely on the user; callers impose no timeout.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> &str;

    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}

/// Signer answering every request with a fixed signature (or a rejection),
/// recording the messages it was asked to sign.
#[derive(Debug)]
pub struct StaticSigner {
    address: String,
    signature: Result<String, WalletError>,
    signed: Mutex<Vec<String>>,
}

impl StaticSigner {
    pub fn new(address: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            signature: Ok(signature.into()),
            signed: Mutex::new(Vec::new()),
        }
    }

    /// A signer whose user declines every request
    pub fn rejecting(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            signature: Err(WalletError::Rejected),
            signed: Mutex::new(Vec::new()),
        }
    }

    /// Messages presented for signing so far
    pub fn signed_messages(&self) -> Vec<String> {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WalletSigner for StaticSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        self.signature.clone()
    }
}
