//! Terminal wallet: the user signs the challenge with their own wallet
//! software and pastes the signature back.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use carrent_core::auth::{WalletError, WalletSigner};

pub struct PromptSigner {
    address: String,
}

impl PromptSigner {
    pub fn new(address: String) -> Self {
        Self { address }
    }
}

#[async_trait]
impl WalletSigner for PromptSigner {
    fn address(&self) -> &str {
        &self.address
    }

    /// Waits for the user without a timeout; an empty answer is a rejection.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let message = message.to_string();
        let address = self.address.clone();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            writeln!(stderr, "Sign this message with wallet {}:\n\n    {}\n", address, message)?;
            write!(stderr, "Signature (empty to cancel): ")?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| WalletError::Other(e.to_string()))?
        .map_err(|e| WalletError::Other(e.to_string()))?;

        let signature = answer.trim();
        if signature.is_empty() {
            Err(WalletError::Rejected)
        } else {
            Ok(signature.to_string())
        }
    }
}
