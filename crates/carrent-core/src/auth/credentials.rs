use anyhow::{Context, Result};
use keyring::Entry;

use super::storage::TokenStorage;

const SERVICE_NAME: &str = "carrent";

/// Keychain account under which the session token is kept
const TOKEN_ENTRY: &str = "session-token";

/// Session token kept in the OS keychain.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, TOKEN_ENTRY).context("Failed to create keyring entry")
    }
}

impl TokenStorage for KeyringTokenStorage {
    /// Retrieve the token from the OS keychain, if one was stored
    fn load(&self) -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    /// Store the token in the OS keychain
    fn store(&self, token: &str) -> Result<()> {
        Self::entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    /// Delete the stored token
    fn remove(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
