//! External secure key/value store the secret list is persisted in.
//!
//! The store is a collaborator, not something this crate designs: a flat
//! string map with `get`, `set`, `remove` and `remove_all`. [`MemoryStore`] backs tests
//! and headless use; [`KeychainStore`] (feature `os-keychain`) talks to the
//! platform keychain through the `keyring` crate.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::totp::types::*;

/// Key holding the encoded name list.
pub const KEY_NAMES: &str = "names";
/// Key holding the encoded secret list.
pub const KEY_SECRETS: &str = "secrets";
/// Key holding the entry count as a decimal string.
pub const KEY_COUNT: &str = "count";
/// Name list key written by earlier releases.
pub const LEGACY_KEY_NAMES: &str = "name";
/// Secret list key written by earlier releases.
pub const LEGACY_KEY_SECRETS: &str = "base32";

/// Every key this crate may have written, current and legacy.
pub const MANAGED_KEYS: [&str; 5] = [
    KEY_NAMES,
    KEY_SECRETS,
    KEY_COUNT,
    LEGACY_KEY_NAMES,
    LEGACY_KEY_SECRETS,
];

/// Minimal secure-store interface.
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TotpError>;
    fn set(&self, key: &str, value: &str) -> Result<(), TotpError>;
    /// Erase one field. Removing an absent field is not an error.
    fn remove(&self, key: &str) -> Result<(), TotpError>;
    /// Erase every field this store holds for the authenticator.
    fn remove_all(&self) -> Result<(), TotpError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  In-memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory store. Clones share the same map, so a test can keep a handle
/// while the [`SecretStore`](crate::totp::storage::SecretStore) owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    fields: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with raw fields (e.g. a legacy keychain dump).
    pub fn with_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            fields: Arc::new(Mutex::new(map)),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, TotpError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TotpError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TotpError> {
        self.lock().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<(), TotpError> {
        self.lock().clear();
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Platform keychain
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// OS keychain (macOS Keychain, Windows Credential Manager, Secret Service).
/// Each field is one credential under `service`, with the key as account.
#[cfg(feature = "os-keychain")]
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

#[cfg(feature = "os-keychain")]
impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, TotpError> {
        keyring::Entry::new(&self.service, key).map_err(|e| {
            TotpError::storage("Failed to open keychain item")
                .with_detail(format!("{}/{}: {}", self.service, key, e))
        })
    }
}

#[cfg(feature = "os-keychain")]
impl SecureStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>, TotpError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(TotpError::storage("Keychain read failed").with_detail(format!("{}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TotpError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| TotpError::storage("Keychain write failed").with_detail(format!("{}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), TotpError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TotpError::storage("Keychain delete failed").with_detail(format!("{}: {}", key, e))),
        }
    }

    fn remove_all(&self) -> Result<(), TotpError> {
        for key in MANAGED_KEYS {
            self.remove(key)?;
        }
        log::info!("Cleared keychain items for {}", self.service);
        Ok(())
    }
}
