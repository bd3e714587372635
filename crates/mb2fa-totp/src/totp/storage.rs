//! Secret Store — the ordered credential list over a flat key/value store.
//!
//! The list lives in three fields: `names`, `secrets` (JSON string arrays)
//! and `count` (decimal). Nothing is cached between calls; every operation
//! re-reads the backing store, and every mutation rewrites all three fields.
//! Fields written by earlier releases (` | `-delimited with a
//! trailing delimiter, under the `name` / `base32` keys) are still readable
//! and are replaced by the current layout on the next write, which also
//! erases the legacy keys. Both lists are always read from the same layout.

use crate::totp::keychain::*;
use crate::totp::types::*;

/// Separator used by the legacy layout.
pub const LEGACY_DELIMITER: &str = " | ";

/// How a persisted list field was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Json,
    Legacy,
}

/// Encode a list field.
pub fn encode_list(items: &[String]) -> Result<String, TotpError> {
    serde_json::to_string(items).map_err(|e| {
        TotpError::storage("Failed to encode list field").with_detail(e.to_string())
    })
}

/// Decode a list field in either layout. An empty field is an empty list.
pub fn decode_list(raw: &str) -> (Vec<String>, ListFormat) {
    if raw.trim_start().starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
            return (items, ListFormat::Json);
        }
    }
    if raw.is_empty() {
        return (Vec::new(), ListFormat::Legacy);
    }
    let body = raw.strip_suffix(LEGACY_DELIMITER).unwrap_or(raw);
    let items = body.split(LEGACY_DELIMITER).map(str::to_string).collect();
    (items, ListFormat::Legacy)
}

/// Raw view of the three persisted fields.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    count: usize,
    names: Vec<String>,
    secrets: Vec<String>,
    /// Only one of the current list keys is present.
    partial: bool,
}

impl Snapshot {
    fn is_consistent(&self) -> bool {
        !self.partial && self.names.len() == self.count && self.secrets.len() == self.count
    }

    /// Entries up to the shortest of the three lengths.
    fn into_entries(self) -> Vec<CredentialEntry> {
        let len = self.count.min(self.names.len()).min(self.secrets.len());
        self.names
            .into_iter()
            .zip(self.secrets)
            .take(len)
            .map(|(name, secret)| CredentialEntry { name, secret })
            .collect()
    }
}

/// CRUD over the persisted credential list.
pub struct SecretStore {
    backend: Box<dyn SecureStore>,
}

impl SecretStore {
    pub fn new(backend: impl SecureStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn SecureStore>) -> Self {
        Self { backend }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Persisted count; absent or unparsable counts read as 0.
    pub fn count(&self) -> Result<usize, TotpError> {
        Ok(match self.backend.get(KEY_COUNT)? {
            None => 0,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring unparsable entry count {:?}", raw);
                0
            }),
        })
    }

    /// All entries in storage order. Inconsistent fields are clamped to the
    /// shortest length and logged.
    pub fn list(&self) -> Result<Vec<CredentialEntry>, TotpError> {
        let snapshot = self.load()?;
        if !snapshot.is_consistent() {
            log::warn!(
                "Secret store inconsistent: count={} names={} secrets={} partial={}; clamping",
                snapshot.count,
                snapshot.names.len(),
                snapshot.secrets.len(),
                snapshot.partial
            );
        }
        Ok(snapshot.into_entries())
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Result<CredentialEntry, TotpError> {
        let mut entries = self.list()?;
        if index >= entries.len() {
            return Err(TotpError::not_found(index, entries.len()));
        }
        Ok(entries.swap_remove(index))
    }

    /// Report a count/list-length mismatch as an error instead of clamping.
    pub fn verify(&self) -> Result<(), TotpError> {
        let snapshot = self.load()?;
        if snapshot.is_consistent() {
            Ok(())
        } else {
            Err(TotpError::new(
                TotpErrorKind::StoreInconsistency,
                "Persisted names, secrets and count disagree",
            )
            .with_detail(format!(
                "count={} names={} secrets={} partial={}",
                snapshot.count,
                snapshot.names.len(),
                snapshot.secrets.len(),
                snapshot.partial
            )))
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Append an entry. Returns its index.
    pub fn add(&self, name: &str, secret: &str) -> Result<usize, TotpError> {
        let mut entries = self.list()?;
        entries.push(CredentialEntry::new(name, secret));
        self.persist(&entries)?;
        Ok(entries.len() - 1)
    }

    /// Replace the entry at `index` in place.
    pub fn update(&self, index: usize, name: &str, secret: &str) -> Result<(), TotpError> {
        let mut entries = self.list()?;
        let len = entries.len();
        let slot = entries
            .get_mut(index)
            .ok_or_else(|| TotpError::not_found(index, len))?;
        *slot = CredentialEntry::new(name, secret);
        self.persist(&entries)
    }

    /// Remove the entry at `index`; later entries shift down by one.
    /// Removing the last entry erases the fields instead of writing empties.
    pub fn delete(&self, index: usize) -> Result<CredentialEntry, TotpError> {
        let mut entries = self.list()?;
        if index >= entries.len() {
            return Err(TotpError::not_found(index, entries.len()));
        }
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.backend.remove_all()?;
        } else {
            self.persist(&entries)?;
        }
        Ok(removed)
    }

    // ── Internal ─────────────────────────────────────────────────

    fn load(&self) -> Result<Snapshot, TotpError> {
        let count = self.count()?;
        let names = self.backend.get(KEY_NAMES)?;
        let secrets = self.backend.get(KEY_SECRETS)?;
        // Never pair a current list with a legacy one.
        let (names, secrets, partial) = match (names, secrets) {
            (None, None) => (
                self.backend.get(LEGACY_KEY_NAMES)?,
                self.backend.get(LEGACY_KEY_SECRETS)?,
                false,
            ),
            (names, secrets) => {
                let partial = names.is_none() || secrets.is_none();
                (names, secrets, partial)
            }
        };
        Ok(Snapshot {
            count,
            names: decode_field(KEY_NAMES, names),
            secrets: decode_field(KEY_SECRETS, secrets),
            partial,
        })
    }

    fn persist(&self, entries: &[CredentialEntry]) -> Result<(), TotpError> {
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let secrets: Vec<String> = entries.iter().map(|e| e.secret.clone()).collect();
        self.backend.set(KEY_NAMES, &encode_list(&names)?)?;
        self.backend.set(KEY_SECRETS, &encode_list(&secrets)?)?;
        self.backend.set(KEY_COUNT, &entries.len().to_string())?;
        self.backend.remove(LEGACY_KEY_NAMES)?;
        self.backend.remove(LEGACY_KEY_SECRETS)?;
        Ok(())
    }
}

fn decode_field(key: &str, raw: Option<String>) -> Vec<String> {
    let (items, format) = decode_list(raw.as_deref().unwrap_or_default());
    if format == ListFormat::Legacy && !items.is_empty() {
        log::debug!("Field {:?} uses the legacy delimited layout", key);
    }
    items
}
