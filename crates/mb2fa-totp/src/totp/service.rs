//! High-level orchestrator — owns the secret store, the refresh scheduler and
//! the rendered codes. This is the surface the presentation shell calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::totp::clock::{Clock, SystemClock};
use crate::totp::config::AuthenticatorConfig;
use crate::totp::core;
use crate::totp::keychain::SecureStore;
use crate::totp::scheduler::RefreshScheduler;
use crate::totp::storage::SecretStore;
use crate::totp::types::*;

/// Shared service state; every store access goes through this lock.
pub type AuthenticatorState = Arc<Mutex<Authenticator>>;

/// Central authenticator service.
pub struct Authenticator {
    store: SecretStore,
    scheduler: RefreshScheduler,
    clock: Arc<dyn Clock>,
    config: AuthenticatorConfig,
    /// Entries the current `items` were rendered from. Reads always go to
    /// the store; this only tells whether the rendered rows are still valid.
    entries: Vec<CredentialEntry>,
    /// Codes for the window the scheduler last marked.
    items: Vec<DisplayItem>,
}

impl Authenticator {
    pub fn new(backend: impl SecureStore + 'static, config: AuthenticatorConfig) -> Result<Self, TotpError> {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Fails with `InvalidPeriod` / `InvalidDigits` on an unusable config.
    pub fn with_clock(
        backend: impl SecureStore + 'static,
        config: AuthenticatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TotpError> {
        config.validate()?;
        Ok(Self {
            store: SecretStore::new(backend),
            scheduler: RefreshScheduler::new(config.period),
            clock,
            config,
            entries: Vec::new(),
            items: Vec::new(),
        })
    }

    /// Service over the platform keychain, under `config.keychain_service`.
    #[cfg(feature = "os-keychain")]
    pub fn with_os_keychain(config: AuthenticatorConfig) -> Result<Self, TotpError> {
        let backend = crate::totp::keychain::KeychainStore::new(config.keychain_service.clone());
        Self::new(backend, config)
    }

    /// Wrap in `Arc<Mutex<_>>` for sharing with the refresh loop and commands.
    pub fn into_state(self) -> AuthenticatorState {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Display
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// One row per stored entry, in storage order. The store is re-read on
    /// every call; codes are recomputed when the entries changed or the
    /// window has moved on since they were rendered.
    pub fn list_display_items(&mut self) -> Result<Vec<DisplayItem>, TotpError> {
        let now = self.clock.unix_seconds();
        let entries = self.store.list()?;
        if entries != self.entries || (!entries.is_empty() && self.scheduler.is_stale_at(now)) {
            self.render(entries, now);
        }
        Ok(self.items.clone())
    }

    /// Persisted entry count.
    pub fn entry_count(&self) -> Result<usize, TotpError> {
        self.store.count()
    }

    /// Fresh code for one entry at the current instant (clipboard copy).
    /// Generation failures yield the error sentinel, like the menu rows.
    pub fn current_code(&self, index: usize) -> Result<String, TotpError> {
        let entry = self.store.get(index)?;
        let (code, _) = self.code_for(index, &entry, self.clock.unix_seconds());
        Ok(code)
    }

    /// Prefill for the edit dialog: the name and a masked secret.
    pub fn entry_for_edit(&self, index: usize) -> Result<EntryForm, TotpError> {
        let entry = self.store.get(index)?;
        Ok(EntryForm {
            index,
            name: entry.name,
            masked_secret: self.config.secret_mask.clone(),
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Mutations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Append an entry. Returns its index.
    pub fn add_entry(&mut self, name: &str, secret: &str) -> Result<usize, TotpError> {
        let index = self.store.add(name, secret)?;
        log::info!("Added entry {:?} at index {}", name, index);
        self.refresh_at(self.clock.unix_seconds())?;
        Ok(index)
    }

    /// Rename and/or re-key an entry. Passing the configured secret mask
    /// back unchanged keeps the stored secret.
    pub fn edit_entry(&mut self, index: usize, name: &str, secret: &str) -> Result<(), TotpError> {
        if secret == self.config.secret_mask {
            let current = self.store.get(index)?;
            self.store.update(index, name, &current.secret)?;
        } else {
            self.store.update(index, name, secret)?;
        }
        log::info!("Edited entry at index {}", index);
        self.refresh_at(self.clock.unix_seconds())
    }

    /// Remove an entry; later entries move up one index.
    pub fn delete_entry(&mut self, index: usize) -> Result<(), TotpError> {
        let removed = self.store.delete(index)?;
        log::info!("Deleted entry {:?} from index {}", removed.name, index);
        self.refresh_at(self.clock.unix_seconds())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Ticking
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Called once per second by the host. Recomputes every code when a new
    /// window has started and reports the countdown.
    pub fn tick(&mut self) -> Result<TickOutcome, TotpError> {
        let now = self.clock.unix_seconds();
        let outcome = self.scheduler.on_tick(now, self.store.count()?);
        match outcome {
            TickOutcome::Idle => {
                self.entries.clear();
                self.items.clear();
            }
            TickOutcome::Counting { refreshed: true, .. } => {
                self.entries = self.store.list()?;
                self.items = self.compute_items(now);
            }
            TickOutcome::Counting { .. } => {}
        }
        Ok(outcome)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Internal
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn refresh_at(&mut self, now: u64) -> Result<(), TotpError> {
        let entries = self.store.list()?;
        self.render(entries, now);
        Ok(())
    }

    fn render(&mut self, entries: Vec<CredentialEntry>, now: u64) {
        self.entries = entries;
        self.items = self.compute_items(now);
        if self.entries.is_empty() {
            self.scheduler.invalidate();
        } else {
            self.scheduler.mark_refreshed(now);
        }
    }

    fn compute_items(&self, now: u64) -> Vec<DisplayItem> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let (code, valid) = self.code_for(index, entry, now);
                DisplayItem {
                    index,
                    name: entry.name.clone(),
                    code,
                    valid,
                }
            })
            .collect()
    }

    fn code_for(&self, index: usize, entry: &CredentialEntry, now: u64) -> (String, bool) {
        match core::generate_from_secret(&entry.secret, now, self.config.digits, self.config.period) {
            Ok(code) => (code, true),
            Err(e) => {
                log::debug!("No code for entry {} ({:?}): {}", index, entry.name, e);
                (self.config.error_code.clone(), false)
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Refresh loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive [`Authenticator::tick`] every `interval`, forwarding each outcome.
/// The task ends when the receiver is dropped.
pub fn spawn_refresh_loop(
    state: AuthenticatorState,
    interval: Duration,
    tx: mpsc::UnboundedSender<TickOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let result = state.lock().await.tick();
            match result {
                Ok(outcome) => {
                    if tx.send(outcome).is_err() {
                        log::debug!("Refresh loop receiver dropped; stopping");
                        break;
                    }
                }
                Err(e) => log::warn!("Refresh tick failed: {}", e),
            }
        }
    })
}
