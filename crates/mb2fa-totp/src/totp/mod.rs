//! Authenticator crate: sub-modules.

pub mod types;
pub mod config;
pub mod core;
pub mod clock;
pub mod keychain;
pub mod storage;
pub mod scheduler;
pub mod service;
#[cfg(feature = "tauri-commands")]
pub mod commands;

// Re-export top-level items for convenience.
pub use types::*;
pub use config::AuthenticatorConfig;
pub use clock::{Clock, ManualClock, SystemClock};
pub use keychain::{MemoryStore, SecureStore};
#[cfg(feature = "os-keychain")]
pub use keychain::KeychainStore;
pub use storage::SecretStore;
pub use scheduler::RefreshScheduler;
pub use service::{spawn_refresh_loop, Authenticator, AuthenticatorState};
#[cfg(feature = "tauri-commands")]
pub use commands::*;
