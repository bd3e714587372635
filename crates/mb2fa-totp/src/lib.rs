//! # Menu Bar 2FA – Authenticator Core
//!
//! Everything behind the status-bar menu of a small TOTP authenticator:
//!
//! - **RFC 6238** – Base-32 secret decoding and 6-digit HMAC-SHA1 codes
//! - **Secret Store** – Ordered (name, secret) list persisted in a keychain-style
//!   key/value store, with migration from the legacy ` | `-delimited layout
//! - **Refresh Scheduler** – 1-second ticks, 30-second windows, codes recomputed
//!   once per window
//! - **Service** – Display items, add/edit/delete, countdown ticks and an async
//!   refresh loop over shared state
//! - **Tauri Commands** – Optional command surface for a frontend shell

pub mod totp;
