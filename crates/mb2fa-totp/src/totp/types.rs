//! Core types for the menu-bar authenticator.

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One enrolled 2FA account. Identity is its position in the stored list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// Display label (e.g. "GitHub").
    pub name: String,
    /// Base-32 encoded shared secret, as entered by the user.
    pub secret: String,
}

impl CredentialEntry {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Presentation-facing results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A rendered row: storage index, name and the code for the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    /// Index to pass back to edit/delete/copy.
    pub index: usize,
    pub name: String,
    /// Six-digit code, or the configured error sentinel.
    pub code: String,
    /// `false` when `code` is the error sentinel.
    pub valid: bool,
}

impl DisplayItem {
    /// Menu title, e.g. `"GitHub : 123456"`.
    pub fn title(&self) -> String {
        format!("{} : {}", self.name, self.code)
    }
}

/// Prefill for the edit dialog. The secret is never handed back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryForm {
    pub index: usize,
    pub name: String,
    pub masked_secret: String,
}

/// What a single scheduler tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TickOutcome {
    /// No entries stored; nothing to count down.
    Idle,
    /// Entries present; `refreshed` is set when codes were just recomputed.
    Counting { remaining: u32, refreshed: bool },
}

impl TickOutcome {
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Self::Idle => None,
            Self::Counting { remaining, .. } => Some(*remaining),
        }
    }

    pub fn refreshed(&self) -> bool {
        matches!(self, Self::Counting { refreshed: true, .. })
    }

    /// Countdown text for the disabled header item, `None` when idle.
    pub fn label(&self) -> Option<String> {
        self.remaining().map(countdown_label)
    }
}

/// `"Refreshing in 17s"`.
pub fn countdown_label(remaining: u32) -> String {
    format!("Refreshing in {}s", remaining)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotpErrorKind {
    /// Secret is not valid base-32.
    InvalidSecret,
    /// Code could not be computed (e.g. empty key).
    GenerationFailed,
    /// Persisted names/secrets/count disagree.
    StoreInconsistency,
    NotFound,
    StorageError,
    InvalidDigits,
    InvalidPeriod,
    ConfigError,
    IoError,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpError {
    pub kind: TotpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for TotpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for TotpError {}

impl TotpError {
    pub fn new(kind: TotpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn not_found(index: usize, count: usize) -> Self {
        Self::new(
            TotpErrorKind::NotFound,
            format!("No entry at index {} ({} stored)", index, count),
        )
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(TotpErrorKind::StorageError, msg)
    }
}

impl From<TotpError> for String {
    fn from(e: TotpError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_item_title() {
        let item = DisplayItem {
            index: 0,
            name: "GitHub".into(),
            code: "012345".into(),
            valid: true,
        };
        assert_eq!(item.title(), "GitHub : 012345");
    }

    #[test]
    fn tick_outcome_accessors() {
        assert_eq!(TickOutcome::Idle.remaining(), None);
        assert!(!TickOutcome::Idle.refreshed());
        assert_eq!(TickOutcome::Idle.label(), None);

        let t = TickOutcome::Counting {
            remaining: 17,
            refreshed: true,
        };
        assert_eq!(t.remaining(), Some(17));
        assert!(t.refreshed());
        assert_eq!(t.label().as_deref(), Some("Refreshing in 17s"));
    }

    #[test]
    fn tick_outcome_serde_shape() {
        let t = TickOutcome::Counting {
            remaining: 30,
            refreshed: false,
        };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"state":"counting","remaining":30,"refreshed":false}"#);
        let idle = serde_json::to_string(&TickOutcome::Idle).unwrap();
        assert_eq!(idle, r#"{"state":"idle"}"#);
    }

    #[test]
    fn error_display() {
        let err = TotpError::new(TotpErrorKind::InvalidSecret, "bad base32")
            .with_detail("index 2");
        let s = err.to_string();
        assert!(s.contains("InvalidSecret"));
        assert!(s.contains("bad base32"));
        assert!(s.contains("index 2"));
    }

    #[test]
    fn error_into_string() {
        let s: String = TotpError::not_found(3, 1).into();
        assert!(s.contains("NotFound"));
        assert!(s.contains("index 3"));
    }
}
