//! Email address entries produced by the address-list parser.

use serde::{Deserialize, Serialize};

/// One mailbox from an address-list header.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`,
///   `mailbox = "juan"`, `host = "ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `mailbox = "user"`,
///   `host = "example.com"`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Local part (before the last `@`).
    pub mailbox: String,
    /// Domain (after the last `@`); empty for a bare local name.
    pub host: String,
    /// Human-readable display name (may be empty).
    pub display_name: String,
}

impl Address {
    /// Build an entry from a display name and a combined `mailbox@host`.
    pub fn new(display_name: impl Into<String>, address: &str) -> Self {
        let (mailbox, host) = match address.rsplit_once('@') {
            Some((mailbox, host)) => (mailbox.to_string(), host.to_string()),
            None => (address.to_string(), String::new()),
        };
        Self {
            mailbox,
            host,
            display_name: display_name.into(),
        }
    }

    /// The combined form: `mailbox@host`, or just the mailbox without a host.
    pub fn address(&self) -> String {
        if self.host.is_empty() {
            self.mailbox.clone()
        } else {
            format!("{}@{}", self.mailbox, self.host)
        }
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address()
        } else {
            format!("{} <{}>", self.display_name, self.address())
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
