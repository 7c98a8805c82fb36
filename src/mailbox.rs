//! Mailbox names and selection status

use serde::Serialize;
use std::fmt;

/// The mailbox every account has (RFC 3501, matched case-insensitively).
pub const INBOX: &str = "INBOX";

/// Name of an IMAP mailbox.
///
/// `INBOX` is case-insensitive on the wire, so any spelling of it is
/// normalised. Every other name is kept verbatim.
///
/// # Examples
///
/// ```
/// use checkmail::MailboxName;
///
/// assert_eq!(MailboxName::new("inbox").as_str(), "INBOX");
/// assert_eq!(MailboxName::new("Archive/2024").as_str(), "Archive/2024");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MailboxName(String);

impl MailboxName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case(INBOX) {
            Self(INBOX.to_string())
        } else {
            Self(name)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.0 == INBOX
    }
}

impl Default for MailboxName {
    fn default() -> Self {
        Self(INBOX.to_string())
    }
}

impl fmt::Display for MailboxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MailboxName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MailboxName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// What the server reported when the mailbox was selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox (`EXISTS`).
    pub exists: u32,
    /// Number of messages with `\Recent` (`RECENT`).
    pub recent: u32,
    /// Sequence number of the first unseen message, if announced.
    pub first_unseen: Option<u32>,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
}

impl From<&async_imap::types::Mailbox> for MailboxStatus {
    fn from(mb: &async_imap::types::Mailbox) -> Self {
        Self {
            exists: mb.exists,
            recent: mb.recent,
            first_unseen: mb.unseen,
            uid_validity: mb.uid_validity,
            uid_next: mb.uid_next,
        }
    }
}
