//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing account state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(false, "alice@example.com", "Hello")
//!         .email(true, "bob@example.com", "Re: Hello")
//!     .folder("Sent")
//!     .corrupt("FETCH")
//!     .refuse("STORE")
//!     .build();
//! ```
//!
//! Messages have no UIDs: the client only speaks sequence numbers, so
//! a message's number is its 1-based position in its folder.

/// Date used by `.email()` when none is given.
pub const DEFAULT_DATE: &str = "Mon, 15 Jan 2024 10:00:00 +0000";

/// A complete account: named folders plus the commands whose responses
/// the server should mangle or refuse.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    pub corrupt: Vec<String>,
    pub refused: Vec<String>,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    /// Whether responses to `command` (e.g. `"FETCH"`) should be
    /// replaced by unparsable data.
    pub fn is_corrupt(&self, command: &str) -> bool {
        self.corrupt.iter().any(|c| c.eq_ignore_ascii_case(command))
    }

    /// Whether `command` should complete with a tagged `NO`.
    pub fn is_refused(&self, command: &str) -> bool {
        self.refused.iter().any(|c| c.eq_ignore_ascii_case(command))
    }
}

/// A single IMAP folder (e.g. "INBOX", "Sent").
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
}

impl Folder {
    /// Number of messages carrying `\Seen`.
    pub fn seen_count(&self) -> usize {
        self.emails.iter().filter(|e| e.seen).count()
    }
}

/// A test email as the server's ENVELOPE data sees it.
///
/// - `seen`: whether the `\Seen` flag is set.
/// - `from`: sender addresses in `mailbox@host` form.
/// - `date`: the raw Date header; `None` is sent as NIL.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub seen: bool,
    pub from: Vec<String>,
    pub subject: String,
    pub date: Option<String>,
}

/// Builder for constructing a `Mailbox` step by step.
///
/// Call `.folder(name)` to start a new folder, then chain `.email()`
/// calls to add messages to it. Finish with `.build()`.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
    corrupt: Vec<String>,
    refused: Vec<String>,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            corrupt: Vec::new(),
            refused: Vec::new(),
        }
    }

    /// Add a new folder. Subsequent `.email()` calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            emails: Vec::new(),
        });
        self
    }

    /// Add an email dated [`DEFAULT_DATE`] to the most recent folder.
    /// Several senders may be given separated by commas.
    pub fn email(self, seen: bool, from: &str, subject: &str) -> Self {
        self.email_dated(seen, from, subject, Some(DEFAULT_DATE))
    }

    /// Add an email with an explicit (or missing) Date header.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email_dated(mut self, seen: bool, from: &str, subject: &str, date: Option<&str>) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(TestEmail {
                seen,
                from: from.split(',').map(|a| a.trim().to_string()).collect(),
                subject: subject.to_string(),
                date: date.map(ToString::to_string),
            });
        self
    }

    /// Make the server answer `command` with a line no IMAP parser
    /// accepts.
    pub fn corrupt(mut self, command: &str) -> Self {
        self.corrupt.push(command.to_string());
        self
    }

    /// Make the server complete `command` with `NO` instead of `OK`.
    /// Any data it would send is still sent first; a refused STORE
    /// changes no flags.
    pub fn refuse(mut self, command: &str) -> Self {
        self.refused.push(command.to_string());
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            corrupt: self.corrupt,
            refused: self.refused,
        }
    }
}
