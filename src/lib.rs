//! IMAP mailbox checker
//!
//! Counts, lists or marks-as-seen the messages of one IMAP mailbox.
//! Every command opens a single session, selects the configured
//! mailbox, runs its searches, fetches or flag updates, and logs out
//! again whether or not the work succeeded.
//!
//! The binary (`checkmail`, behind the default `cli` feature) adds
//! argument parsing, config-file loading and terminal rendering on
//! top of [`commands`].

pub mod commands;
mod config;
mod connection;
mod error;
mod fetch;
mod mailbox;
mod query;
pub mod render;
mod session;
mod store;

pub use commands::{CountReport, CountScope, ListReport, ListScope, TouchReport};
pub use config::{ImapConfig, Security, Settings, expand_path};
pub use connection::{ImapSession, ImapStream};
pub use error::{Error, Result};
pub use fetch::Envelope;
pub use mailbox::{INBOX, MailboxName, MailboxStatus};
pub use query::{IdSet, MessageId, Predicate};
pub use session::{SelectedMailbox, Session, with_session};
pub use store::SEEN_FLAG;
