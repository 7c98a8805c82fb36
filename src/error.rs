//! Error types for checkmail

use crate::query::Predicate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection to {server:?} failed: {detail}")]
    Connect { server: String, detail: String },

    #[error("Login failed: {0}")]
    Auth(String),

    #[error("Failed to select {mailbox:?}: {detail}")]
    Select { mailbox: String, detail: String },

    #[error("Search for {predicate} messages failed: {detail}")]
    Search { predicate: Predicate, detail: String },

    #[error("Fetch of {count} messages failed: {detail}")]
    Fetch { count: usize, detail: String },

    #[error("Marking of {count} messages failed: {detail}")]
    MarkSeen { count: usize, detail: String },

    #[error("Failed to list mailboxes: {0}")]
    ListMailboxes(String),
}

impl Error {
    pub(crate) fn connect(server: &str, detail: impl ToString) -> Self {
        Self::Connect {
            server: server.to_string(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
