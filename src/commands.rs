//! The count, list and touch commands
//!
//! Each command opens its own session through
//! [`with_session`](crate::session::with_session), does its work, and
//! returns a plain report for the caller to render. The session is
//! closed before the report is handed back.

use crate::config::ImapConfig;
use crate::error::Result;
use crate::fetch::Envelope;
use crate::query::Predicate;
use crate::session::with_session;
use serde::Serialize;
use tracing::info;

/// Which counts `count` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountScope {
    /// Seen and unseen, plus their total.
    #[default]
    All,
    Seen,
    Unseen,
}

/// What `list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// The account's mailboxes instead of messages.
    Mailboxes,
    #[default]
    Unseen,
    Seen,
    All,
}

impl ListScope {
    const fn predicate(self) -> Option<Predicate> {
        match self {
            Self::Mailboxes => None,
            Self::Unseen => Some(Predicate::Unseen),
            Self::Seen => Some(Predicate::Seen),
            Self::All => Some(Predicate::All),
        }
    }
}

/// Message counts; a side that was not queried is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub seen: Option<usize>,
    pub unseen: Option<usize>,
}

impl CountReport {
    /// Seen plus unseen, when both were queried.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        Some(self.seen? + self.unseen?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum ListReport {
    Mailboxes(Vec<String>),
    Messages(Vec<Envelope>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchReport {
    /// How many messages were marked; zero means there was nothing to do.
    pub marked: usize,
}

/// Count messages in the configured mailbox.
///
/// `CountScope::All` issues two searches (seen and unseen). They are
/// separate snapshots, so on a mailbox receiving mail mid-command the
/// total can be off by the messages that arrived in between.
///
/// # Errors
///
/// Any session, select or search error.
pub async fn count(config: &ImapConfig, scope: CountScope) -> Result<CountReport> {
    with_session(config, async |session| {
        let mut mailbox = session.select(&config.mailbox).await?;

        let seen = match scope {
            CountScope::All | CountScope::Seen => Some(mailbox.search(Predicate::Seen).await?.len()),
            CountScope::Unseen => None,
        };
        let unseen = match scope {
            CountScope::All | CountScope::Unseen => {
                Some(mailbox.search(Predicate::Unseen).await?.len())
            }
            CountScope::Seen => None,
        };

        Ok(CountReport { seen, unseen })
    })
    .await
}

/// List mailboxes, or the envelopes of messages in the configured
/// mailbox.
///
/// `ListScope::Mailboxes` never selects a mailbox.
///
/// # Errors
///
/// Any session, list, select, search or fetch error.
pub async fn list(config: &ImapConfig, scope: ListScope) -> Result<ListReport> {
    with_session(config, async |session| {
        let Some(predicate) = scope.predicate() else {
            return Ok(ListReport::Mailboxes(session.list_mailboxes().await?));
        };

        let mut mailbox = session.select(&config.mailbox).await?;
        let ids = mailbox.search(predicate).await?;
        let envelopes = mailbox.fetch_envelopes(&ids).await?;
        Ok(ListReport::Messages(envelopes))
    })
    .await
}

/// Mark every unseen message in the configured mailbox as seen.
///
/// # Errors
///
/// Any session, select, search or store error.
pub async fn touch(config: &ImapConfig) -> Result<TouchReport> {
    with_session(config, async |session| {
        let mut mailbox = session.select(&config.mailbox).await?;
        let unseen = mailbox.search(Predicate::Unseen).await?;

        if unseen.is_empty() {
            return Ok(TouchReport { marked: 0 });
        }

        let marked = mailbox.mark_seen(&unseen).await?;
        info!("{} messages in {} marked as seen", marked, config.mailbox);
        Ok(TouchReport { marked })
    })
    .await
}
