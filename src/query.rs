//! Search predicates and identifier sets
//!
//! A search maps one [`Predicate`] onto exactly one remote `SEARCH`.
//! Results come back as an [`IdSet`] of sequence numbers, which are
//! only meaningful for the mailbox selection that produced them.

use crate::error::{Error, Result};
use crate::session::SelectedMailbox;
use async_imap::imap_proto::{MailboxDatum, Response};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Which messages a search should match.
///
/// The variants are disjoint by construction: `All` is its own remote
/// query and is never derived by adding up `Seen` and `Unseen`.
///
/// # Examples
///
/// ```
/// use checkmail::Predicate;
///
/// assert_eq!(Predicate::Unseen.as_imap_str(), "UNSEEN");
/// assert_eq!(Predicate::Unseen.to_string(), "unseen");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Every message in the mailbox.
    All,
    /// Messages carrying `\Seen`.
    Seen,
    /// Messages without `\Seen`.
    Unseen,
}

impl Predicate {
    /// The IMAP search key for this predicate.
    #[must_use]
    pub const fn as_imap_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Seen => "SEEN",
            Self::Unseen => "UNSEEN",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Seen => "seen",
            Self::Unseen => "unseen",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A server-assigned message sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An ascending, duplicate-free set of message identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(Vec<MessageId>);

impl IdSet {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn contains(&self, id: MessageId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Render as an IMAP sequence set, folding consecutive runs into
    /// ranges (`1:3,7`). Empty sets render as an empty string.
    #[must_use]
    pub fn to_sequence_set(&self) -> String {
        let mut parts = Vec::new();
        let mut ids = self.0.iter().map(|id| id.0).peekable();

        while let Some(start) = ids.next() {
            let mut end = start;
            while end
                .checked_add(1)
                .is_some_and(|next| ids.peek() == Some(&next))
            {
                end += 1;
                ids.next();
            }
            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{start}:{end}"));
            }
        }

        parts.join(",")
    }
}

impl FromIterator<u32> for IdSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut ids: Vec<MessageId> = iter.into_iter().map(MessageId).collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }
}

impl SelectedMailbox<'_> {
    /// Run one remote SEARCH for `predicate`.
    ///
    /// An empty result is an empty set, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`] if the response cannot be read or the
    /// server does not complete the SEARCH with `OK`.
    pub async fn search(&mut self, predicate: Predicate) -> Result<IdSet> {
        debug!("Search {} messages in {}", predicate, self.name());

        let mut hits = Vec::new();
        self.session()
            .run_to_completion(&format!("SEARCH {}", predicate.as_imap_str()), |response| {
                if let Response::MailboxData(MailboxDatum::Search(found)) = response {
                    hits.extend_from_slice(found);
                }
            })
            .await
            .map_err(|detail| Error::Search { predicate, detail })?;

        let ids: IdSet = hits.into_iter().collect();
        debug!("{} {} messages", ids.len(), predicate);
        Ok(ids)
    }
}
