//! Envelope fetching
//!
//! Resolves an [`IdSet`] into [`Envelope`]s with a single batched
//! `FETCH ... ENVELOPE`. Message bodies are never requested.

use crate::error::{Error, Result};
use crate::query::{IdSet, MessageId};
use crate::session::SelectedMailbox;
use async_imap::imap_proto::types::{
    Address, AttributeValue, Envelope as ImapEnvelope, Response,
};
use chrono::{DateTime, FixedOffset};
use mail_parser::MessageParser;
use serde::Serialize;
use tracing::{debug, warn};

/// Sender, subject and date of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    /// Sequence number the server reported for this message.
    pub id: MessageId,
    pub date: Option<DateTime<FixedOffset>>,
    /// `From` addresses as `mailbox@host`.
    pub from: Vec<String>,
    pub subject: String,
}

impl Envelope {
    fn from_imap(id: MessageId, env: &ImapEnvelope<'_>) -> Self {
        Self {
            id,
            date: env
                .date
                .as_deref()
                .and_then(|raw| parse_date(&String::from_utf8_lossy(raw))),
            from: env
                .from
                .as_deref()
                .unwrap_or_default()
                .iter()
                .filter_map(format_address)
                .collect(),
            subject: env.subject.as_deref().map(decode_subject).unwrap_or_default(),
        }
    }

    /// The first sender, with `,+` appended when there are more.
    #[must_use]
    pub fn sender(&self) -> String {
        match self.from.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, ..] => format!("{first},+"),
        }
    }
}

fn format_address(addr: &Address<'_>) -> Option<String> {
    let mailbox = String::from_utf8_lossy(addr.mailbox.as_deref()?);
    match addr.host.as_deref() {
        Some(host) => Some(format!("{mailbox}@{}", String::from_utf8_lossy(host))),
        None => Some(mailbox.into_owned()),
    }
}

/// Parse an RFC 2822 date, ignoring a trailing `(comment)`.
fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    let without_comment = match trimmed.rfind(" (") {
        Some(idx) if trimmed.ends_with(')') => &trimmed[..idx],
        _ => trimmed,
    };
    DateTime::parse_from_rfc2822(without_comment).ok()
}

/// Decode RFC 2047 encoded words; undecodable input is returned as-is.
fn decode_subject(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.contains("=?") {
        return text.into_owned();
    }

    let header = format!("Subject: {text}\r\n\r\n");
    MessageParser::default()
        .parse(header.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string))
        .unwrap_or_else(|| text.into_owned())
}

impl SelectedMailbox<'_> {
    /// Fetch the envelopes of `ids` in one request.
    ///
    /// An empty set returns immediately without contacting the server.
    /// The response is drained up to its tagged completion before the
    /// outcome is checked, and a failure anywhere discards the partial
    /// result. Every message in `ids` must come back with an envelope;
    /// a short answer is a failure rather than a short listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the FETCH cannot be read, is not
    /// completed with `OK`, or leaves messages without an envelope.
    pub async fn fetch_envelopes(&mut self, ids: &IdSet) -> Result<Vec<Envelope>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let count = ids.len();
        debug!("Fetch {} messages", count);

        let mut envelopes = Vec::with_capacity(count);
        self.session()
            .run_to_completion(
                &format!("FETCH {} ENVELOPE", ids.to_sequence_set()),
                |response| {
                    if let Response::Fetch(seq, attrs) = response {
                        let id = MessageId(*seq);
                        match attrs.iter().find_map(envelope_attr) {
                            Some(env) if ids.contains(id) => {
                                envelopes.push(Envelope::from_imap(id, env));
                            }
                            _ => debug!("Ignoring FETCH data for message {}", seq),
                        }
                    }
                },
            )
            .await
            .map_err(|detail| Error::Fetch { count, detail })?;

        let missing = missing_ids(ids, &envelopes);
        if !missing.is_empty() {
            warn!("No envelope for messages {}", missing.to_sequence_set());
            return Err(Error::Fetch {
                count,
                detail: format!("no envelope for messages {}", missing.to_sequence_set()),
            });
        }

        Ok(envelopes)
    }
}

fn envelope_attr<'a, 'b>(attr: &'a AttributeValue<'b>) -> Option<&'a ImapEnvelope<'b>> {
    match attr {
        AttributeValue::Envelope(env) => Some(env.as_ref()),
        _ => None,
    }
}

/// Requested messages that received no envelope.
fn missing_ids(ids: &IdSet, envelopes: &[Envelope]) -> IdSet {
    let answered: IdSet = envelopes.iter().map(|env| env.id.0).collect();
    ids.iter()
        .filter(|id| !answered.contains(*id))
        .map(|id| id.0)
        .collect()
}
