//! Session lifecycle
//!
//! A [`Session`] is one authenticated connection. Work that needs a
//! mailbox goes through [`Session::select`], which hands out a
//! [`SelectedMailbox`] borrowing the session: searches, fetches and
//! flag updates only exist on that type, so sequence numbers can never
//! be used without a selection backing them.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::mailbox::{MailboxName, MailboxStatus};
use async_imap::imap_proto::{MailboxDatum, Response, Status};
use tracing::{debug, warn};

/// An authenticated IMAP session bound to one server.
pub struct Session {
    imap: ImapSession,
    server: String,
}

impl Session {
    /// Connect and log in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] or [`Error::Auth`]; no LOGIN is sent
    /// if the connection (including the TLS handshake) fails.
    pub async fn open(config: &ImapConfig) -> Result<Self> {
        let client = connection::connect(config).await?;
        let imap = connection::login(client, config).await?;
        Ok(Self {
            imap,
            server: config.server.clone(),
        })
    }

    /// Best-effort LOGOUT. Failures are logged, never returned.
    pub async fn close(mut self) {
        if let Err(e) = connection::logout(&mut self.imap).await {
            warn!("Logout from {} failed: {}", self.server, e);
        }
    }

    /// SELECT `name`, replacing any previous selection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Select`] naming the mailbox.
    pub async fn select(&mut self, name: &MailboxName) -> Result<SelectedMailbox<'_>> {
        debug!("Select mailbox {:?}", name.as_str());

        let mailbox = self
            .imap
            .select(name.as_str())
            .await
            .map_err(|e| Error::Select {
                mailbox: name.to_string(),
                detail: e.to_string(),
            })?;

        let status = MailboxStatus::from(&mailbox);
        debug!("{} messages in {}", status.exists, name);

        Ok(SelectedMailbox {
            session: self,
            name: name.clone(),
            status,
        })
    }

    /// LIST every mailbox on the account, in server order.
    ///
    /// The listing is drained up to its tagged completion before the
    /// outcome is checked; on failure nothing received is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ListMailboxes`] if the LIST cannot be read or
    /// the server does not complete it with `OK`.
    pub async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        debug!("Get list of mailboxes");

        let mut names = Vec::new();
        self.run_to_completion("LIST \"\" \"*\"", |response| {
            if let Response::MailboxData(MailboxDatum::List { name, .. }) = response {
                names.push(name.to_string());
            }
        })
        .await
        .map_err(Error::ListMailboxes)?;

        Ok(names)
    }

    /// Send `command` and hand every response before its tagged
    /// completion to `on_data`.
    ///
    /// On failure the returned detail names the cause: an unreadable
    /// response, a dropped connection, or a completion status other
    /// than `OK` together with the server's text.
    pub(crate) async fn run_to_completion<F>(
        &mut self,
        command: &str,
        mut on_data: F,
    ) -> std::result::Result<(), String>
    where
        F: FnMut(&Response<'_>),
    {
        let id = self
            .imap
            .run_command(command)
            .await
            .map_err(|e| e.to_string())?;

        loop {
            let Some(response) = self.imap.read_response().await.map_err(|e| e.to_string())?
            else {
                return Err("connection lost".to_string());
            };

            match response.parsed() {
                Response::Done {
                    tag,
                    status,
                    information,
                    ..
                } if *tag == id => {
                    return match status {
                        Status::Ok => Ok(()),
                        other => Err(completion_detail(other, information.as_deref())),
                    };
                }
                data => on_data(data),
            }
        }
    }
}

/// `NO refused`, `BAD syntax error` and the like.
fn completion_detail(status: &Status, information: Option<&str>) -> String {
    let status = match status {
        Status::Ok => "OK",
        Status::No => "NO",
        Status::Bad => "BAD",
        Status::PreAuth => "PREAUTH",
        Status::Bye => "BYE",
    };
    match information {
        Some(text) => format!("{status} {text}"),
        None => status.to_string(),
    }
}

/// A session with a mailbox selected.
pub struct SelectedMailbox<'s> {
    session: &'s mut Session,
    name: MailboxName,
    status: MailboxStatus,
}

impl SelectedMailbox<'_> {
    #[must_use]
    pub const fn name(&self) -> &MailboxName {
        &self.name
    }

    /// Status announced by the server at selection time.
    #[must_use]
    pub const fn status(&self) -> MailboxStatus {
        self.status
    }

    pub(crate) const fn imap(&mut self) -> &mut ImapSession {
        &mut self.session.imap
    }

    pub(crate) const fn session(&mut self) -> &mut Session {
        &mut *self.session
    }
}

/// Run `body` on a freshly opened session and close it afterwards.
///
/// The session is closed exactly once whether `body` succeeds or
/// fails, and `body`'s outcome is returned unchanged.
///
/// # Errors
///
/// Returns the error from opening the session or from `body`.
pub async fn with_session<T, F>(config: &ImapConfig, body: F) -> Result<T>
where
    F: AsyncFnOnce(&mut Session) -> Result<T>,
{
    let mut session = Session::open(config).await?;
    let outcome = body(&mut session).await;
    session.close().await;
    outcome
}
