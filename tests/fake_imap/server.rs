//! In-process fake IMAP server for integration testing
//!
//! ## Connection lifecycle
//!
//! ```text
//!   Client connects via TCP
//!       |
//!   (implicit TLS only) TLS handshake, before any IMAP traffic
//!       |
//!   Server sends greeting: "* OK IMAP4rev1 ready\r\n"
//!       |
//!   Client sends LOGIN with username and password
//!       |
//!   Client issues commands: LIST, SELECT, SEARCH, FETCH, STORE
//!       |
//!   Client sends LOGOUT
//! ```
//!
//! ## Command format
//!
//! Every client command starts with a **tag** (async-imap uses
//! `A0001`, `A0002`, ...). The server echoes this tag in its completion
//! response. Lines prefixed with `*` are untagged data sent before the
//! final tagged OK/NO/BAD:
//!
//! ```text
//!   Client:  A0003 SEARCH UNSEEN
//!   Server:  * SEARCH 2 4
//!   Server:  A0003 OK SEARCH completed
//! ```
//!
//! The server records the name of every command it receives so tests
//! can assert on what the client sent (or did not send).

use super::handlers::{
    StoreArgs, handle_fetch, handle_list, handle_login, handle_logout,
    handle_search, handle_select, handle_store,
};
use super::io::write_line;
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

type Journal = Arc<Mutex<Vec<String>>>;

/// A fake IMAP server on localhost with an OS-assigned port.
///
/// Every server generates a self-signed certificate for `127.0.0.1`
/// with `rcgen`. Servers from [`start`](Self::start) speak plain TCP;
/// servers from [`start_tls`](Self::start_tls) expect a TLS handshake
/// first and present that certificate.
pub struct FakeImapServer {
    port: u16,
    cert_pem: String,
    mailbox: Arc<Mutex<Mailbox>>,
    journal: Journal,
    /// Handle to the background task so it lives as long as the server.
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a plaintext server with the given account state.
    pub async fn start(mailbox: Mailbox) -> Self {
        Self::spawn(mailbox, false).await
    }

    /// Start an implicit-TLS server with the given account state.
    pub async fn start_tls(mailbox: Mailbox) -> Self {
        Self::spawn(mailbox, true).await
    }

    async fn spawn(mailbox: Mailbox, tls: bool) -> Self {
        // Multiple tests may race to install the provider; only the
        // first install wins and the rest are no-ops.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_pem = cert.cert.pem();
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");
        let acceptor = tls.then(|| TlsAcceptor::from(Arc::new(tls_config)));

        let mailbox = Arc::new(Mutex::new(mailbox));
        let journal = Journal::default();

        let handle = {
            let mailbox = mailbox.clone();
            let journal = journal.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _addr)) = listener.accept().await else {
                        break;
                    };
                    let acceptor = acceptor.clone();
                    let mailbox = mailbox.clone();
                    let journal = journal.clone();
                    tokio::spawn(async move {
                        match acceptor {
                            Some(acceptor) => {
                                let Ok(tls_stream) = acceptor.accept(stream).await else {
                                    return;
                                };
                                handle_imap_session(tls_stream, &mailbox, &journal).await;
                            }
                            None => handle_imap_session(stream, &mailbox, &journal).await,
                        }
                    });
                }
            })
        };

        Self {
            port,
            cert_pem,
            mailbox,
            journal,
            _handle: handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` for the client's `server` setting.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// The server certificate, PEM encoded, for use as a CA file.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// Names of all commands received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// How often `command` was received.
    pub fn count_of(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    /// Wait up to a second for `command` to show up in the journal.
    ///
    /// A client whose parser already failed may return before the
    /// server task has read its final command.
    pub async fn received(&self, command: &str) -> bool {
        for _ in 0..100 {
            if self.count_of(command) > 0 {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    /// A snapshot of the current account state.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.lock().unwrap().clone()
    }
}

/// Extract the folder name from a parsed `imap_types::Mailbox`.
fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// The command name of a raw line, e.g. `SEARCH` for `A3 SEARCH SEEN`.
fn command_name(line: &str) -> Option<String> {
    line.split_whitespace().nth(1).map(str::to_uppercase)
}

/// Greet the client, then run the IMAP command loop.
///
/// Uses `imap-codec`'s `CommandCodec` to parse each client command
/// into a strongly-typed `Command`, then dispatches to the handler for
/// its `CommandBody` variant. Read handlers receive a snapshot taken
/// under lock; STORE receives the `Mutex` and locks briefly to mutate.
#[allow(clippy::too_many_lines)]
async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    mailbox: &Mutex<Mailbox>,
    journal: &Mutex<Vec<String>>,
) {
    let mut reader = BufReader::new(stream);

    // RFC 3501 Section 7.1.1: Server greeting
    if write_line(&mut reader, "* OK IMAP4rev1 Fake server ready\r\n")
        .await
        .is_err()
    {
        return;
    }

    let mut authenticated = false;
    let mut selected_folder: Option<String> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(name) = command_name(trimmed) {
            journal.lock().unwrap().push(name);
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            let resp = format!("{tag} BAD Parse error\r\n");
            if write_line(&mut reader, &resp).await.is_err() {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();
        let snap = mailbox.lock().unwrap().clone();

        match command.body {
            CommandBody::Login {
                ref username,
                ref password,
            } => {
                authenticated =
                    handle_login(tag, username.as_ref(), password.declassify().as_ref(), &mut reader)
                        .await;
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ if !authenticated => {
                let resp = format!("{tag} BAD Not authenticated\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
            CommandBody::List { .. } => {
                handle_list(tag, &snap, &mut reader).await;
            }
            CommandBody::Select { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selected_folder = handle_select(tag, &name, &snap, &mut reader).await;
            }
            CommandBody::Search {
                criteria,
                uid: false,
                ..
            } => {
                handle_search(
                    tag,
                    criteria.as_ref(),
                    &snap,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: false,
                ..
            } => {
                handle_fetch(
                    tag,
                    &sequence_set,
                    &snap,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Store {
                ref sequence_set,
                uid: false,
                ref kind,
                ref response,
                ref flags,
                ..
            } => {
                let args = StoreArgs {
                    sequence_set,
                    kind,
                    response,
                    flags,
                };
                handle_store(
                    tag,
                    &args,
                    mailbox,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_name_is_second_token() {
        assert_eq!(command_name("A3 search SEEN").as_deref(), Some("SEARCH"));
        assert_eq!(command_name("A1 LOGOUT").as_deref(), Some("LOGOUT"));
        assert_eq!(command_name("A1"), None);
    }
}
