//! IMAP connection configuration
//!
//! Settings are gathered in layers (config file, environment,
//! command line) as partial [`Settings`], merged, and finally resolved
//! into an [`ImapConfig`] that the session code trusts as-is.

use crate::error::{Error, Result};
use crate::mailbox::MailboxName;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_TLS_PORT: u16 = 993;
const DEFAULT_PLAIN_PORT: u16 = 143;

/// How the transport is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Implicit TLS with certificate validation.
    #[default]
    Tls,
    /// Unencrypted TCP. Only used when explicitly requested.
    Plaintext,
}

/// Resolved IMAP connection configuration.
#[derive(Clone)]
pub struct ImapConfig {
    /// `host:port`; the port may be omitted.
    pub server: String,
    pub username: String,
    pub password: String,
    pub mailbox: MailboxName,
    pub security: Security,
    /// Extra PEM trust anchors on top of the bundled web PKI roots.
    pub ca_file: Option<PathBuf>,
}

impl ImapConfig {
    /// The host part of `server`, without port or IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        split_server(&self.server).0
    }

    /// `host:port` to dial, filling in the default port for the
    /// configured security when none was given.
    #[must_use]
    pub fn address(&self) -> String {
        match split_server(&self.server) {
            (_, Some(_)) => self.server.clone(),
            (host, None) => {
                let port = match self.security {
                    Security::Tls => DEFAULT_TLS_PORT,
                    Security::Plaintext => DEFAULT_PLAIN_PORT,
                };
                if host.contains(':') {
                    format!("[{host}]:{port}")
                } else {
                    format!("{host}:{port}")
                }
            }
        }
    }
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("security", &self.security)
            .field("ca_file", &self.ca_file)
            .finish()
    }
}

/// Split `host:port`, `[v6]:port`, `host` or a bare IPv6 address.
fn split_server(server: &str) -> (&str, Option<&str>) {
    if let Some(rest) = server.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            return (host, tail.strip_prefix(':').filter(|p| !p.is_empty()));
        }
    }
    match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, Some(port)),
        _ => (server, None),
    }
}

/// One layer of partially specified settings.
///
/// The same shape is read from the TOML config file, from the
/// environment and from command-line flags.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub mailbox: Option<String>,
    pub no_tls: Option<bool>,
    pub ca_file: Option<PathBuf>,
}

impl Settings {
    /// `$XDG_CONFIG_HOME/checkmail/checkmail.toml` or the platform
    /// equivalent.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("checkmail").join("checkmail.toml"))
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from a TOML file.
    ///
    /// A missing file yields empty settings unless `required` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is required but missing,
    /// unreadable, or not valid config.
    pub fn from_file(path: &Path, required: bool) -> Result<Self> {
        debug!("Load config-file {:?}", path);

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!("Config-file not found: {:?}", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to load config-file {}: {e}",
                    path.display()
                )));
            }
        };

        toml::from_str(&text).map_err(|e| {
            Error::Config(format!("Error in config-file {}: {e}", path.display()))
        })
    }

    /// Load settings from the process environment.
    ///
    /// Reads from `.env` file if present. Recognised variables:
    /// - `IMAP_SERVER`
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    /// - `IMAP_MAILBOX`
    /// - `IMAP_NO_TLS` (`1`/`true`/`yes` or `0`/`false`/`no`)
    /// - `IMAP_CA_FILE`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `IMAP_NO_TLS` is not a boolean.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let no_tls = lookup("IMAP_NO_TLS")
            .map(|v| {
                parse_bool(&v).ok_or_else(|| Error::Config(format!("Invalid IMAP_NO_TLS: {v:?}")))
            })
            .transpose()?;

        Ok(Self {
            server: lookup("IMAP_SERVER"),
            user: lookup("IMAP_USERNAME"),
            password: lookup("IMAP_PASSWORD"),
            mailbox: lookup("IMAP_MAILBOX"),
            no_tls,
            ca_file: lookup("IMAP_CA_FILE").map(PathBuf::from),
        })
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            server: other.server.or(self.server),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            mailbox: other.mailbox.or(self.mailbox),
            no_tls: other.no_tls.or(self.no_tls),
            ca_file: other.ca_file.or(self.ca_file),
        }
    }

    /// Validate the merged settings and produce an [`ImapConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing value among
    /// server, user and password.
    pub fn resolve(self) -> Result<ImapConfig> {
        let server = non_empty(self.server)
            .ok_or_else(|| missing("No server given (in config-file or with --server)"))?;
        let username = non_empty(self.user)
            .ok_or_else(|| missing("No user given (in config-file or with --user)"))?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| missing("No password given (in config-file)"))?;

        let mailbox = non_empty(self.mailbox).map(MailboxName::new).unwrap_or_default();
        let security = if self.no_tls.unwrap_or(false) {
            Security::Plaintext
        } else {
            Security::Tls
        };

        Ok(ImapConfig {
            server,
            username,
            password,
            mailbox,
            security,
            ca_file: self.ca_file.map(|p| expand_path(&p.to_string_lossy())),
        })
    }
}

/// Expand a leading `~` (and `~user`) in a path.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn missing(msg: &str) -> Error {
    Error::Config(msg.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
