#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for counting, listing and marking messages on an IMAP server

use checkmail::render::{Palette, Renderer, terminal_width};
use checkmail::{CountScope, ListScope, Settings, expand_path};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkmail", version)]
#[command(about = "Check an IMAP server for un-/seen messages and count or list them")]
#[command(after_help = "\
Without a command, checkmail counts the messages in the mailbox.
To mark all messages as seen use the command 'touch'.
The command 'list boxes' shows all available mailboxes.

The password is read from the config-file (default
~/.config/checkmail/checkmail.toml) or from IMAP_PASSWORD.")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Select the IMAP server and port
    #[arg(short, long, value_name = "HOST:PORT", global = true)]
    server: Option<String>,

    /// Use an unencrypted connection
    #[arg(short = 't', long, global = true)]
    no_tls: bool,

    /// Log in as USER
    #[arg(short, long, value_name = "USER", global = true)]
    user: Option<String>,

    /// Select mailbox (default is INBOX)
    #[arg(short, long, value_name = "BOX", global = true)]
    mailbox: Option<String>,

    /// Trust the CA certificates in this PEM file as well
    #[arg(long, value_name = "PEM", global = true)]
    ca_file: Option<String>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show debugging information
    #[arg(short, long, global = true)]
    debug: bool,

    /// Disable ANSI colors
    #[arg(short, long, global = true)]
    no_colors: bool,

    /// Load another config-file
    #[arg(short, long, value_name = "CFGFILE", global = true)]
    file: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Count messages in the mailbox
    Count {
        #[arg(value_enum, default_value_t = CountArg::All)]
        scope: CountArg,
    },

    /// List messages or mailboxes
    List {
        #[arg(value_enum, default_value_t = ListArg::Unseen)]
        scope: ListArg,
    },

    /// Mark all messages as seen
    Touch,
}

#[derive(Clone, Copy, ValueEnum)]
enum CountArg {
    All,
    Seen,
    Unseen,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    #[value(alias = "mailboxes", alias = "box", alias = "mailbox")]
    Boxes,
    Unseen,
    Seen,
    All,
}

impl From<CountArg> for CountScope {
    fn from(arg: CountArg) -> Self {
        match arg {
            CountArg::All => Self::All,
            CountArg::Seen => Self::Seen,
            CountArg::Unseen => Self::Unseen,
        }
    }
}

impl From<ListArg> for ListScope {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Boxes => Self::Mailboxes,
            ListArg::Unseen => Self::Unseen,
            ListArg::Seen => Self::Seen,
            ListArg::All => Self::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = match load_settings(&args)?.resolve() {
        Ok(config) => config,
        Err(e) => usage_error(&e.to_string()),
    };

    let renderer = Renderer::new(
        Palette::detect(args.no_colors),
        args.verbose,
        terminal_width(),
    );
    let mut out = io::stdout().lock();

    match args.command.unwrap_or(Command::Count {
        scope: CountArg::All,
    }) {
        Command::Count { scope } => {
            let report = checkmail::commands::count(&config, scope.into()).await?;
            if args.json {
                print_json(&mut out, &report)?;
            } else {
                renderer.count(&mut out, &report, &config.mailbox, &config.username)?;
            }
        }
        Command::List { scope } => {
            let report = checkmail::commands::list(&config, scope.into()).await?;
            if args.json {
                print_json(&mut out, &report)?;
            } else {
                renderer.list(&mut out, &report, &config.username)?;
            }
        }
        Command::Touch => {
            let report = checkmail::commands::touch(&config).await?;
            if args.json {
                print_json(&mut out, &report)?;
            } else {
                renderer.touch(&mut out, &report)?;
            }
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "checkmail=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Config file, then environment, then command-line flags.
fn load_settings(args: &Args) -> anyhow::Result<Settings> {
    let file = match &args.file {
        Some(path) => Settings::from_file(&expand_path(path), true)?,
        None => match Settings::default_path() {
            Some(path) => Settings::from_file(&path, false)?,
            None => Settings::default(),
        },
    };

    let flags = Settings {
        server: args.server.clone(),
        user: args.user.clone(),
        password: None,
        mailbox: args.mailbox.clone(),
        no_tls: args.no_tls.then_some(true),
        ca_file: args.ca_file.as_deref().map(expand_path),
    };

    Ok(file.merge(Settings::from_env()?).merge(flags))
}

/// Report a usage problem the way clap does and exit before any
/// connection is made.
fn usage_error(msg: &str) -> ! {
    Args::command()
        .error(ErrorKind::MissingRequiredArgument, msg)
        .exit()
}

fn print_json<T: Serialize>(out: &mut impl Write, report: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}
