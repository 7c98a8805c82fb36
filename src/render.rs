//! Terminal output for command reports
//!
//! All presentation policy (colors, verbosity, terminal width) lives in
//! a [`Renderer`] value built once by the binary and passed around.

use crate::commands::{CountReport, ListReport, TouchReport};
use crate::fetch::Envelope;
use crate::mailbox::MailboxName;
use std::io::{self, IsTerminal, Write};

const DATE_WIDTH: usize = 10;
const MAX_SENDER_WIDTH: usize = 40;
const MIN_SUBJECT_WIDTH: usize = 15;
const DEFAULT_WIDTH: usize = 80;

/// Role of a piece of output, mapped to a color by [`Palette`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tint {
    Date,
    Address,
    Total,
    Unseen,
    Seen,
}

impl Tint {
    /// ANSI SGR parameters.
    const fn sgr(self) -> &'static str {
        match self {
            Self::Date => "33",
            Self::Address | Self::Total => "32",
            Self::Unseen => "31",
            Self::Seen => "90",
        }
    }
}

/// Whether output gets ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self::new(false)
    }

    /// Colors unless disabled by flag, by `NO_COLOR`, or because stdout
    /// is not a terminal.
    #[must_use]
    pub fn detect(no_colors: bool) -> Self {
        let enabled = !no_colors
            && std::env::var_os("NO_COLOR").is_none_or(|v| v.is_empty())
            && io::stdout().is_terminal();
        Self::new(enabled)
    }

    fn paint(self, tint: Tint, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{text}\x1b[0m", tint.sgr())
        } else {
            text.to_string()
        }
    }
}

/// Terminal width from `COLUMNS`, or 80 when unset or implausible.
#[must_use]
pub fn terminal_width() -> usize {
    width_from(std::env::var("COLUMNS").ok().as_deref())
}

fn width_from(columns: Option<&str>) -> usize {
    columns
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|w| (20..=200).contains(w))
        .unwrap_or(DEFAULT_WIDTH)
}

/// Truncate to `max` characters, marking the cut with `...`.
///
/// Widths of five or less are left alone; there is no room for a
/// useful prefix.
#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max || max <= 5 {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{truncated}...")
    }
}

/// Left-align `s` in exactly `width` characters, truncating if longer.
#[must_use]
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len > width {
        truncate(s, width)
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

/// Writes reports as text.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    palette: Palette,
    verbose: bool,
    width: usize,
}

impl Renderer {
    #[must_use]
    pub const fn new(palette: Palette, verbose: bool, width: usize) -> Self {
        Self {
            palette,
            verbose,
            width,
        }
    }

    fn number(&self, n: usize, tint: Tint) -> String {
        self.palette.paint(tint, &n.to_string())
    }

    /// Plain: `unseen/total`, or the single requested count.
    /// Verbose: a `mailbox of user:` header, then labelled counts.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn count(
        &self,
        out: &mut impl Write,
        report: &CountReport,
        mailbox: &MailboxName,
        user: &str,
    ) -> io::Result<()> {
        let seen = report.seen.map(|n| self.number(n, Tint::Seen));
        let unseen = report.unseen.map(|n| self.number(n, Tint::Unseen));
        let total = report.total().map(|n| self.number(n, Tint::Total));

        if self.verbose {
            writeln!(
                out,
                "{} of {}:",
                self.palette.paint(Tint::Address, mailbox.as_str()),
                self.palette.paint(Tint::Address, user)
            )?;
            let parts: Vec<String> = [("seen", seen), ("unseen", unseen), ("total", total)]
                .into_iter()
                .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
                .collect();
            return writeln!(out, "{}", parts.join(", "));
        }

        match (seen, unseen, total) {
            (_, Some(unseen), Some(total)) => writeln!(out, "{unseen}/{total}"),
            (Some(seen), _, _) => writeln!(out, "{seen}"),
            (_, Some(unseen), _) => writeln!(out, "{unseen}"),
            (None, None, _) => Ok(()),
        }
    }

    /// Mailbox names one per line, or a date / sender / subject table.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn list(&self, out: &mut impl Write, report: &ListReport, user: &str) -> io::Result<()> {
        match report {
            ListReport::Mailboxes(names) => {
                if self.verbose {
                    writeln!(out, "Mailboxes of {user}:")?;
                }
                for name in names {
                    writeln!(out, "{name}")?;
                }
                Ok(())
            }
            ListReport::Messages(envelopes) => self.message_table(out, envelopes),
        }
    }

    fn message_table(&self, out: &mut impl Write, envelopes: &[Envelope]) -> io::Result<()> {
        if envelopes.is_empty() {
            return writeln!(out, "No messages found.");
        }

        let senders: Vec<String> = envelopes.iter().map(Envelope::sender).collect();
        let sender_width = senders
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
            .min(MAX_SENDER_WIDTH);
        let subject_width = self
            .width
            .saturating_sub(sender_width + 1 + DATE_WIDTH + 1)
            .max(MIN_SUBJECT_WIDTH);

        for (env, sender) in envelopes.iter().zip(&senders) {
            let date = env
                .date
                .map_or_else(|| " ".repeat(DATE_WIDTH), |d| d.format("%d.%m.%Y").to_string());
            writeln!(
                out,
                "{} {} {}",
                self.palette.paint(Tint::Date, &date),
                self.palette.paint(Tint::Address, &pad(sender, sender_width)),
                truncate(&env.subject, subject_width)
            )?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates write errors.
    pub fn touch(&self, out: &mut impl Write, report: &TouchReport) -> io::Result<()> {
        if report.marked == 0 {
            writeln!(out, "No unseen messages to mark.")
        } else {
            writeln!(out, "{} messages marked as seen", report.marked)
        }
    }
}
