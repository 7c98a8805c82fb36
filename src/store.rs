//! Flag updates
//!
//! The only mutation this crate performs is adding `\Seen`.

use crate::error::{Error, Result};
use crate::query::IdSet;
use crate::session::SelectedMailbox;
use tracing::debug;

/// The IMAP system flag for read messages.
pub const SEEN_FLAG: &str = "\\Seen";

/// Additive, silent store of `\Seen`. Other flags are left alone and
/// the server is asked not to echo the new flag state back.
fn add_seen_query() -> String {
    format!("+FLAGS.SILENT ({SEEN_FLAG})")
}

impl SelectedMailbox<'_> {
    /// Add `\Seen` to every message in `ids` with one STORE.
    ///
    /// Returns the number of messages targeted. An empty set is a no-op
    /// that never reaches the server. Marking an already seen message
    /// again leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MarkSeen`] carrying the number of targeted
    /// messages if the STORE fails or the server refuses it.
    pub async fn mark_seen(&mut self, ids: &IdSet) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let count = ids.len();
        debug!("Mark {} messages as seen", count);

        self.imap()
            .run_command_and_check_ok(format!(
                "STORE {} {}",
                ids.to_sequence_set(),
                add_seen_query()
            ))
            .await
            .map_err(|e| Error::MarkSeen {
                count,
                detail: e.to_string(),
            })?;

        Ok(count)
    }
}
