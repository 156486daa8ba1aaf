//! Open-tab notification contract used by content writers outside the
//! workspace (search & replace).
//!
//! Writers flush before they read, so a dirty tab's buffer is what gets
//! scanned and rewritten, never the stale stored copy.

use crate::kernel::services::ports::storage::Result;
use crate::models::ItemId;

pub trait OpenTabSync: Send + Sync {
    /// Persists the tab for `file_id` if it holds unsaved edits.
    fn flush_if_dirty(&self, file_id: &ItemId) -> Result<bool>;

    /// Persists every dirty tab; returns how many were written.
    fn flush_all_dirty(&self) -> Result<usize>;

    /// Pushes freshly persisted `content` into the open tab for `file_id`.
    /// Returns `false` when no tab is open for it.
    fn sync_external_content(&self, file_id: &ItemId, content: &str) -> bool;
}
