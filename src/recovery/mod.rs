//! Write-ahead-log integration.
//!
//! The buffer pool only needs one thing from the log: before a dirty page is
//! written to disk, every log record describing changes to that page must
//! already be on stable storage. [`LogManager`] is that hook.

use crate::common::{PageId, Result};

/// Durability hook consulted before every dirty page write.
pub trait LogManager: Send + Sync {
    /// Force log records covering `page_id` to stable storage.
    ///
    /// An error aborts the page write and is returned to the caller that
    /// triggered it.
    fn flush_for_page(&self, page_id: PageId) -> Result<()>;
}
