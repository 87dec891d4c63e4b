//! Error types for the page cache.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the buffer pool reports to its callers.
///
/// Nothing is retried internally; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the disk backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No free frame and nothing evictable: every frame is pinned.
    #[error("buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    /// The page is not currently cached.
    #[error("{0} is not resident in the buffer pool")]
    NotResident(PageId),

    /// Unpin was called more times than pin.
    #[error("{0} is not pinned")]
    NotPinned(PageId),

    /// Delete was attempted while the page is pinned.
    #[error("{0} is pinned and cannot be deleted")]
    PageBusy(PageId),

    /// The id is the invalid sentinel or was never allocated by this pool.
    #[error("{0} was never allocated")]
    InvalidPageId(PageId),

    /// Another caller's disk read for this page failed while we waited on it.
    #[error("loading {0} from disk failed")]
    LoadFailed(PageId),

    /// The disk scheduler worker has shut down.
    #[error("disk scheduler is closed")]
    SchedulerClosed,
}
