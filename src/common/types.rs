//! Identifier newtypes.

use std::fmt;

/// Identifies a logical page on persistent storage.
///
/// Page ids are handed out monotonically by the buffer pool and are never
/// reused while the engine runs. Page `N` lives at byte offset
/// `N * PAGE_SIZE` in a file-backed store.
///
/// # Example
/// ```
/// use pagecache::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.next(), PageId::new(43));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel meaning "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// The id allocated right after this one.
    #[inline]
    pub fn next(&self) -> PageId {
        PageId(self.0 + 1)
    }

    /// Byte offset of this page in a page-per-slot file.
    #[inline]
    pub fn file_offset(&self, page_size: usize) -> u64 {
        u64::from(self.0) * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Page({})", self.0)
        } else {
            write!(f, "Page(INVALID)")
        }
    }
}

/// Stable index of a frame in the pool's frame arena, in `[0, pool_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}
