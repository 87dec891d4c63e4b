//! Page - the raw unit of I/O between disk and memory.
//!
//! A [`Page`] is an opaque PAGE_SIZE byte array. The buffer pool never
//! interprets its contents; record and index layouts belong to higher layers.

use crate::common::config::PAGE_SIZE;

/// One page of raw bytes, aligned for direct I/O.
///
/// `Page` is deliberately not `Clone`: copying a page should be explicit,
/// via [`Page::copy_from`].
///
/// # Example
/// ```
/// use pagecache::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// page.reset();
/// assert!(page.is_zeroed());
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// A zero-filled page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// A zero-filled page allocated directly on the heap.
    pub fn boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite this page with `other`'s bytes.
    #[inline]
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Zero the whole page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("len", &PAGE_SIZE)
            .field("head", &&self.data[..16])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_alignment() {
        assert_eq!(std::mem::align_of::<Page>(), 4096);
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);

        let page = Page::boxed();
        assert_eq!(page.as_slice().as_ptr() as usize % 4096, 0);
    }

    #[test]
    fn test_copy_from() {
        let mut src = Page::new();
        src.as_mut_slice()[PAGE_SIZE - 1] = 0x7E;

        let mut dst = Page::new();
        dst.copy_from(&src);
        assert_eq!(dst.as_slice()[PAGE_SIZE - 1], 0x7E);
        assert!(!dst.is_zeroed());
    }
}
