//! RAII guards for page access.
//!
//! Every guard owns exactly one pin on its frame:
//! - [`BasicPageGuard`] - pin only; content locks are taken per call
//! - [`ReadPageGuard`] - pin plus the shared content lock
//! - [`WritePageGuard`] - pin plus the exclusive content lock, always dirty
//!
//! Dropping a guard (or calling `release`) unpins the page with the guard's
//! dirty intent and then releases any content lock it holds. Guards are
//! move-only, so a pin cannot be released twice.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::{BufferPoolManager, Frame};
use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

/// A pinned page without a held content lock.
///
/// # Example
/// ```
/// use pagecache::{BufferPoolManager, MemoryDisk};
///
/// let bpm = BufferPoolManager::new(4, MemoryDisk::new()).unwrap();
/// let page_id = bpm.new_page().unwrap().page_id();
///
/// let mut guard = bpm.fetch_page(page_id).unwrap();
/// guard.data_mut().as_mut_slice()[0] = 1; // records dirty intent
/// assert_eq!(guard.data().as_slice()[0], 1);
/// drop(guard); // unpinned as dirty
///
/// assert_eq!(bpm.is_dirty(page_id), Some(true));
/// ```
///
/// Content locks borrow the guard, so they cannot outlive its pin:
/// ```compile_fail
/// use pagecache::{BufferPoolManager, MemoryDisk};
///
/// let bpm = BufferPoolManager::new(4, MemoryDisk::new()).unwrap();
/// let guard = bpm.new_page().unwrap();
/// let content = guard.data();
/// drop(guard);
/// let _ = content.as_slice()[0];
/// ```
pub struct BasicPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
}

impl<'a> BasicPageGuard<'a> {
    /// Wrap a pin the manager has already taken.
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Shared access to the content while the returned lock lives. The lock
    /// borrows the guard, so the page stays pinned underneath it.
    pub fn data(&self) -> RwLockReadGuard<'_, Page> {
        self.frame().page()
    }

    /// Exclusive access to the content. Marks the guard dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.frame().page_mut()
    }

    /// Unpin as dirty when released.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Keep the pin and take the shared content lock.
    pub fn upgrade_read(self) -> ReadPageGuard<'a> {
        let lock = self.frame().page();
        ReadPageGuard { guard: self, lock }
    }

    /// Keep the pin and take the exclusive content lock.
    pub fn upgrade_write(mut self) -> WritePageGuard<'a> {
        self.is_dirty = true;
        let lock = self.frame().page_mut();
        WritePageGuard { guard: self, lock }
    }

    /// Unpin now instead of at end of scope.
    #[inline]
    pub fn release(self) {}

    #[inline]
    fn frame(&self) -> &'a Frame {
        self.bpm.frame(self.frame_id)
    }
}

impl Drop for BasicPageGuard<'_> {
    fn drop(&mut self) {
        self.bpm.release_guard(self.page_id, self.is_dirty);
    }
}

impl std::fmt::Debug for BasicPageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicPageGuard")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

/// A pinned page held under the shared content lock.
///
/// Any number of read guards may coexist on one page.
pub struct ReadPageGuard<'a> {
    // Field order is drop order: unpin, then unlock.
    guard: BasicPageGuard<'a>,
    lock: RwLockReadGuard<'a, Page>,
}

impl ReadPageGuard<'_> {
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.guard.frame_id
    }

    #[inline]
    pub fn release(self) {}
}

impl Deref for ReadPageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

/// A pinned page held under the exclusive content lock.
///
/// The page is unpinned as dirty.
pub struct WritePageGuard<'a> {
    // Field order is drop order: unpin, then unlock.
    guard: BasicPageGuard<'a>,
    lock: RwLockWriteGuard<'a, Page>,
}

impl WritePageGuard<'_> {
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.guard.frame_id
    }

    #[inline]
    pub fn release(self) {}
}

impl Deref for WritePageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for WritePageGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}
