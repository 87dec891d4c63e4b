//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one [`Page`] of content plus the metadata the pool needs:
//! which page is resident, how many callers pin it, and whether it diverges
//! from disk.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// # Thread Safety
/// - `page`: content lock, taken by read/write guards
/// - `load_latch`: held by the thread filling the frame from disk, so other
///   callers that pinned the frame meanwhile can wait for the load to finish
/// - `page_id`, `pin_count`: only changed while the pool's structural lock is
///   held; the atomics let guards and tests read them without it
/// - `is_dirty`: set on unpin, cleared by flush and eviction
pub struct Frame {
    page: RwLock<Page>,
    load_latch: Mutex<()>,
    page_id: Mutex<Option<PageId>>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    /// An empty frame holding a zeroed page.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            load_latch: Mutex::new(()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Content lock
    // ========================================================================

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Take the load latch. Held for the duration of a disk load.
    #[inline]
    pub(crate) fn lock_load(&self) -> MutexGuard<'_, ()> {
        self.load_latch.lock()
    }

    /// Block until any in-flight load of this frame has finished.
    #[inline]
    pub(crate) fn wait_loaded(&self) {
        drop(self.load_latch.lock());
    }

    // ========================================================================
    // Resident page
    // ========================================================================

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub(crate) fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new count, or `None` if the frame
    /// was not pinned; the count never goes below zero.
    #[inline]
    pub(crate) fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|old| old - 1)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag
    // ========================================================================

    #[inline]
    pub(crate) fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    /// Clear the dirty flag, returning whether it was set.
    #[inline]
    pub(crate) fn take_dirty(&self) -> bool {
        self.is_dirty.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// True when no page is resident.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.page_id().is_none()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("is_dirty", &self.is_dirty())
            .finish()
    }
}
