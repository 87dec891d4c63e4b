//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory over a fixed frame arena
//! - Pin-based reference counting through RAII guards
//! - LRU-K eviction with dirty write-back before frame reuse
//! - Disk I/O through the asynchronous [`DiskScheduler`], awaited in-call

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, error, trace, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BasicPageGuard, Frame, PoolStats, ReadPageGuard, WritePageGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::page::Page;
use crate::storage::{DiskIo, DiskScheduler};

/// Bookkeeping guarded by the structural lock.
struct PoolState {
    /// Resident pages. Every entry's frame has that page id.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page, handed out before anything is evicted.
    free_list: VecDeque<FrameId>,
}

/// How a freshly claimed frame gets its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Zeroed,
    FromDisk,
}

/// Caches a bounded number of pages in memory.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                      BufferPoolManager                       │
/// │  ┌─────────────── state: Mutex ───────────────┐              │
/// │  │ page_table: PageId → FrameId │ free_list   │              │
/// │  └─────────────────────────────────────────────┘              │
/// │         │                                                    │
/// │         ▼                                                    │
/// │  frames: Vec<Frame>  [F0] [F1] [F2] ...  (per-frame RwLock)  │
/// │                                                              │
/// │  replacer: LruKReplacer (own lock)   scheduler: DiskScheduler│
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - The structural lock (`state`) covers the page table, the free list and
///   every pin count change. It is never held across disk I/O.
/// - The replacer locks internally and is only called with `state` held, so
///   pinning a frame and marking it non-evictable is atomic.
/// - Each frame's content lock is taken by guards, independently of `state`.
/// - A frame being filled from disk, or whose dirty page is being written
///   back before reuse, holds its load latch; callers that pin it meanwhile
///   wait on the latch before touching the content.
/// - The load latch is only taken under `state` on an unpinned frame, and
///   `state` may be taken while holding a latch.
///
/// # Usage
/// ```
/// use pagecache::{BufferPoolManager, MemoryDisk};
///
/// let bpm = BufferPoolManager::new(8, MemoryDisk::new()).unwrap();
///
/// let page_id = {
///     let mut guard = bpm.new_page_guarded().unwrap();
///     guard.as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// };
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Fixed frame arena, addressed by `FrameId`.
    frames: Vec<Frame>,

    state: Mutex<PoolState>,

    replacer: LruKReplacer,

    scheduler: DiskScheduler,

    /// Forced before any dirty page is written.
    log_manager: Option<Arc<dyn LogManager>>,

    next_page_id: AtomicU32,

    stats: PoolStats,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames over `disk` with the default K.
    ///
    /// # Errors
    /// Fails if the disk worker thread cannot be spawned.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new<D: DiskIo + 'static>(pool_size: usize, disk: D) -> Result<Self> {
        Self::with_config(BufferPoolConfig::new(pool_size), disk)
    }

    /// Create a pool from an explicit configuration.
    pub fn with_config<D: DiskIo + 'static>(config: BufferPoolConfig, disk: D) -> Result<Self> {
        Ok(Self::with_scheduler(config, DiskScheduler::new(disk)?))
    }

    /// Create a pool over an already running scheduler.
    ///
    /// Page ids are allocated starting after the last page the backend held
    /// when the scheduler started.
    ///
    /// # Panics
    /// Panics if `config.pool_size` or `config.replacer_k` is 0.
    pub fn with_scheduler(config: BufferPoolConfig, scheduler: DiskScheduler) -> Self {
        assert!(config.pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..config.pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();
        let first_page_id = scheduler.initial_page_count();

        debug!(
            "buffer pool created: {} frames, k={}, next page id {}",
            config.pool_size, config.replacer_k, first_page_id
        );

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(config.pool_size),
                free_list,
            }),
            replacer: LruKReplacer::new(config.pool_size, config.replacer_k),
            scheduler,
            log_manager: None,
            next_page_id: AtomicU32::new(first_page_id),
            stats: PoolStats::new(),
        }
    }

    /// Install the durability hook consulted before dirty page writes.
    pub fn with_log_manager(mut self, log_manager: Arc<dyn LogManager>) -> Self {
        self.log_manager = Some(log_manager);
        self
    }

    // ========================================================================
    // Public API: create pages
    // ========================================================================

    /// Allocate a new page id and a zeroed frame for it.
    ///
    /// The returned guard holds the page's only pin.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned; no id is consumed
    /// - I/O errors from writing back the evicted victim
    pub fn new_page(&self) -> Result<BasicPageGuard<'_>> {
        let state = self.state.lock();
        if state.free_list.is_empty() && self.replacer.size() == 0 {
            warn!("new_page: all {} frames pinned", self.frames.len());
            return Err(Error::PoolExhausted);
        }

        let page_id = PageId::new(self.next_page_id.fetch_add(1, Ordering::Relaxed));
        let frame_id = self.install_page(state, page_id, Fill::Zeroed)?;
        trace!("allocated {} in {}", page_id, frame_id);

        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// [`new_page`](Self::new_page), returned under the exclusive content lock.
    pub fn new_page_guarded(&self) -> Result<WritePageGuard<'_>> {
        Ok(self.new_page()?.upgrade_write())
    }

    // ========================================================================
    // Public API: fetch pages
    // ========================================================================

    /// Pin `page_id`, reading it from disk if it is not resident.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for ids this pool never allocated
    /// - `Error::PoolExhausted` on a miss with every frame pinned
    /// - `Error::Io` if the read (or the victim's write-back) failed
    /// - `Error::LoadFailed` if another caller's read of the same page failed
    ///   while this one waited for it
    pub fn fetch_page(&self, page_id: PageId) -> Result<BasicPageGuard<'_>> {
        let frame_id = self.pin_page(page_id)?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Same as [`fetch_page`](Self::fetch_page).
    #[inline]
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<BasicPageGuard<'_>> {
        self.fetch_page(page_id)
    }

    /// Pin `page_id` and hold its content lock in shared mode.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard<'_>> {
        Ok(self.fetch_page(page_id)?.upgrade_read())
    }

    /// Pin `page_id` and hold its content lock in exclusive mode.
    /// The page is unpinned dirty.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard<'_>> {
        Ok(self.fetch_page(page_id)?.upgrade_write())
    }

    // ========================================================================
    // Public API: unpin, flush, delete
    // ========================================================================

    /// Drop one pin on a resident page, OR-ing `is_dirty` into its dirty flag.
    ///
    /// Guards call this on release. Calling it directly for a pin a guard
    /// still owns makes that guard's own release fail.
    ///
    /// # Errors
    /// - `Error::NotResident` if the page is not cached
    /// - `Error::NotPinned` if its pin count is already zero
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let mut state = self.state.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::NotResident(page_id))?;

        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            return Err(Error::NotPinned(page_id));
        }
        if is_dirty {
            frame.mark_dirty();
        }
        self.unpin_locked(&mut state, frame_id);

        Ok(())
    }

    /// Write a resident page to disk and clear its dirty flag, pinned or not.
    ///
    /// # Errors
    /// - `Error::NotResident` if the page is not cached
    /// - I/O or log-hook errors; the dirty flag is kept on failure
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = {
            let state = self.state.lock();
            let frame_id = *state
                .page_table
                .get(&page_id)
                .ok_or(Error::NotResident(page_id))?;
            // Pin so the frame cannot be repurposed mid-write.
            self.frames[frame_id.0].pin();
            self.replacer.set_evictable(frame_id, false);
            frame_id
        };

        let frame = &self.frames[frame_id.0];
        frame.wait_loaded();
        let result = if frame.page_id() == Some(page_id) {
            self.flush_frame(frame, page_id)
        } else {
            Err(Error::LoadFailed(page_id))
        };

        let mut state = self.state.lock();
        self.unpin_locked(&mut state, frame_id);
        result
    }

    /// Flush every resident page. Failures are logged and the remaining
    /// pages are still attempted.
    pub fn flush_all_pages(&self) {
        let resident: Vec<PageId> = self.state.lock().page_table.keys().copied().collect();

        for page_id in resident {
            match self.flush_page(page_id) {
                // Evicted since the snapshot; eviction wrote it back if dirty.
                Ok(()) | Err(Error::NotResident(_)) => {}
                Err(e) => warn!("flush of {} failed: {}", page_id, e),
            }
        }
    }

    /// Drop an unpinned page from the pool without writing it back.
    ///
    /// The frame is zeroed and returned to the free list. Storage is not
    /// touched; a later fetch of the same id reads it from disk again.
    /// Deleting a page that is not resident succeeds.
    ///
    /// # Errors
    /// `Error::PageBusy` if the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();
        let Some(frame_id) = state.page_table.get(&page_id).copied() else {
            return Ok(());
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PageBusy(page_id));
        }

        state.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.set_page_id(None);
        frame.clear_dirty();
        // Unpinned, so no guard can be holding the content lock for long.
        frame.page_mut().reset();
        state.free_list.push_back(frame_id);

        trace!("deleted {} from {}", page_id, frame_id);
        Ok(())
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of frames the replacer may currently evict.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Pin count of a resident page.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.resident_frame(page_id).map(Frame::pin_count)
    }

    /// Dirty flag of a resident page.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        self.resident_frame(page_id).map(Frame::is_dirty)
    }

    // ========================================================================
    // Internal: used by guards
    // ========================================================================

    #[inline]
    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    /// Release path of every guard.
    pub(crate) fn release_guard(&self, page_id: PageId, is_dirty: bool) {
        if let Err(e) = self.unpin_page(page_id, is_dirty) {
            error!("releasing guard on {} failed: {}", page_id, e);
        }
    }

    // ========================================================================
    // Internal: pinning and loading
    // ========================================================================

    fn resident_frame(&self, page_id: PageId) -> Option<&Frame> {
        let frame_id = *self.state.lock().page_table.get(&page_id)?;
        Some(&self.frames[frame_id.0])
    }

    /// Pin `page_id` into a frame with valid content and return the frame.
    fn pin_page(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() || page_id.0 >= self.next_page_id.load(Ordering::Relaxed) {
            return Err(Error::InvalidPageId(page_id));
        }

        let state = self.state.lock();
        let resident = state.page_table.get(&page_id).copied();
        let Some(frame_id) = resident else {
            self.stats.record_miss();
            trace!("miss on {}", page_id);
            return self.install_page(state, page_id, Fill::FromDisk);
        };

        let frame = &self.frames[frame_id.0];
        frame.pin();
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
        drop(state);
        self.stats.record_hit();

        // The page may still be on its way in from disk.
        frame.wait_loaded();
        if frame.page_id() != Some(page_id) {
            let mut state = self.state.lock();
            self.unpin_locked(&mut state, frame_id);
            return Err(Error::LoadFailed(page_id));
        }

        Ok(frame_id)
    }

    /// Claim a frame for `page_id`, map and pin it, then fill it outside the
    /// structural lock.
    ///
    /// A dirty victim stays mapped, pinned by us and latched while it is
    /// written back, so a concurrent fetch of it waits and then sees the
    /// up-to-date content. If such a fetch pins the victim meanwhile, the
    /// victim is kept and another frame is claimed. If the write-back fails
    /// the victim stays resident and dirty.
    ///
    /// On a failed fill the new mapping is withdrawn and the frame is freed,
    /// so no partial entry stays in the page table.
    fn install_page<'a>(
        &'a self,
        mut state: MutexGuard<'a, PoolState>,
        page_id: PageId,
        fill: Fill,
    ) -> Result<FrameId> {
        loop {
            let frame_id = self.claim_frame(&mut state)?;
            let frame = &self.frames[frame_id.0];
            // Uncontended: the claimed frame is unpinned.
            let latch = frame.lock_load();

            let dirty_victim = frame.page_id().filter(|_| frame.is_dirty());
            if let Some(victim) = dirty_victim {
                frame.pin();
                drop(state);
                let written = self.write_back(frame, victim);
                state = self.state.lock();

                if let Err(e) = written {
                    error!("write-back of {} failed, keeping it resident: {}", victim, e);
                    // Evicting dropped its history; register it again.
                    self.replacer.record_access(frame_id);
                    drop(latch);
                    self.unpin_locked(&mut state, frame_id);
                    return Err(e);
                }

                frame.clear_dirty();
                if frame.pin_count() > 1 {
                    trace!("{} pinned during write-back, claiming again", victim);
                    drop(latch);
                    self.unpin_locked(&mut state, frame_id);
                    continue;
                }
                frame.unpin();
            }

            if let Some(old) = frame.page_id() {
                state.page_table.remove(&old);
                self.stats.record_eviction(dirty_victim.is_some());
                trace!("evicted {} from {}", old, frame_id);
            }
            frame.set_page_id(Some(page_id));
            frame.pin();
            state.page_table.insert(page_id, frame_id);
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            drop(state);

            if let Err(e) = self.fill_frame(frame, page_id, fill) {
                error!("loading {} into {} failed: {}", page_id, frame_id, e);
                self.abandon_frame(frame_id, page_id, latch);
                return Err(e);
            }

            drop(latch);
            return Ok(frame_id);
        }
    }

    /// Pick a frame to reuse: free list first, then the replacer's victim.
    /// The victim keeps its mapping.
    fn claim_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::PoolExhausted)?;
        debug_assert!(
            !self.frames[frame_id.0].is_pinned(),
            "replacer evicted pinned {}",
            frame_id
        );
        Ok(frame_id)
    }

    /// Write a dirty victim's content to disk before its frame is reused.
    fn write_back(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        debug!("writing back dirty {} before reuse", page_id);
        let content = frame.page();
        self.write_to_disk(page_id, &content)
    }

    /// Install the new content of a freshly mapped frame.
    fn fill_frame(&self, frame: &Frame, page_id: PageId, fill: Fill) -> Result<()> {
        let mut content = frame.page_mut();

        match fill {
            Fill::Zeroed => content.reset(),
            Fill::FromDisk => {
                let buf = self
                    .scheduler
                    .schedule_read(page_id, Page::boxed())
                    .wait()?;
                content.copy_from(&buf);
                self.stats.record_read();
            }
        }

        Ok(())
    }

    /// Undo a failed fill: unmap, zero and release the frame, then open the
    /// latch. Waiters that pinned it meanwhile see it empty.
    fn abandon_frame(&self, frame_id: FrameId, page_id: PageId, latch: MutexGuard<'_, ()>) {
        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.clear_dirty();

        let mut state = self.state.lock();
        if state.page_table.get(&page_id) == Some(&frame_id) {
            state.page_table.remove(&page_id);
        }
        frame.set_page_id(None);
        drop(latch);
        self.unpin_locked(&mut state, frame_id);
    }

    /// Drop one pin. The structural lock must be held.
    ///
    /// At zero pins the frame becomes evictable, or goes back to the free
    /// list if a failed load left it empty.
    fn unpin_locked(&self, state: &mut PoolState, frame_id: FrameId) -> Option<u32> {
        let frame = &self.frames[frame_id.0];
        let remaining = frame.unpin()?;

        if remaining == 0 {
            if frame.is_free() {
                self.replacer.remove(frame_id);
                state.free_list.push_back(frame_id);
            } else {
                self.replacer.set_evictable(frame_id, true);
            }
        }

        Some(remaining)
    }

    // ========================================================================
    // Internal: disk writes
    // ========================================================================

    /// Write a pinned frame's content as `page_id`, clearing its dirty flag.
    fn flush_frame(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        let content = frame.page();
        let was_dirty = frame.take_dirty();

        self.write_to_disk(page_id, &content).inspect_err(|_| {
            if was_dirty {
                frame.mark_dirty();
            }
        })
    }

    /// Force the log for `page_id`, then write `content` and wait for it.
    fn write_to_disk(&self, page_id: PageId, content: &Page) -> Result<()> {
        if let Some(log_manager) = &self.log_manager {
            log_manager.flush_for_page(page_id)?;
        }

        let mut buf = Page::boxed();
        buf.copy_from(content);
        self.scheduler.schedule_write(page_id, buf).wait()?;
        self.stats.record_write();

        Ok(())
    }
}
