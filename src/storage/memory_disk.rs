//! In-memory page storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::common::{PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskIo;

/// Page storage held entirely in memory.
///
/// Useful for tests and ephemeral pools. Counters are shared through
/// [`MemoryDisk::counters`] so a test can observe I/O after the disk has been
/// moved into a scheduler.
#[derive(Default)]
pub struct MemoryDisk {
    pages: HashMap<PageId, Box<Page>>,
    page_count: u32,
    counters: Arc<IoCounters>,
}

/// Read and write counts of a [`MemoryDisk`].
#[derive(Debug, Default)]
pub struct IoCounters {
    reads: AtomicU64,
    writes: AtomicU64,
}

impl IoCounters {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<IoCounters> {
        Arc::clone(&self.counters)
    }
}

impl DiskIo for MemoryDisk {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        match self.pages.get(&page_id) {
            Some(stored) => page.copy_from(stored),
            None => page.reset(),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        self.pages
            .entry(page_id)
            .or_insert_with(Page::boxed)
            .copy_from(page);
        self.page_count = self.page_count.max(page_id.0 + 1);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }
}
