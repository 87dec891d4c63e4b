//! The disk backend seam.

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Raw page I/O against persistent storage.
///
/// Backends are driven from the [`DiskScheduler`](super::DiskScheduler)'s
/// worker thread only, so they take `&mut self` and need `Send` but not
/// `Sync`.
///
/// Reading a page that has never been written yields zeros. The buffer pool
/// allocates page ids without touching storage, so a clean page evicted
/// before its first write-back is simply absent on disk.
pub trait DiskIo: Send {
    /// Fill `page` with the stored content of `page_id`.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist `page` as the content of `page_id`, extending storage if needed.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Number of page slots currently backed by storage.
    ///
    /// The buffer pool starts allocating page ids from here.
    fn page_count(&self) -> u32;
}

impl<T: DiskIo + ?Sized> DiskIo for Box<T> {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        (**self).read_page(page_id, page)
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        (**self).write_page(page_id, page)
    }

    fn page_count(&self) -> u32 {
        (**self).page_count()
    }
}
