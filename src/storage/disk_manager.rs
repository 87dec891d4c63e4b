//! Disk Manager - file-backed page storage.
//!
//! The [`DiskManager`] stores pages sequentially in a single file:
//! ```text
//! ┌─────────┬─────────┬─────────┬─────────┐
//! │ Page 0  │ Page 1  │  ...    │ Page N  │
//! └─────────┴─────────┴─────────┴─────────┘
//! Offset:  0   PAGE_SIZE   ...   N×PAGE_SIZE
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskIo;

/// Page I/O for a single database file.
///
/// Writes past the current end grow the file; any gap left behind reads back
/// as zeros. Every write is followed by `sync_data`.
pub struct DiskManager {
    file: File,
    /// Number of page slots the file currently spans.
    page_count: u32,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        let page_count = len.div_ceil(PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Size of the file in bytes as tracked by page count.
    #[inline]
    pub fn file_size(&self) -> u64 {
        u64::from(self.page_count) * PAGE_SIZE as u64
    }
}

impl DiskIo for DiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            trace!("{} is beyond end of file, reading zeros", page_id);
            page.reset();
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;

        // A trailing partial page is padded with zeros.
        let buf = page.as_mut_slice();
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        buf[filled..].fill(0);

        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_data()?;

        self.page_count = self.page_count.max(page_id.0 + 1);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }
}
