//! pagecache - a bounded page cache for a disk-based storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     callers (indexes, heaps)                    │
//! │            new_page / fetch_page_read / fetch_page_write        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Pool (buffer/)                    │   │
//! │  │   BufferPoolManager + Frame + page guards + PoolStats    │   │
//! │  │              LruKReplacer picks the victims              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │   recovery/: LogManager hook, forced before dirty writes │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Storage Layer (storage/)                 │   │
//! │  │   DiskScheduler worker → DiskIo (DiskManager/MemoryDisk) │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool, guards and the LRU-K replacer
//! - [`storage`] - Page buffers, disk backends and the disk scheduler
//! - [`recovery`] - Write-ahead hook consulted before page writes
//!
//! # Quick Start
//! ```no_run
//! use pagecache::{BufferPoolManager, DiskManager};
//!
//! let disk = DiskManager::open_or_create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, disk).unwrap();
//!
//! let page_id = {
//!     let mut page = bpm.new_page_guarded().unwrap();
//!     page.as_mut_slice()[..5].copy_from_slice(b"hello");
//!     page.page_id()
//! };
//!
//! bpm.flush_all_pages();
//! assert_eq!(&bpm.fetch_page_read(page_id).unwrap().as_slice()[..5], b"hello");
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{BasicPageGuard, BufferPoolManager, ReadPageGuard, WritePageGuard};
pub use storage::page::Page;
pub use storage::{DiskManager, MemoryDisk};
