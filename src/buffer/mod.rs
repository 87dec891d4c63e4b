//! Buffer pool management.
//!
//! The buffer pool sits between callers and the disk scheduler. It keeps a
//! fixed number of frames, each holding at most one page.
//!
//! # Components
//! - [`BufferPoolManager`] - the page cache
//! - [`Frame`] - a slot holding a page plus its metadata
//! - [`BasicPageGuard`] / [`ReadPageGuard`] / [`WritePageGuard`] - RAII pins
//! - [`PoolStats`] - hit, miss and I/O counters
//! - [`replacer`] - the LRU-K eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
pub use stats::{PoolStats, StatsSnapshot};
