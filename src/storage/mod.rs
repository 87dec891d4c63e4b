//! Storage layer - disk I/O and the raw page buffer.
//!
//! - [`DiskIo`] - The backend seam the buffer pool writes through
//! - [`DiskManager`] - File-backed backend
//! - [`MemoryDisk`] - In-memory backend
//! - [`DiskScheduler`] - Background worker that executes page I/O
//! - [`page`] - The raw page buffer

mod disk_io;
mod disk_manager;
mod disk_scheduler;
mod memory_disk;
pub mod page;

pub use disk_io::DiskIo;
pub use disk_manager::DiskManager;
pub use disk_scheduler::{DiskCompletion, DiskScheduler};
pub use memory_disk::{IoCounters, MemoryDisk};
