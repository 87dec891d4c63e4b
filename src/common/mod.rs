//! Common types shared across the page cache.
//!
//! - Configuration constants and [`config::BufferPoolConfig`]
//! - Error types
//! - Identifiers (PageId, FrameId)

pub mod config;
pub mod error;
mod types;

pub use error::{Error, Result};
pub use types::{FrameId, PageId};
