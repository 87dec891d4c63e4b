//! Eviction policy.
//!
//! - [`LruKReplacer`] - backward k-distance with LRU tie-breaking

mod lru_k;

pub use lru_k::{KDistance, LruKReplacer};
