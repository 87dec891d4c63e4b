//! Configuration for the page cache.

/// Size of a page in bytes. Engine-wide and fixed.
///
/// Matches the OS page size on most systems so frames can be handed to
/// aligned I/O without copying.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used by [`BufferPoolConfig::default`].
pub const DEFAULT_POOL_SIZE: usize = 64;

/// History depth used by [`BufferPoolConfig::default`].
pub const DEFAULT_REPLACER_K: usize = 2;

/// Runtime parameters of a [`BufferPoolManager`](crate::buffer::BufferPoolManager).
///
/// # Example
/// ```
/// use pagecache::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::new(16).with_replacer_k(3);
/// assert_eq!(config.pool_size, 16);
/// assert_eq!(config.replacer_k, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
    /// Number of accesses the LRU-K replacer remembers per frame.
    pub replacer_k: usize,
}

impl BufferPoolConfig {
    /// Config with `pool_size` frames and the default K.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            replacer_k: DEFAULT_REPLACER_K,
        }
    }

    /// Override the replacer's K.
    pub fn with_replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
