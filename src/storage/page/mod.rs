//! Page buffer type.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
