//! Whole-response page cache.
//!
//! Rendered pages are kept for a fixed window and served verbatim until they
//! expire or the cache is flushed. Writes never invalidate entries.
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_ttl_seconds = 20
//! max_entries = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::PageCacheKey;
pub use middleware::{PageCacheState, page_cache_layer};
pub use store::{CachedResponse, PageCache};
