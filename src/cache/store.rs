use std::sync::RwLock;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::config::PageCacheConfig;
use super::keys::PageCacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Rendered pages with a fixed time-to-live.
///
/// Expiry is measured on the tokio clock so paused-time tests can step over it.
pub struct PageCache {
    entries: RwLock<LruCache<PageCacheKey, Entry>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(config: &PageCacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
            ttl: config.ttl,
        }
    }

    /// Live entry for `key`. Expired entries are dropped and count as misses.
    pub fn get(&self, key: &PageCacheKey) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let live = match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.response.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        if live.is_some() {
            counter!("chorus_page_cache_hit_total").increment(1);
        } else {
            counter!("chorus_page_cache_miss_total").increment(1);
        }
        live
    }

    pub fn insert(&self, key: PageCacheKey, response: CachedResponse) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        rw_write(&self.entries, SOURCE, "insert").put(key, entry);
    }

    /// Drop every stored page.
    pub fn flush(&self) {
        rw_write(&self.entries, SOURCE, "flush").clear();
        counter!("chorus_page_cache_flush_total").increment(1);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
