//! # Notification Artwork Cache
//!
//! Bounded in-memory cache of decoded thumbnails keyed by file path. Entries
//! are bounded both by count and by the total size of their decoded pixels.
//! Misses (tracks without embedded artwork) are cached too, so a track is
//! only ever decoded once while it stays in the cache.

use bridge_traits::thumbnail::{Thumbnail, ThumbnailLoader};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

struct CacheState {
    entries: LruCache<String, Option<Thumbnail>>,
    size_bytes: usize,
}

/// Thumbnail cache fed by a host [`ThumbnailLoader`].
pub struct ThumbnailCache {
    loader: Arc<dyn ThumbnailLoader>,
    state: Mutex<CacheState>,
    max_bytes: usize,
}

impl ThumbnailCache {
    /// # Arguments
    ///
    /// * `loader` - Host thumbnail decoder
    /// * `max_entries` - Maximum cached paths, hits and misses alike
    /// * `max_bytes` - Budget for decoded pixels held at once
    pub fn new(loader: Arc<dyn ThumbnailLoader>, max_entries: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            loader,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                size_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Returns the thumbnail for `path`, decoding it on first request.
    ///
    /// Loader failures are logged and not cached, so the next request retries.
    pub async fn get_or_load(&self, path: &str) -> Option<Thumbnail> {
        let cached = self.state.lock().entries.get(path).cloned();
        if let Some(cached) = cached {
            return cached;
        }

        match self.loader.load(path).await {
            Ok(thumbnail) => {
                self.insert(path.to_string(), thumbnail.clone());
                thumbnail
            }
            Err(e) => {
                warn!(error = %e, "Thumbnail decode failed");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total decoded bytes currently held.
    pub fn size_bytes(&self) -> usize {
        self.state.lock().size_bytes
    }

    fn insert(&self, path: String, thumbnail: Option<Thumbnail>) {
        let entry_size = thumbnail.as_ref().map_or(0, Thumbnail::byte_len);
        if entry_size > self.max_bytes {
            debug!(entry_size, max_bytes = self.max_bytes, "Thumbnail exceeds cache budget");
            return;
        }

        let mut state = self.state.lock();
        if let Some(previous) = state.entries.pop(&path) {
            state.size_bytes -= previous.as_ref().map_or(0, Thumbnail::byte_len);
        }

        while state.size_bytes + entry_size > self.max_bytes {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.size_bytes -= evicted.as_ref().map_or(0, Thumbnail::byte_len);
                }
                None => break,
            }
        }

        if let Some((_, evicted)) = state.entries.push(path, thumbnail) {
            state.size_bytes -= evicted.as_ref().map_or(0, Thumbnail::byte_len);
        }
        state.size_bytes += entry_size;
    }
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ThumbnailCache")
            .field("entries", &state.entries.len())
            .field("size_bytes", &state.size_bytes)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
