//! LRU cache of rasterized surfaces

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::surface::Surface;

const DEFAULT_CAPACITY: usize = 32;

/// Cache key for a rendered page
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SurfaceKey {
    /// One-based page number
    pub page: usize,
    /// Scale factor (multiplied by 100 for integer hashing)
    pub scale: u32,
}

impl SurfaceKey {
    pub fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale: (scale * 100.0).round() as u32,
        }
    }
}

/// Surfaces of the currently decoded document.
///
/// Must be cleared whenever the decoded handle is released, since keys do not
/// identify the document.
pub struct SurfaceCache {
    entries: Mutex<LruCache<SurfaceKey, Surface>>,
}

impl SurfaceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, page: usize, scale: f32) -> Option<Surface> {
        self.entries.lock().get(&SurfaceKey::new(page, scale)).cloned()
    }

    pub fn insert(&self, surface: Surface) {
        let key = SurfaceKey::new(surface.page, surface.scale);
        self.entries.lock().put(key, surface);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SurfaceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
