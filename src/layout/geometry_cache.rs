use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use xxhash_rust::xxh3::Xxh3Builder;

use crate::layout::grid::{GridGeometry, Viewport};
use crate::models::{FolderKind, LayoutPreferences};

/// Key for the geometry cache: every input that can change a solved
/// geometry. Floats are stored by bit pattern so `1.15` and `1.1500001`
/// never share an entry.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct GeometryKey {
    width_bits: u64,
    height_bits: u64,
    prefs: LayoutPreferences,
    folder: FolderKind,
    focus_scale_bits: u64,
}

impl GeometryKey {
    pub fn new(
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        focus_scale: f64,
    ) -> Self {
        Self {
            width_bits: viewport.width.to_bits(),
            height_bits: viewport.height.to_bits(),
            prefs,
            folder,
            focus_scale_bits: focus_scale.to_bits(),
        }
    }
}

/// Bounded LRU of solved geometries, owned by one solver.
///
/// An entry is only ever returned for an exact key match, so a layout solved
/// for one folder type never bleeds into another.
pub struct GeometryCache {
    entries: Mutex<LruCache<GeometryKey, GridGeometry, Xxh3Builder>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GeometryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::with_hasher(capacity, Xxh3Builder::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &GeometryKey) -> Option<GridGeometry> {
        let found = self.entries.lock().get(key).copied();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn insert(&self, key: GeometryKey, geometry: GridGeometry) {
        self.entries.lock().put(key, geometry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
