//! Tunables for the browse grid.
//!
//! Everything here has a sensible default; callers override individual values
//! through [`BrowseConfigBuilder`].

use std::time::Duration;

/// Smallest page requested from the query service.
const DEFAULT_CHUNK_SIZE_MINIMUM: usize = 150;

/// Largest page requested from the query service.
const DEFAULT_CHUNK_SIZE_MAXIMUM: usize = 300;

/// Live TV channel lists page in small fixed chunks.
const DEFAULT_LIVE_TV_CHANNEL_CHUNK: usize = 40;

/// Number of trailing items that trigger a prefetch when focused.
const DEFAULT_PREFETCH_WINDOW: usize = 20;

/// How much a focused card grows (1.15 = 15%).
const DEFAULT_FOCUS_SCALE: f64 = 1.15;

/// Delay before refreshing the focused item after returning to the grid.
const DEFAULT_REFRESH_DELAY_MS: u64 = 500;

/// Number of solved geometries kept per solver.
const DEFAULT_GEOMETRY_CACHE_ENTRIES: usize = 8;

/// Height taken by the header chrome above the grid, in logical units.
pub const DEFAULT_CHROME_HEIGHT: f64 = 130.6;

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseConfig {
    pub chunk_size_minimum: usize,
    pub chunk_size_maximum: usize,
    pub live_tv_channel_chunk: usize,
    pub prefetch_window: usize,
    pub focus_scale: f64,
    pub refresh_delay: Duration,
    pub geometry_cache_entries: usize,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            chunk_size_minimum: DEFAULT_CHUNK_SIZE_MINIMUM,
            chunk_size_maximum: DEFAULT_CHUNK_SIZE_MAXIMUM,
            live_tv_channel_chunk: DEFAULT_LIVE_TV_CHANNEL_CHUNK,
            prefetch_window: DEFAULT_PREFETCH_WINDOW,
            focus_scale: DEFAULT_FOCUS_SCALE,
            refresh_delay: Duration::from_millis(DEFAULT_REFRESH_DELAY_MS),
            geometry_cache_entries: DEFAULT_GEOMETRY_CACHE_ENTRIES,
        }
    }
}

impl BrowseConfig {
    pub fn builder() -> BrowseConfigBuilder {
        BrowseConfigBuilder::new()
    }

    /// Page size for a grid that shows roughly `visible_estimate` cards with
    /// `stride` cards per line.
    ///
    /// Starts at the minimum; a screen that already shows at least that many
    /// cards asks for one extra line on top, capped at the maximum.
    pub fn chunk_size_for(&self, visible_estimate: usize, stride: usize) -> usize {
        let mut chunk = self.chunk_size_minimum;
        if visible_estimate > 0 && visible_estimate >= chunk {
            chunk = (visible_estimate + stride).min(self.chunk_size_maximum);
        }
        chunk
    }
}

/// Builder for [`BrowseConfig`].
#[derive(Debug, Clone, Default)]
pub struct BrowseConfigBuilder {
    config: BrowseConfig,
}

impl BrowseConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowseConfig::default(),
        }
    }

    pub fn chunk_size_minimum(mut self, size: usize) -> Self {
        self.config.chunk_size_minimum = size.max(1);
        self
    }

    pub fn chunk_size_maximum(mut self, size: usize) -> Self {
        self.config.chunk_size_maximum = size.max(1);
        self
    }

    pub fn live_tv_channel_chunk(mut self, size: usize) -> Self {
        self.config.live_tv_channel_chunk = size.max(1);
        self
    }

    pub fn prefetch_window(mut self, items: usize) -> Self {
        self.config.prefetch_window = items;
        self
    }

    pub fn focus_scale(mut self, scale: f64) -> Self {
        self.config.focus_scale = scale;
        self
    }

    pub fn refresh_delay(mut self, delay: Duration) -> Self {
        self.config.refresh_delay = delay;
        self
    }

    pub fn geometry_cache_entries(mut self, entries: usize) -> Self {
        self.config.geometry_cache_entries = entries.max(1);
        self
    }

    pub fn build(self) -> BrowseConfig {
        let mut config = self.config;
        if config.chunk_size_maximum < config.chunk_size_minimum {
            config.chunk_size_maximum = config.chunk_size_minimum;
        }
        config
    }
}
