//! Card and spacing geometry for the browse grid.
//!
//! # Algorithm
//! 1. Pick the number of lines (rows for horizontal scrolling, columns for
//!    vertical) from the poster size and image type tables. A single row is
//!    treated as a card-count driven strip of [`MIN_NUM_CARDS`] instead.
//! 2. Reserve the focus-grow allowance and inter-card spacing as fractions of
//!    the primary axis, then divide what remains by the line count.
//! 3. Round the card size, derive the other side from the folder aspect, and
//!    recompute spacing and padding from the rounded size.
//! 4. Estimate how many cards are visible for chunk sizing.
//!
//! The primary axis is the one lines are stacked along: height when rows
//! scroll horizontally, width when columns scroll vertically.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use crate::config::DEFAULT_CHROME_HEIGHT;
use crate::error::{BrowseError, Result};
use crate::layout::aspect::folder_aspect;
use crate::layout::geometry_cache::{GeometryCache, GeometryKey};
use crate::models::{FolderKind, GridDirection, ImageType, LayoutPreferences, PosterSize};

/// Spacing between cards as a multiple of half the focus-grow allowance.
pub const CARD_SPACING_PCT: f64 = 4.0;

/// Horizontal spacing multiplier for banners, which are already very wide.
pub const CARD_SPACING_HORIZONTAL_BANNER_PCT: f64 = 0.5;

/// Cards targeted by a single-row strip.
pub const MIN_NUM_CARDS: u32 = 5;

/// List rows use fixed card sizes per image type.
const LIST_POSTER_WIDTH: u32 = 190;
const LIST_BANNER_SIZE: (u32, u32) = (90, 94);
const LIST_THUMB_SIZE: (u32, u32) = (328, 222);

/// Floor applied when rounding collapses a card.
pub const MIN_CARD_SIZE: u32 = 1;

/// Logical size of the area the grid is laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn validate(&self) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v >= 1.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(BrowseError::InvalidConfiguration(format!(
                "viewport {}x{} is not a usable size",
                self.width, self.height
            )))
        }
    }
}

/// Converts a physical display size to the logical grid area: pixels are
/// divided by `density` and the header chrome is taken off the height.
pub fn viewport_from_display(
    width_px: u32,
    height_px: u32,
    density: f64,
    chrome_height: f64,
) -> Viewport {
    let density = if density.is_finite() && density > 0.0 {
        density
    } else {
        1.0
    };
    let width = width_px as f64 / density;
    let height = (height_px as f64 / density - chrome_height).max(0.0);
    Viewport::new(width, height)
}

/// [`viewport_from_display`] with the default chrome height.
pub fn default_viewport_from_display(width_px: u32, height_px: u32, density: f64) -> Viewport {
    viewport_from_display(width_px, height_px, density, DEFAULT_CHROME_HEIGHT)
}

/// Solved geometry. All sizes are whole logical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub card_width: u32,
    pub card_height: u32,
    pub spacing_h: u32,
    pub spacing_v: u32,
    pub padding_left: u32,
    pub padding_top: u32,
    /// Rows for horizontal grids, columns for vertical/list grids. Zero marks a
    /// single-row strip.
    pub line_count: u32,
    pub estimated_visible_cards: usize,
    pub visible_stride: usize,
    pub direction: GridDirection,
    pub image_type: ImageType,
}

impl GridGeometry {
    /// Card extent along the axis lines are stacked on.
    pub fn card_primary(&self) -> u32 {
        match self.direction {
            GridDirection::Horizontal => self.card_height,
            GridDirection::Vertical | GridDirection::List => self.card_width,
        }
    }

    pub fn spacing_primary(&self) -> u32 {
        match self.direction {
            GridDirection::Horizontal => self.spacing_v,
            GridDirection::Vertical | GridDirection::List => self.spacing_h,
        }
    }

    /// Extent used by all lines plus the gaps between them.
    pub fn occupied_primary(&self) -> u32 {
        let lines = self.line_count.max(1);
        lines * self.card_primary() + (lines - 1) * self.spacing_primary()
    }

    /// Cards per line break for focus navigation.
    pub fn lines_for_navigation(&self) -> usize {
        match self.line_count {
            0 => 1,
            n => n as usize,
        }
    }
}

/// Rows for horizontal grids.
pub fn default_rows(size: PosterSize, image_type: ImageType) -> u32 {
    let (poster, thumb, banner) = match size {
        PosterSize::Smallest => (5, 7, 13),
        PosterSize::Small => (4, 6, 11),
        PosterSize::Medium => (3, 5, 9),
        PosterSize::Large => (2, 4, 7),
        PosterSize::XLarge => (1, 2, 5),
    };
    pick(image_type, poster, thumb, banner)
}

/// Columns for vertical grids. Lists always have one.
pub fn default_columns(size: PosterSize, image_type: ImageType, direction: GridDirection) -> u32 {
    if direction == GridDirection::List {
        return 1;
    }
    let (poster, thumb, banner) = match size {
        PosterSize::Smallest => (15, 11, 6),
        PosterSize::Small => (13, 9, 5),
        PosterSize::Medium => (11, 7, 4),
        PosterSize::Large => (7, 5, 3),
        PosterSize::XLarge => (5, 3, 2),
    };
    pick(image_type, poster, thumb, banner)
}

fn pick(image_type: ImageType, poster: u32, thumb: u32, banner: u32) -> u32 {
    match image_type {
        ImageType::Poster => poster,
        ImageType::Thumb => thumb,
        ImageType::Banner => banner,
    }
}

fn round_u32(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

/// Cards that fit along `extent`, counting a partly visible one.
fn cross_count(extent: f64, card: u32, spacing: u32) -> usize {
    let step = (card + spacing).max(1) as f64;
    // round(x + 0.5) equals ceil(x) except on exact multiples
    (extent / step + 0.5).round().max(1.0) as usize
}

/// Which side of the card a memoised conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    HeightFromWidth,
    WidthFromHeight,
}

/// Single-entry memo for the aspect conversion, keyed by the conversion,
/// the exact card size, image type and folder kind.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DimensionCache {
    key: (Conversion, u64, ImageType, FolderKind),
    secondary: f64,
}

/// Computes [`GridGeometry`] and memoises results.
///
/// Each controller owns its own solver; nothing is shared between screens.
pub struct GridSolver {
    cache: GeometryCache,
    dimension: Mutex<Option<DimensionCache>>,
    computations: AtomicU64,
}

impl GridSolver {
    pub fn new(cache_entries: usize) -> Self {
        Self {
            cache: GeometryCache::new(cache_entries),
            dimension: Mutex::new(None),
            computations: AtomicU64::new(0),
        }
    }

    /// Number of times geometry was actually computed (cache misses).
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    pub fn solve(
        &self,
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        focus_scale: f64,
    ) -> Result<GridGeometry> {
        viewport.validate()?;
        if !focus_scale.is_finite() {
            return Err(BrowseError::InvalidConfiguration(format!(
                "focus scale {focus_scale} is not finite"
            )));
        }

        let key = GeometryKey::new(viewport, prefs, folder, focus_scale);
        if let Some(geometry) = self.cache.get(&key) {
            trace!(?key, "geometry cache hit");
            return Ok(geometry);
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        let geometry = self.compute(viewport, prefs, folder, focus_scale);
        debug!(
            card_width = geometry.card_width,
            card_height = geometry.card_height,
            lines = geometry.line_count,
            visible = geometry.estimated_visible_cards,
            "geometry computed"
        );
        self.cache.insert(key, geometry);
        Ok(geometry)
    }

    /// Height of a card `width` wide in this folder.
    fn height_for(&self, width: f64, image_type: ImageType, folder: FolderKind) -> f64 {
        self.memo(Conversion::HeightFromWidth, width, image_type, folder, |aspect| {
            width / aspect
        })
    }

    /// Width of a card `height` tall in this folder.
    fn width_for(&self, height: f64, image_type: ImageType, folder: FolderKind) -> f64 {
        self.memo(Conversion::WidthFromHeight, height, image_type, folder, |aspect| {
            height * aspect
        })
    }

    fn memo(
        &self,
        conversion: Conversion,
        primary: f64,
        image_type: ImageType,
        folder: FolderKind,
        convert: impl FnOnce(f64) -> f64,
    ) -> f64 {
        let key = (conversion, primary.to_bits(), image_type, folder);
        let mut slot = self.dimension.lock();
        if let Some(hit) = slot.as_ref().filter(|entry| entry.key == key) {
            return hit.secondary;
        }
        let secondary = convert(folder_aspect(image_type, folder));
        *slot = Some(DimensionCache { key, secondary });
        secondary
    }

    fn compute(
        &self,
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        focus_scale: f64,
    ) -> GridGeometry {
        let scaling = (focus_scale - 1.0).max(0.0);
        match prefs.direction {
            GridDirection::Horizontal => {
                let rows = default_rows(prefs.poster_size, prefs.image_type);
                if rows > 1 {
                    self.solve_rows(viewport, prefs, folder, scaling, rows)
                } else {
                    self.solve_strip(viewport, prefs, folder, scaling)
                }
            }
            GridDirection::Vertical | GridDirection::List => {
                let columns =
                    default_columns(prefs.poster_size, prefs.image_type, prefs.direction);
                self.solve_columns(viewport, prefs, folder, scaling, columns)
            }
        }
    }

    fn horizontal_spacing_pct(image_type: ImageType) -> f64 {
        match image_type {
            ImageType::Banner => CARD_SPACING_HORIZONTAL_BANNER_PCT,
            ImageType::Poster | ImageType::Thumb => CARD_SPACING_PCT,
        }
    }

    /// Horizontal scrolling with `rows` fixed rows stacked along the height.
    fn solve_rows(
        &self,
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        scaling: f64,
        rows: u32,
    ) -> GridGeometry {
        let lines = rows as f64;
        let pad_fraction = scaling / lines;
        let spacing_fraction = (pad_fraction / 2.0) * CARD_SPACING_PCT * (lines - 1.0);
        let usable = viewport.height / (1.0 + pad_fraction + spacing_fraction);

        let mut card_height = round_u32(usable / lines).max(MIN_CARD_SIZE);
        let spacing_for = |card: u32| round_u32((card as f64 * scaling / 2.0) * CARD_SPACING_PCT);
        let mut spacing_v = spacing_for(card_height);
        while card_height > MIN_CARD_SIZE
            && (rows * card_height + (rows - 1) * spacing_v) as f64 > viewport.height
        {
            card_height -= 1;
            spacing_v = spacing_for(card_height);
        }
        let occupied = rows * card_height + (rows - 1) * spacing_v;
        let padding_top = round_u32((viewport.height - occupied as f64) / 2.0);

        let card_width = (self
            .width_for(card_height as f64, prefs.image_type, folder)
            .floor() as u32)
            .max(MIN_CARD_SIZE);
        let padding_left = round_u32((card_width as f64 * scaling) / 2.0);
        let spacing_h = round_u32(padding_left as f64 * Self::horizontal_spacing_pct(prefs.image_type));

        let per_row = cross_count(viewport.width, card_width, spacing_h);
        GridGeometry {
            card_width,
            card_height,
            spacing_h,
            spacing_v,
            padding_left,
            padding_top,
            line_count: rows,
            estimated_visible_cards: rows as usize * per_row,
            visible_stride: rows as usize,
            direction: prefs.direction,
            image_type: prefs.image_type,
        }
    }

    /// A single horizontal row, sized so about [`MIN_NUM_CARDS`] fit across.
    fn solve_strip(
        &self,
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        scaling: f64,
    ) -> GridGeometry {
        let mut geometry = self.solve_columns(viewport, prefs, folder, scaling, MIN_NUM_CARDS);

        // A strip is one card tall; shrink until it fits with its grow allowance.
        let max_height = viewport.height / (1.0 + scaling);
        if geometry.card_height as f64 > max_height {
            let card_height = (max_height.floor() as u32).max(MIN_CARD_SIZE);
            let card_width = (self
                .width_for(card_height as f64, prefs.image_type, folder)
                .floor() as u32)
                .max(MIN_CARD_SIZE);
            geometry.card_height = card_height;
            geometry.card_width = card_width;
            let grow = round_u32((card_width as f64 * scaling) / 2.0);
            geometry.spacing_h = round_u32(grow as f64 * Self::horizontal_spacing_pct(prefs.image_type));
        }
        geometry.padding_top = round_u32((viewport.height - geometry.card_height as f64) / 2.0);
        geometry.padding_left = round_u32((geometry.card_width as f64 * scaling) / 2.0);
        geometry.line_count = 0;
        geometry.estimated_visible_cards =
            cross_count(viewport.width, geometry.card_width, geometry.spacing_h);
        geometry.visible_stride = MIN_NUM_CARDS as usize;
        geometry
    }

    /// Vertical scrolling with `columns` fixed columns across the width.
    fn solve_columns(
        &self,
        viewport: Viewport,
        prefs: LayoutPreferences,
        folder: FolderKind,
        scaling: f64,
        columns: u32,
    ) -> GridGeometry {
        let lines = columns as f64;
        let h_pct = Self::horizontal_spacing_pct(prefs.image_type);
        let pad_fraction = scaling / lines;
        let spacing_fraction = (pad_fraction / 2.0) * h_pct * (lines - 1.0);
        let usable = viewport.width / (1.0 + pad_fraction + spacing_fraction);
        let estimate = usable / lines;

        let (mut card_width, mut card_height) = if prefs.direction == GridDirection::List {
            match prefs.image_type {
                ImageType::Poster => {
                    let height = self.height_for(LIST_POSTER_WIDTH as f64, prefs.image_type, folder);
                    (LIST_POSTER_WIDTH, round_u32(height))
                }
                ImageType::Banner => LIST_BANNER_SIZE,
                ImageType::Thumb => LIST_THUMB_SIZE,
            }
        } else {
            let height = round_u32(self.height_for(estimate, prefs.image_type, folder));
            let width = self
                .width_for(height as f64, prefs.image_type, folder)
                .floor() as u32;
            (width, height)
        };
        card_width = card_width.max(MIN_CARD_SIZE);
        card_height = card_height.max(MIN_CARD_SIZE);

        let spacing_for = |card: u32| round_u32((card as f64 * scaling / 2.0) * h_pct);
        let mut spacing_h = spacing_for(card_width);
        let fitted_width = card_width;
        while card_width > MIN_CARD_SIZE
            && (columns * card_width + (columns - 1) * spacing_h) as f64 > viewport.width
        {
            card_width -= 1;
            spacing_h = spacing_for(card_width);
        }
        if card_width != fitted_width {
            card_height = round_u32(self.height_for(card_width as f64, prefs.image_type, folder))
                .max(MIN_CARD_SIZE);
        }
        let occupied = columns * card_width + (columns - 1) * spacing_h;
        let padding_left = round_u32((viewport.width - occupied as f64) / 2.0);
        let padding_top = round_u32((card_height as f64 * scaling) / 2.0);
        let spacing_v = round_u32(padding_top as f64 * CARD_SPACING_PCT);

        let per_column = cross_count(viewport.height, card_height, spacing_v);
        GridGeometry {
            card_width,
            card_height,
            spacing_h,
            spacing_v,
            padding_left,
            padding_top,
            line_count: columns,
            estimated_visible_cards: columns as usize * per_column,
            visible_stride: columns as usize,
            direction: prefs.direction,
            image_type: prefs.image_type,
        }
    }
}

impl Default for GridSolver {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionType, ItemCategory};

    const SIZES: [PosterSize; 5] = [
        PosterSize::Smallest,
        PosterSize::Small,
        PosterSize::Medium,
        PosterSize::Large,
        PosterSize::XLarge,
    ];
    const TYPES: [ImageType; 3] = [ImageType::Poster, ImageType::Thumb, ImageType::Banner];
    const DIRECTIONS: [GridDirection; 3] = [
        GridDirection::Horizontal,
        GridDirection::Vertical,
        GridDirection::List,
    ];

    fn movies() -> FolderKind {
        FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Movies))
    }

    #[test]
    fn test_medium_posters_use_three_rows() {
        let solver = GridSolver::default();
        let geometry = solver
            .solve(
                Viewport::new(1920.0, 1080.0),
                LayoutPreferences::default(),
                movies(),
                1.15,
            )
            .unwrap();
        assert_eq!(geometry.line_count, 3);
        assert_eq!(geometry.visible_stride, 3);
        let aspect = geometry.card_width as f64 / geometry.card_height as f64;
        assert!((aspect - 2.0 / 3.0).abs() < 0.01, "aspect {aspect}");
    }

    #[test]
    fn test_no_overflow_for_any_layout() {
        let solver = GridSolver::new(64);
        for viewport in [
            Viewport::new(1920.0, 1080.0),
            Viewport::new(1280.0, 589.4),
            Viewport::new(960.0, 409.4),
        ] {
            for size in SIZES {
                for image_type in TYPES {
                    for direction in DIRECTIONS {
                        let prefs = LayoutPreferences::new(size, image_type, direction);
                        let g = solver.solve(viewport, prefs, movies(), 1.15).unwrap();
                        assert!(g.card_width > 0 && g.card_height > 0, "{prefs:?}");
                        let extent = match direction {
                            GridDirection::Horizontal => viewport.height,
                            _ => viewport.width,
                        };
                        assert!(
                            g.occupied_primary() as f64 <= extent,
                            "{prefs:?} at {viewport:?} overflows: {g:?}"
                        );
                        assert!(g.estimated_visible_cards > 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_xlarge_posters_become_a_strip() {
        let solver = GridSolver::default();
        let prefs = LayoutPreferences::new(
            PosterSize::XLarge,
            ImageType::Poster,
            GridDirection::Horizontal,
        );
        let g = solver
            .solve(Viewport::new(1920.0, 949.4), prefs, movies(), 1.15)
            .unwrap();
        assert_eq!(g.line_count, 0);
        assert_eq!(g.visible_stride, MIN_NUM_CARDS as usize);
        assert!(g.card_height as f64 * 1.15 <= 949.4);
    }

    #[test]
    fn test_music_folder_uses_square_tiles() {
        let solver = GridSolver::default();
        let music = FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Music));
        let g = solver
            .solve(
                Viewport::new(1920.0, 1080.0),
                LayoutPreferences::default(),
                music,
                1.15,
            )
            .unwrap();
        assert!(g.card_width.abs_diff(g.card_height) <= 1);
    }

    #[test]
    fn test_list_uses_fixed_sizes() {
        let solver = GridSolver::default();
        let viewport = Viewport::new(1920.0, 949.4);
        let thumbs = LayoutPreferences::new(PosterSize::Medium, ImageType::Thumb, GridDirection::List);
        let g = solver.solve(viewport, thumbs, movies(), 1.15).unwrap();
        assert_eq!((g.card_width, g.card_height), (328, 222));
        assert_eq!(g.line_count, 1);

        let posters = LayoutPreferences::new(PosterSize::Medium, ImageType::Poster, GridDirection::List);
        let g = solver.solve(viewport, posters, movies(), 1.15).unwrap();
        assert_eq!((g.card_width, g.card_height), (190, 285));
    }

    #[test]
    fn test_list_solve_does_not_leak_into_rows() {
        let viewport = Viewport::new(1920.0, 711.0);
        let rows = LayoutPreferences::default();
        let fresh = GridSolver::default().solve(viewport, rows, movies(), 1.15).unwrap();
        assert_eq!((fresh.card_width, fresh.card_height), (126, 190));

        // A list poster is 190 wide; the row layout above is 190 tall.
        let solver = GridSolver::default();
        let list = LayoutPreferences::new(PosterSize::Medium, ImageType::Poster, GridDirection::List);
        let g = solver.solve(viewport, list, movies(), 1.15).unwrap();
        assert_eq!((g.card_width, g.card_height), (190, 285));
        let after = solver.solve(viewport, rows, movies(), 1.15).unwrap();
        assert_eq!(after, fresh);
    }

    #[test]
    fn test_narrow_columns_keep_card_aspect() {
        let solver = GridSolver::default();
        let prefs = LayoutPreferences::new(PosterSize::Small, ImageType::Poster, GridDirection::Vertical);
        let g = solver
            .solve(Viewport::new(318.3, 600.0), prefs, movies(), 1.15)
            .unwrap();
        assert_eq!(g.line_count, 13);
        assert_eq!((g.card_width, g.card_height), (18, 27));
        assert!(g.occupied_primary() as f64 <= 318.3);
    }

    #[test]
    fn test_repeat_solve_hits_cache() {
        let solver = GridSolver::default();
        let viewport = Viewport::new(1920.0, 1080.0);
        let prefs = LayoutPreferences::default();
        let first = solver.solve(viewport, prefs, movies(), 1.15).unwrap();
        let second = solver.solve(viewport, prefs, movies(), 1.15).unwrap();
        assert_eq!(first, second);
        assert_eq!(solver.computations(), 1);

        let artists = FolderKind::new(ItemCategory::MusicArtist, None);
        solver.solve(viewport, prefs, artists, 1.15).unwrap();
        assert_eq!(solver.computations(), 2);
    }

    #[test]
    fn test_rejects_unusable_input() {
        let solver = GridSolver::default();
        let prefs = LayoutPreferences::default();
        let err = solver
            .solve(Viewport::new(0.0, 1080.0), prefs, movies(), 1.15)
            .unwrap_err();
        assert!(matches!(err, BrowseError::InvalidConfiguration(_)));
        let err = solver
            .solve(Viewport::new(1920.0, 1080.0), prefs, movies(), f64::NAN)
            .unwrap_err();
        assert!(matches!(err, BrowseError::InvalidConfiguration(_)));
        assert_eq!(solver.computations(), 0);
    }

    #[test]
    fn test_viewport_from_display() {
        let viewport = viewport_from_display(3840, 2160, 2.0, DEFAULT_CHROME_HEIGHT);
        assert_eq!(viewport.width, 1920.0);
        assert!((viewport.height - 949.4).abs() < 1e-9);
        let fallback = default_viewport_from_display(1920, 1080, 0.0);
        assert_eq!(fallback.width, 1920.0);
    }
}
