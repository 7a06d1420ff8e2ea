//! Per-item visual shape resolution.
//!
//! Every catalog category maps to exactly one arm of [`resolve`]; there is no
//! fallible path, unknown categories take the fallback rule.

use std::ops::RangeInclusive;

use crate::models::{FolderKind, ImageType, ItemCategory};

pub const ASPECT_RATIO_2_3: f64 = 2.0 / 3.0;
pub const ASPECT_RATIO_16_9: f64 = 16.0 / 9.0;
pub const ASPECT_RATIO_7_9: f64 = 7.0 / 9.0;
pub const ASPECT_RATIO_BANNER: f64 = 1000.0 / 185.0;
pub const ASPECT_RATIO_SQUARE: f64 = 1.0;

/// Declared aspects outside this range are treated as missing.
const SANE_ASPECT: RangeInclusive<f64> = 0.1..=10.0;

/// Music art narrower than this is shown square.
const MUSIC_SQUARE_THRESHOLD: f64 = 0.8;

/// Live TV programs always render at this size.
pub const PROGRAM_CARD_SIZE: (u32, u32) = (192, 129);

/// Artwork shown until the real image resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Blank,
    Video,
    Audio,
    Person,
    Folder,
    Photo,
    Tv,
    Blur,
    Chapter,
    SeriesTimer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectQuery {
    pub category: ItemCategory,
    pub hint: Option<f64>,
    /// `None` when the surrounding row does not force a shape.
    pub image_type: Option<ImageType>,
    pub uniform_aspect: bool,
    pub prefer_series_poster: bool,
}

impl AspectQuery {
    pub fn new(category: ItemCategory) -> Self {
        Self {
            category,
            hint: None,
            image_type: None,
            uniform_aspect: false,
            prefer_series_poster: false,
        }
    }

    pub fn hint(mut self, hint: Option<f64>) -> Self {
        self.hint = hint;
        self
    }

    pub fn image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = Some(image_type);
        self
    }

    pub fn uniform_aspect(mut self, uniform: bool) -> Self {
        self.uniform_aspect = uniform;
        self
    }

    pub fn prefer_series_poster(mut self, prefer: bool) -> Self {
        self.prefer_series_poster = prefer;
        self
    }
}

/// Result of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardShape {
    /// Width / height.
    pub aspect: f64,
    pub placeholder: PlaceholderKind,
    pub show_watched_badge: bool,
    pub show_progress_badge: bool,
    /// Caller may look up resolution/codec badges (subject to preferences).
    pub wants_media_badges: bool,
    pub user_view: bool,
    /// Card shows its text below the image regardless of row settings.
    pub info_under: bool,
    /// Logo-style art scaled to fit rather than cropped.
    pub fit_center: bool,
    pub fixed_size: Option<(u32, u32)>,
}

impl CardShape {
    fn new(aspect: f64, placeholder: PlaceholderKind) -> Self {
        Self {
            aspect,
            placeholder,
            show_watched_badge: true,
            show_progress_badge: false,
            wants_media_badges: false,
            user_view: false,
            info_under: false,
            fit_center: false,
            fixed_size: None,
        }
    }
}

fn sane(hint: Option<f64>) -> Option<f64> {
    hint.filter(|aspect| aspect.is_finite() && SANE_ASPECT.contains(aspect))
}

/// Aspect forced by an explicit row shape, if any.
fn shape_override(image_type: Option<ImageType>) -> Option<f64> {
    match image_type {
        Some(ImageType::Banner) => Some(ASPECT_RATIO_BANNER),
        Some(ImageType::Thumb) => Some(ASPECT_RATIO_16_9),
        Some(ImageType::Poster) | None => None,
    }
}

/// Resolves aspect, placeholder and badge policy for one item.
pub fn resolve(query: &AspectQuery) -> CardShape {
    let hint = sane(query.hint);
    let mut shape = match query.category {
        ItemCategory::Audio | ItemCategory::MusicAlbum | ItemCategory::MusicArtist => {
            let natural = hint.unwrap_or(ASPECT_RATIO_SQUARE);
            let aspect = if query.uniform_aspect || natural < MUSIC_SQUARE_THRESHOLD {
                ASPECT_RATIO_SQUARE
            } else {
                natural
            };
            let placeholder = if query.category == ItemCategory::MusicArtist {
                PlaceholderKind::Person
            } else {
                PlaceholderKind::Audio
            };
            let mut shape = CardShape::new(aspect, placeholder);
            shape.show_watched_badge = false;
            shape
        }
        ItemCategory::Series | ItemCategory::Season => {
            CardShape::new(ASPECT_RATIO_2_3, PlaceholderKind::Blank)
        }
        ItemCategory::Episode if query.prefer_series_poster => {
            CardShape::new(ASPECT_RATIO_2_3, PlaceholderKind::Blank)
        }
        ItemCategory::Episode => {
            let mut shape = CardShape::new(ASPECT_RATIO_16_9, PlaceholderKind::Blank);
            shape.show_progress_badge = true;
            shape.info_under = true;
            shape
        }
        // Compatibility shim: the server reports 1.0 for library views, so the
        // declared aspect is ignored. Drop once the server value is fixed.
        ItemCategory::CollectionFolder | ItemCategory::UserView => {
            let mut shape = CardShape::new(ASPECT_RATIO_16_9, PlaceholderKind::Blank);
            shape.user_view = true;
            shape
        }
        ItemCategory::Movie | ItemCategory::Video => {
            let mut shape = CardShape::new(ASPECT_RATIO_2_3, PlaceholderKind::Blank);
            shape.show_progress_badge = true;
            shape.wants_media_badges = query.category == ItemCategory::Movie;
            shape
        }
        ItemCategory::TvChannel => {
            let mut shape = CardShape::new(hint.unwrap_or(ASPECT_RATIO_SQUARE), PlaceholderKind::Tv);
            shape.fit_center = true;
            shape
        }
        ItemCategory::Recording => {
            CardShape::new(hint.unwrap_or(ASPECT_RATIO_7_9), PlaceholderKind::Tv)
        }
        ItemCategory::TvProgram => {
            let (w, h) = PROGRAM_CARD_SIZE;
            let mut shape = CardShape::new(w as f64 / h as f64, PlaceholderKind::Blur);
            shape.info_under = true;
            shape.fixed_size = Some(PROGRAM_CARD_SIZE);
            shape
        }
        ItemCategory::Chapter => CardShape::new(ASPECT_RATIO_16_9, PlaceholderKind::Chapter),
        ItemCategory::SeriesTimer => {
            let mut shape = CardShape::new(ASPECT_RATIO_16_9, PlaceholderKind::SeriesTimer);
            shape.info_under = true;
            shape
        }
        ItemCategory::GridButton => CardShape::new(ASPECT_RATIO_7_9, PlaceholderKind::Video),
        ItemCategory::Person => {
            CardShape::new(hint.unwrap_or(ASPECT_RATIO_2_3), PlaceholderKind::Person)
        }
        ItemCategory::Folder | ItemCategory::Genre | ItemCategory::MusicGenre => {
            CardShape::new(hint.unwrap_or(ASPECT_RATIO_2_3), PlaceholderKind::Folder)
        }
        ItemCategory::Photo => {
            let mut shape =
                CardShape::new(hint.unwrap_or(ASPECT_RATIO_2_3), PlaceholderKind::Photo);
            shape.show_watched_badge = false;
            shape
        }
        ItemCategory::PhotoAlbum | ItemCategory::Playlist => {
            let mut shape =
                CardShape::new(hint.unwrap_or(ASPECT_RATIO_2_3), PlaceholderKind::Blank);
            shape.show_watched_badge = false;
            shape
        }
        ItemCategory::BoxSet | ItemCategory::Unknown => {
            CardShape::new(hint.unwrap_or(ASPECT_RATIO_2_3), PlaceholderKind::Blank)
        }
    };

    if let Some(aspect) = shape_override(query.image_type) {
        shape.aspect = aspect;
        shape.fixed_size = None;
    }
    shape
}

/// Aspect used to size the whole grid for a folder. Only the folder's own
/// category matters here, never the categories of its children.
pub fn folder_aspect(image_type: ImageType, folder: FolderKind) -> f64 {
    match image_type {
        ImageType::Poster if folder.uses_square_tiles() => ASPECT_RATIO_SQUARE,
        ImageType::Poster => ASPECT_RATIO_2_3,
        ImageType::Thumb => ASPECT_RATIO_16_9,
        ImageType::Banner => ASPECT_RATIO_BANNER,
    }
}

/// Playback progress as a whole percentage, or `None` when there is nothing
/// to show. Division happens in floating point before rounding.
pub fn progress_percent(position_ticks: i64, runtime_ticks: Option<i64>) -> Option<u8> {
    let runtime = runtime_ticks.filter(|ticks| *ticks > 0)?;
    if position_ticks <= 0 {
        return None;
    }
    let percent = (position_ticks as f64 * 100.0 / runtime as f64).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectionType;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_explicit_shape_overrides_category() {
        let shape = resolve(
            &AspectQuery::new(ItemCategory::Movie).image_type(ImageType::Banner),
        );
        assert!(approx(shape.aspect, ASPECT_RATIO_BANNER));
        assert!(shape.show_progress_badge);

        let shape = resolve(&AspectQuery::new(ItemCategory::Series).image_type(ImageType::Thumb));
        assert!(approx(shape.aspect, ASPECT_RATIO_16_9));
    }

    #[test]
    fn test_music_goes_square_when_uniform_or_narrow() {
        let wide = AspectQuery::new(ItemCategory::MusicAlbum).hint(Some(1.3));
        assert!(approx(resolve(&wide).aspect, 1.3));
        assert!(approx(resolve(&wide.uniform_aspect(true)).aspect, 1.0));

        let narrow = AspectQuery::new(ItemCategory::Audio).hint(Some(0.7));
        let shape = resolve(&narrow);
        assert!(approx(shape.aspect, 1.0));
        assert!(!shape.show_watched_badge);
        assert_eq!(shape.placeholder, PlaceholderKind::Audio);

        let artist = resolve(&AspectQuery::new(ItemCategory::MusicArtist));
        assert_eq!(artist.placeholder, PlaceholderKind::Person);
    }

    #[test]
    fn test_episode_thumb_unless_series_poster_preferred() {
        let episode = resolve(&AspectQuery::new(ItemCategory::Episode).image_type(ImageType::Poster));
        assert!(approx(episode.aspect, ASPECT_RATIO_16_9));
        assert!(episode.show_progress_badge);

        let poster = resolve(
            &AspectQuery::new(ItemCategory::Episode)
                .image_type(ImageType::Poster)
                .prefer_series_poster(true),
        );
        assert!(approx(poster.aspect, ASPECT_RATIO_2_3));
        assert!(!poster.show_progress_badge);
    }

    #[test]
    fn test_user_views_ignore_declared_aspect() {
        let shape = resolve(&AspectQuery::new(ItemCategory::CollectionFolder).hint(Some(1.0)));
        assert!(approx(shape.aspect, ASPECT_RATIO_16_9));
        assert!(shape.user_view);
    }

    #[test]
    fn test_fallback_uses_sane_hint_only() {
        let folder = resolve(&AspectQuery::new(ItemCategory::Folder).hint(Some(1.5)));
        assert!(approx(folder.aspect, 1.5));
        assert_eq!(folder.placeholder, PlaceholderKind::Folder);

        let junk = resolve(&AspectQuery::new(ItemCategory::Unknown).hint(Some(f64::NAN)));
        assert!(approx(junk.aspect, ASPECT_RATIO_2_3));

        let extreme = resolve(&AspectQuery::new(ItemCategory::Person).hint(Some(400.0)));
        assert!(approx(extreme.aspect, ASPECT_RATIO_2_3));
    }

    #[test]
    fn test_live_tv_defaults() {
        assert!(approx(resolve(&AspectQuery::new(ItemCategory::TvChannel)).aspect, 1.0));
        assert!(approx(
            resolve(&AspectQuery::new(ItemCategory::Recording)).aspect,
            ASPECT_RATIO_7_9
        ));
        let program = resolve(&AspectQuery::new(ItemCategory::TvProgram));
        assert_eq!(program.fixed_size, Some(PROGRAM_CARD_SIZE));
    }

    #[test]
    fn test_only_movies_want_media_badges() {
        assert!(resolve(&AspectQuery::new(ItemCategory::Movie)).wants_media_badges);
        assert!(!resolve(&AspectQuery::new(ItemCategory::Video)).wants_media_badges);
    }

    #[test]
    fn test_folder_aspect_follows_folder_category() {
        let movies = FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Movies));
        assert!(approx(folder_aspect(ImageType::Poster, movies), ASPECT_RATIO_2_3));

        let artists = FolderKind::new(ItemCategory::MusicArtist, None);
        assert!(approx(folder_aspect(ImageType::Poster, artists), 1.0));
        assert!(approx(folder_aspect(ImageType::Thumb, artists), ASPECT_RATIO_16_9));
    }

    #[test]
    fn test_progress_uses_float_division() {
        assert_eq!(progress_percent(1, Some(3)), Some(33));
        assert_eq!(progress_percent(2, Some(3)), Some(67));
        assert_eq!(progress_percent(0, Some(3)), None);
        assert_eq!(progress_percent(5, Some(0)), None);
        assert_eq!(progress_percent(5, None), None);
    }
}
