//! Turns a [`CatalogItem`] into the sized, badged card model the view layer
//! draws.

use crate::layout::aspect::{self, AspectQuery, CardShape};
use crate::models::{
    BadgePreferences, CatalogItem, GridDirection, ImageType, ItemCategory, ItemId, LocationType,
    WatchedIndicatorBehavior,
};

/// Replaces a card width that collapsed below this.
const DEGENERATE_WIDTH: u32 = 5;

/// Width used instead of a degenerate one.
pub const MIN_LEGIBLE_WIDTH: u32 = 115;

/// Card heights for a row; which one applies depends on the item aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardHeights {
    pub landscape: u32,
    pub portrait: u32,
    pub static_height: u32,
}

impl CardHeights {
    /// All three heights the same, as a grid with a solved card height uses.
    pub fn uniform(height: u32) -> Self {
        Self {
            landscape: height,
            portrait: height,
            static_height: height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedBadge {
    None,
    Played,
    Unplayed(u32),
}

/// Corner banner drawn over the card art.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeBanner {
    Future,
    Missing,
    Disc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionBadge {
    Sd,
    Hd,
    FullHd,
    Uhd4k,
}

impl ResolutionBadge {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= 3800 || height >= 2000 {
            Self::Uhd4k
        } else if width >= 1800 || height >= 1000 {
            Self::FullHd
        } else if width >= 1280 || height >= 720 {
            Self::Hd
        } else {
            Self::Sd
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uhd4k => "4K",
            Self::FullHd => "FHD",
            Self::Hd => "HD",
            Self::Sd => "SD",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardModel {
    pub id: ItemId,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub shape: CardShape,
    pub watched: WatchedBadge,
    pub progress: Option<u8>,
    pub edge_banner: Option<EdgeBanner>,
    pub resolution: Option<ResolutionBadge>,
    pub audio_codec: Option<String>,
}

/// Per-row card settings.
#[derive(Debug, Clone)]
pub struct CardResolver {
    pub heights: CardHeights,
    /// Row-level shape; `None` lets each item pick its own aspect.
    pub image_type: Option<ImageType>,
    pub direction: GridDirection,
    pub uniform_aspect: bool,
    pub static_height: bool,
    pub badges: BadgePreferences,
}

impl CardResolver {
    pub fn new(heights: CardHeights, image_type: Option<ImageType>, direction: GridDirection) -> Self {
        Self {
            heights,
            image_type,
            direction,
            uniform_aspect: false,
            static_height: false,
            badges: BadgePreferences::default(),
        }
    }

    pub fn with_badges(mut self, badges: BadgePreferences) -> Self {
        self.badges = badges;
        self
    }

    pub fn with_uniform_aspect(mut self, uniform: bool) -> Self {
        self.uniform_aspect = uniform;
        self
    }

    pub fn with_static_height(mut self, static_height: bool) -> Self {
        self.static_height = static_height;
        self
    }

    /// Builds the card for `item`; `now` is unix seconds and only decides
    /// future/missing banners.
    pub fn card_for(&self, item: &CatalogItem, now: i64) -> CardModel {
        let mut query = AspectQuery::new(item.category)
            .hint(item.aspect_hint())
            .uniform_aspect(self.uniform_aspect)
            .prefer_series_poster(item.prefer_series_poster);
        query.image_type = self.image_type;
        let shape = aspect::resolve(&query);

        let (width, height) = self.dimensions(&shape);
        let progress = if shape.show_progress_badge {
            aspect::progress_percent(item.user_data.playback_position_ticks, item.runtime_ticks)
        } else {
            None
        };
        let media_badges = shape.wants_media_badges && item.category == ItemCategory::Movie;

        CardModel {
            id: item.id,
            title: item.name.clone(),
            width,
            height,
            shape,
            watched: self.watched_badge(item, &shape),
            progress,
            edge_banner: edge_banner(item, now),
            resolution: if media_badges && self.badges.show_resolution {
                item.video_dimensions()
                    .map(|(w, h)| ResolutionBadge::from_dimensions(w, h))
            } else {
                None
            },
            audio_codec: if media_badges && self.badges.show_audio_codec {
                item.audio_codec().map(str::to_uppercase)
            } else {
                None
            },
        }
    }

    fn dimensions(&self, shape: &CardShape) -> (u32, u32) {
        if let Some(fixed) = shape.fixed_size {
            return fixed;
        }
        let height = if self.static_height {
            self.heights.static_height
        } else if shape.aspect > 1.0 {
            self.heights.landscape
        } else {
            self.heights.portrait
        };
        let mut width = (shape.aspect * height as f64) as u32;
        let mut height = height;

        if self.direction == GridDirection::List {
            if let Some(list_width) = self.image_type.map(list_card_width) {
                width = list_width;
                height = (list_width as f64 / shape.aspect).round() as u32;
            }
        }
        if width < DEGENERATE_WIDTH {
            width = MIN_LEGIBLE_WIDTH;
        }
        (width, height)
    }

    fn watched_badge(&self, item: &CatalogItem, shape: &CardShape) -> WatchedBadge {
        if !shape.show_watched_badge {
            return WatchedBadge::None;
        }
        let behavior = self.badges.watched_indicator;
        if item.is_played() {
            let shown = match behavior {
                WatchedIndicatorBehavior::Always => true,
                WatchedIndicatorBehavior::EpisodesOnly => item.category == ItemCategory::Episode,
                WatchedIndicatorBehavior::Never => false,
            };
            return if shown {
                WatchedBadge::Played
            } else {
                WatchedBadge::None
            };
        }
        match item.user_data.unplayed_item_count {
            Some(count) if count > 0 && behavior != WatchedIndicatorBehavior::Never => {
                WatchedBadge::Unplayed(count)
            }
            _ => WatchedBadge::None,
        }
    }
}

fn list_card_width(image_type: ImageType) -> u32 {
    match image_type {
        ImageType::Poster => 190,
        ImageType::Banner => 90,
        ImageType::Thumb => 300,
    }
}

fn edge_banner(item: &CatalogItem, now: i64) -> Option<EdgeBanner> {
    if item.is_placeholder {
        return Some(EdgeBanner::Disc);
    }
    if item.location_type != Some(LocationType::Virtual) {
        return None;
    }
    match item.category {
        ItemCategory::Episode if !item.prefer_series_poster => {
            match item.premiere_date {
                Some(premiere) if premiere <= now => Some(EdgeBanner::Missing),
                _ => Some(EdgeBanner::Future),
            }
        }
        ItemCategory::TvProgram => item
            .start_date
            .filter(|start| *start > now)
            .map(|_| EdgeBanner::Future),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::aspect::PROGRAM_CARD_SIZE;
    use crate::models::{MediaStream, UserData, TICKS_PER_MINUTE};

    const NOW: i64 = 1_700_000_000;

    fn resolver() -> CardResolver {
        CardResolver::new(
            CardHeights {
                landscape: 150,
                portrait: 300,
                static_height: 200,
            },
            None,
            GridDirection::Horizontal,
        )
    }

    fn movie() -> CatalogItem {
        CatalogItem::new(ItemId::from_u128(1), "Heat", ItemCategory::Movie).with_runtime_minutes(100)
    }

    #[test]
    fn test_height_follows_aspect() {
        let card = resolver().card_for(&movie(), NOW);
        assert_eq!((card.width, card.height), (200, 300));

        let episode = CatalogItem::new(ItemId::from_u128(2), "Pilot", ItemCategory::Episode);
        let card = resolver().card_for(&episode, NOW);
        assert_eq!(card.height, 150);
        assert_eq!(card.width, 266);

        let card = resolver().with_static_height(true).card_for(&movie(), NOW);
        assert_eq!(card.height, 200);
    }

    #[test]
    fn test_reported_aspect_sizes_album_cards() {
        let album = CatalogItem::new(ItemId::from_u128(4), "Wide", ItemCategory::MusicAlbum)
            .with_aspect_ratio(1.3);
        let card = resolver().card_for(&album, NOW);
        assert!((card.shape.aspect - 1.3).abs() < 1e-9);
        assert_eq!((card.width, card.height), (195, 150));

        let card = resolver().with_uniform_aspect(true).card_for(&album, NOW);
        assert_eq!((card.width, card.height), (300, 300));
    }

    #[test]
    fn test_list_cards_use_fixed_widths() {
        let list = CardResolver::new(
            CardHeights::uniform(300),
            Some(ImageType::Poster),
            GridDirection::List,
        );
        let card = list.card_for(&movie(), NOW);
        assert_eq!((card.width, card.height), (190, 285));
    }

    #[test]
    fn test_degenerate_width_is_replaced() {
        let tiny = CardResolver::new(CardHeights::uniform(2), None, GridDirection::Vertical);
        let card = tiny.card_for(&movie(), NOW);
        assert_eq!(card.width, MIN_LEGIBLE_WIDTH);
    }

    #[test]
    fn test_program_cards_are_fixed() {
        let program = CatalogItem::new(ItemId::from_u128(3), "News", ItemCategory::TvProgram);
        let card = resolver().card_for(&program, NOW);
        assert_eq!((card.width, card.height), PROGRAM_CARD_SIZE);
    }

    #[test]
    fn test_watched_badge_behaviors() {
        let played = movie().with_user_data(UserData {
            played: true,
            ..Default::default()
        });
        assert_eq!(resolver().card_for(&played, NOW).watched, WatchedBadge::Played);

        let mut episodes_only = resolver();
        episodes_only.badges.watched_indicator = WatchedIndicatorBehavior::EpisodesOnly;
        assert_eq!(episodes_only.card_for(&played, NOW).watched, WatchedBadge::None);

        let series = CatalogItem::new(ItemId::from_u128(4), "Lost", ItemCategory::Series)
            .with_user_data(UserData {
                unplayed_item_count: Some(7),
                ..Default::default()
            });
        assert_eq!(resolver().card_for(&series, NOW).watched, WatchedBadge::Unplayed(7));

        let mut never = resolver();
        never.badges.watched_indicator = WatchedIndicatorBehavior::Never;
        assert_eq!(never.card_for(&series, NOW).watched, WatchedBadge::None);

        let album = CatalogItem::new(ItemId::from_u128(5), "Blue", ItemCategory::MusicAlbum)
            .with_user_data(UserData {
                played: true,
                ..Default::default()
            });
        assert_eq!(resolver().card_for(&album, NOW).watched, WatchedBadge::None);
    }

    #[test]
    fn test_progress_only_for_progress_categories() {
        let watching = movie().with_user_data(UserData {
            playback_position_ticks: 25 * TICKS_PER_MINUTE,
            ..Default::default()
        });
        assert_eq!(resolver().card_for(&watching, NOW).progress, Some(25));

        let mut series = watching.clone();
        series.category = ItemCategory::Series;
        assert_eq!(resolver().card_for(&series, NOW).progress, None);
    }

    #[test]
    fn test_edge_banners() {
        let mut episode = CatalogItem::new(ItemId::from_u128(6), "S01E09", ItemCategory::Episode);
        episode.location_type = Some(LocationType::Virtual);
        assert_eq!(resolver().card_for(&episode, NOW).edge_banner, Some(EdgeBanner::Future));
        episode.premiere_date = Some(NOW - 86_400);
        assert_eq!(resolver().card_for(&episode, NOW).edge_banner, Some(EdgeBanner::Missing));

        let mut disc = movie();
        disc.is_placeholder = true;
        assert_eq!(resolver().card_for(&disc, NOW).edge_banner, Some(EdgeBanner::Disc));

        let mut program = CatalogItem::new(ItemId::from_u128(7), "Late", ItemCategory::TvProgram);
        program.location_type = Some(LocationType::Virtual);
        program.start_date = Some(NOW + 3600);
        assert_eq!(resolver().card_for(&program, NOW).edge_banner, Some(EdgeBanner::Future));
    }

    #[test]
    fn test_media_badges_are_gated() {
        let mut uhd = movie();
        uhd.media_streams = vec![MediaStream::video(3840, 1600), MediaStream::audio("truehd")];
        let card = resolver().card_for(&uhd, NOW);
        assert_eq!(card.resolution, None);
        assert_eq!(card.audio_codec, None);

        let badged = resolver().with_badges(BadgePreferences {
            watched_indicator: WatchedIndicatorBehavior::Always,
            show_resolution: true,
            show_audio_codec: true,
        });
        let card = badged.card_for(&uhd, NOW);
        assert_eq!(card.resolution, Some(ResolutionBadge::Uhd4k));
        assert_eq!(card.audio_codec.as_deref(), Some("TRUEHD"));
    }

    #[test]
    fn test_resolution_thresholds() {
        assert_eq!(ResolutionBadge::from_dimensions(1920, 800), ResolutionBadge::FullHd);
        assert_eq!(ResolutionBadge::from_dimensions(1440, 1080), ResolutionBadge::FullHd);
        assert_eq!(ResolutionBadge::from_dimensions(1280, 534), ResolutionBadge::Hd);
        assert_eq!(ResolutionBadge::from_dimensions(720, 480), ResolutionBadge::Sd);
        assert_eq!(ResolutionBadge::Uhd4k.label(), "4K");
    }
}
