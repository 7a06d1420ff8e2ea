use std::fmt;

use uuid::Uuid;

/// Server ticks per second (100ns units).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Server ticks per minute.
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of catalog entry, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Movie,
    Video,
    Episode,
    Series,
    Season,
    Person,
    Audio,
    MusicAlbum,
    MusicArtist,
    MusicGenre,
    Genre,
    Folder,
    CollectionFolder,
    UserView,
    BoxSet,
    Photo,
    PhotoAlbum,
    Playlist,
    TvChannel,
    TvProgram,
    Recording,
    Chapter,
    SeriesTimer,
    GridButton,
    Unknown,
}

impl ItemCategory {
    /// Maps a server type name; anything unrecognised becomes `Unknown`.
    pub fn from_server_name(name: &str) -> Self {
        match name {
            "Movie" => Self::Movie,
            "Video" => Self::Video,
            "Episode" => Self::Episode,
            "Series" => Self::Series,
            "Season" => Self::Season,
            "Person" => Self::Person,
            "Audio" => Self::Audio,
            "MusicAlbum" => Self::MusicAlbum,
            "MusicArtist" => Self::MusicArtist,
            "MusicGenre" => Self::MusicGenre,
            "Genre" => Self::Genre,
            "Folder" => Self::Folder,
            "CollectionFolder" => Self::CollectionFolder,
            "UserView" => Self::UserView,
            "BoxSet" => Self::BoxSet,
            "Photo" => Self::Photo,
            "PhotoAlbum" => Self::PhotoAlbum,
            "Playlist" => Self::Playlist,
            "TvChannel" => Self::TvChannel,
            "TvProgram" | "Program" => Self::TvProgram,
            "Recording" => Self::Recording,
            "Chapter" => Self::Chapter,
            "SeriesTimer" => Self::SeriesTimer,
            _ => Self::Unknown,
        }
    }

    pub fn tag(&self) -> u8 {
        *self as u8
    }
}

/// Content type declared on library folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionType {
    Movies,
    TvShows,
    Music,
    LiveTv,
    Unknown,
}

/// The category of the folder being browsed. Drives overall grid sizing,
/// separately from the categories of the items inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderKind {
    pub category: ItemCategory,
    pub collection_type: Option<CollectionType>,
}

impl FolderKind {
    pub fn new(category: ItemCategory, collection_type: Option<CollectionType>) -> Self {
        Self {
            category,
            collection_type,
        }
    }

    pub fn of(item: &CatalogItem) -> Self {
        Self::new(item.category, item.collection_type)
    }

    /// Music-like folders lay out square tiles in poster mode.
    pub fn uses_square_tiles(&self) -> bool {
        match self.category {
            ItemCategory::Audio
            | ItemCategory::Genre
            | ItemCategory::MusicAlbum
            | ItemCategory::MusicArtist
            | ItemCategory::MusicGenre => true,
            ItemCategory::CollectionFolder => self.collection_type == Some(CollectionType::Music),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationType {
    FileSystem,
    Remote,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub kind: StreamKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

impl MediaStream {
    pub fn video(width: u32, height: u32) -> Self {
        Self {
            kind: StreamKind::Video,
            width: Some(width),
            height: Some(height),
            codec: None,
        }
    }

    pub fn audio(codec: &str) -> Self {
        Self {
            kind: StreamKind::Audio,
            width: None,
            height: None,
            codec: Some(codec.to_string()),
        }
    }
}

/// Per-user state for an item. This is the only part of a fetched item that
/// is ever refreshed in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub played: bool,
    pub favorite: bool,
    pub playback_position_ticks: i64,
    pub unplayed_item_count: Option<u32>,
    pub last_played: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub sort_name: Option<String>,
    pub category: ItemCategory,
    pub collection_type: Option<CollectionType>,
    pub runtime_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub official_rating: Option<String>,
    pub community_rating: Option<f32>,
    pub critic_rating: Option<f32>,
    pub primary_aspect_ratio: Option<f64>,
    pub prefer_series_poster: bool,
    pub is_placeholder: bool,
    pub location_type: Option<LocationType>,
    /// Unix seconds.
    pub date_created: Option<i64>,
    /// Unix seconds.
    pub premiere_date: Option<i64>,
    /// Unix seconds; only set for programs.
    pub start_date: Option<i64>,
    pub genres: Vec<String>,
    pub user_data: UserData,
    pub media_streams: Vec<MediaStream>,
}

impl CatalogItem {
    /// Create an item with just the essential display fields
    pub fn new(id: ItemId, name: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            id,
            name: name.into(),
            sort_name: None,
            category,
            collection_type: None,
            runtime_ticks: None,
            production_year: None,
            official_rating: None,
            community_rating: None,
            critic_rating: None,
            primary_aspect_ratio: None,
            prefer_series_poster: false,
            is_placeholder: false,
            location_type: None,
            date_created: None,
            premiere_date: None,
            start_date: None,
            genres: Vec::new(),
            user_data: UserData::default(),
            media_streams: Vec::new(),
        }
    }

    pub fn with_runtime_minutes(mut self, minutes: i64) -> Self {
        self.runtime_ticks = Some(minutes * TICKS_PER_MINUTE);
        self
    }

    pub fn with_production_year(mut self, year: i32) -> Self {
        self.production_year = Some(year);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect: f64) -> Self {
        self.primary_aspect_ratio = Some(aspect);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn with_collection_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = Some(collection_type);
        self
    }

    /// Name used for ordering and start-letter matching.
    pub fn sort_name(&self) -> &str {
        self.sort_name.as_deref().unwrap_or(&self.name)
    }

    /// Declared image aspect (width / height), if the server sent one.
    pub fn aspect_hint(&self) -> Option<f64> {
        self.primary_aspect_ratio
    }

    pub fn is_played(&self) -> bool {
        self.user_data.played
    }

    pub fn is_favorite(&self) -> bool {
        self.user_data.favorite
    }

    pub fn runtime_minutes(&self) -> Option<i64> {
        self.runtime_ticks
            .filter(|ticks| *ticks > 0)
            .map(|ticks| ticks / TICKS_PER_MINUTE)
    }

    /// Replace the refreshable part of the item.
    pub fn apply_user_data(&mut self, user_data: UserData) {
        self.user_data = user_data;
    }

    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.media_streams
            .iter()
            .filter(|stream| stream.kind == StreamKind::Video)
            .find_map(|stream| match (stream.width, stream.height) {
                (Some(w), Some(h)) => Some((w, h)),
                _ => None,
            })
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.media_streams
            .iter()
            .filter(|stream| stream.kind == StreamKind::Audio)
            .find_map(|stream| stream.codec.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_names_map_to_categories() {
        assert_eq!(ItemCategory::from_server_name("Movie"), ItemCategory::Movie);
        assert_eq!(
            ItemCategory::from_server_name("MusicArtist"),
            ItemCategory::MusicArtist
        );
        assert_eq!(
            ItemCategory::from_server_name("Program"),
            ItemCategory::TvProgram
        );
        assert_eq!(
            ItemCategory::from_server_name("Hologram"),
            ItemCategory::Unknown
        );
    }

    #[test]
    fn test_sort_name_falls_back_to_name() {
        let mut item = CatalogItem::new(ItemId::from_u128(1), "The Matrix", ItemCategory::Movie);
        assert_eq!(item.sort_name(), "The Matrix");
        item.sort_name = Some("Matrix".into());
        assert_eq!(item.sort_name(), "Matrix");
    }

    #[test]
    fn test_runtime_minutes_ignores_zero() {
        let item = CatalogItem::new(ItemId::from_u128(1), "x", ItemCategory::Movie);
        assert_eq!(item.runtime_minutes(), None);
        let item = item.with_runtime_minutes(92);
        assert_eq!(item.runtime_minutes(), Some(92));
    }

    #[test]
    fn test_music_folders_use_square_tiles() {
        assert!(FolderKind::new(ItemCategory::MusicArtist, None).uses_square_tiles());
        assert!(
            FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Music))
                .uses_square_tiles()
        );
        assert!(
            !FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Movies))
                .uses_square_tiles()
        );
        assert!(!FolderKind::new(ItemCategory::Movie, None).uses_square_tiles());
    }

    #[test]
    fn test_stream_lookup() {
        let mut item = CatalogItem::new(ItemId::from_u128(1), "x", ItemCategory::Movie);
        item.media_streams = vec![MediaStream::audio("eac3"), MediaStream::video(3840, 2160)];
        assert_eq!(item.video_dimensions(), Some((3840, 2160)));
        assert_eq!(item.audio_codec(), Some("eac3"));
    }
}
