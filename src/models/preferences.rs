use std::fmt;
use std::str::FromStr;

use crate::error::BrowseError;
use crate::models::request::{FilterOptions, SortKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PosterSize {
    Smallest,
    Small,
    #[default]
    Medium,
    Large,
    XLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    #[default]
    Poster,
    Thumb,
    Banner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GridDirection {
    #[default]
    Horizontal,
    Vertical,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchedIndicatorBehavior {
    #[default]
    Always,
    EpisodesOnly,
    Never,
}

macro_rules! preference_enum_str {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = BrowseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(BrowseError::InvalidConfiguration(format!(
                        "unknown {} value {:?}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

preference_enum_str!(PosterSize {
    Smallest => "SMALLEST",
    Small => "SMALL",
    Medium => "MED",
    Large => "LARGE",
    XLarge => "X_LARGE",
});

preference_enum_str!(ImageType {
    Poster => "POSTER",
    Thumb => "THUMB",
    Banner => "BANNER",
});

preference_enum_str!(GridDirection {
    Horizontal => "HORIZONTAL",
    Vertical => "VERTICAL",
    List => "LIST",
});

preference_enum_str!(WatchedIndicatorBehavior {
    Always => "ALWAYS",
    EpisodesOnly => "EPISODES_ONLY",
    Never => "NEVER",
});

/// The three user choices that shape the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutPreferences {
    pub poster_size: PosterSize,
    pub image_type: ImageType,
    pub direction: GridDirection,
}

impl LayoutPreferences {
    pub fn new(poster_size: PosterSize, image_type: ImageType, direction: GridDirection) -> Self {
        Self {
            poster_size,
            image_type,
            direction,
        }
    }
}

/// Per-library display preferences, keyed by the folder's display
/// preferences id in the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryPreferences {
    pub layout: LayoutPreferences,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub filters: FilterOptions,
}

/// Global card badge preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BadgePreferences {
    pub watched_indicator: WatchedIndicatorBehavior,
    pub show_resolution: bool,
    pub show_audio_codec: bool,
}
