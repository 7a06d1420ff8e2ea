//! Text shown around the grid: the filter status line, the position counter
//! and the focused item's info line.

use crate::models::{CatalogItem, FilterOptions};

const INFO_SEPARATOR: &str = "  •  ";

/// Fling velocity beyond which the grid would outrun image loading.
pub const MAX_FLING_VELOCITY: i32 = 6000;

/// Active narrowing of the current grid, as shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusContext<'a> {
    pub folder_name: &'a str,
    pub filters: FilterOptions,
    /// Label of the active sort, if one is set.
    pub sort_label: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub start_letter: Option<char>,
}

/// "Showing ... from <folder>" plus only the clauses that are active.
pub fn status_text(ctx: &StatusContext<'_>) -> String {
    let mut text = String::from("Showing ");
    if ctx.filters.is_active() {
        let mut parts = Vec::with_capacity(2);
        if ctx.filters.unwatched_only {
            parts.push("Unwatched");
        }
        if ctx.filters.favorite_only {
            parts.push("Favorites");
        }
        text.push_str(&parts.join(" "));
    } else {
        text.push_str("all items");
    }
    text.push_str(" from ");
    text.push_str(ctx.folder_name);
    if let Some(sort) = ctx.sort_label {
        text.push_str(" sorted by ");
        text.push_str(sort);
    }
    if let Some(genre) = ctx.genre.filter(|g| !g.is_empty()) {
        text.push_str(", Genre: ");
        text.push_str(genre);
    }
    if let Some(letter) = ctx.start_letter {
        text.push_str(" starting with ");
        text.push(letter);
    }
    text
}

/// "{position} | {total}" with a 1-based position.
pub fn counter_text(index: usize, total: usize) -> String {
    format!("{} | {}", index + 1, total)
}

/// "1h 32m" or "45m".
pub fn format_runtime(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticVerdict {
    Fresh,
    Rotten,
}

/// Text for the focused item's title area.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInfo {
    /// Name, runtime and year joined by a bullet.
    pub title: String,
    pub community_rating: Option<String>,
    pub critic_rating: Option<(String, CriticVerdict)>,
}

impl ItemInfo {
    pub fn for_item(item: &CatalogItem) -> Self {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if !item.name.is_empty() {
            parts.push(item.name.clone());
        }
        if let Some(minutes) = item.runtime_minutes() {
            parts.push(format_runtime(minutes));
        }
        if let Some(year) = item.production_year {
            parts.push(year.to_string());
        }

        let community_rating = item
            .community_rating
            .filter(|rating| *rating > 0.0)
            .map(|rating| format!("{rating:.1}"));
        let critic_rating = item
            .critic_rating
            .filter(|rating| *rating > 0.0)
            .map(|rating| {
                let verdict = if rating >= 60.0 {
                    CriticVerdict::Fresh
                } else {
                    CriticVerdict::Rotten
                };
                (format!("{rating:.0}%"), verdict)
            });

        Self {
            title: parts.join(INFO_SEPARATOR),
            community_rating,
            critic_rating,
        }
    }

    /// Single-line rendering for sinks that only take text.
    pub fn line(&self) -> String {
        let mut line = self.title.clone();
        if let Some(rating) = &self.community_rating {
            line.push_str(INFO_SEPARATOR);
            line.push_str(rating);
        }
        if let Some((rating, _)) = &self.critic_rating {
            line.push_str(INFO_SEPARATOR);
            line.push_str(rating);
        }
        line
    }
}

/// Caps both fling components to [`MAX_FLING_VELOCITY`].
pub fn clamp_fling(velocity_x: i32, velocity_y: i32) -> (i32, i32) {
    (
        velocity_x.clamp(-MAX_FLING_VELOCITY, MAX_FLING_VELOCITY),
        velocity_y.clamp(-MAX_FLING_VELOCITY, MAX_FLING_VELOCITY),
    )
}
