//! Browse requests and the paged query contract.
//!
//! A [`BrowseRequest`] describes what a grid shows. Its [`RequestIdentity`]
//! covers only the parts that require a brand-new collection (query kind,
//! base parameters, chunking); sort, filter, genre and start-letter changes
//! keep the identity and reset the existing collection instead.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

use crate::models::{CatalogItem, ItemCategory, ItemId};

/// Which server endpoint feeds the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Items,
    NextUp,
    Views,
    SimilarSeries,
    SimilarMovies,
    LiveTvChannel,
    LiveTvProgram,
    LiveTvRecording,
    Artists,
    AlbumArtists,
}

impl QueryKind {
    /// Whether the endpoint supports offset paging. The others return their
    /// whole result in the first response.
    pub fn is_paged(&self) -> bool {
        matches!(
            self,
            Self::Items
                | Self::LiveTvChannel
                | Self::LiveTvRecording
                | Self::Artists
                | Self::AlbumArtists
        )
    }

    fn tag(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    SortName,
    DateCreated,
    PremiereDate,
    OfficialRating,
    CommunityRating,
    CriticRating,
    DatePlayed,
    SeriesDatePlayed,
    Random,
    Runtime,
    ProductionYear,
}

impl SortKey {
    /// Name of the key as the server expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SortName => "SortName",
            Self::DateCreated => "DateCreated",
            Self::PremiereDate => "PremiereDate",
            Self::OfficialRating => "OfficialRating",
            Self::CommunityRating => "CommunityRating",
            Self::CriticRating => "CriticRating",
            Self::DatePlayed => "DatePlayed",
            Self::SeriesDatePlayed => "SeriesDatePlayed",
            Self::Random => "Random",
            Self::Runtime => "Runtime",
            Self::ProductionYear => "ProductionYear",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Server-side watched/favorite constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FilterOptions {
    pub favorite_only: bool,
    pub unwatched_only: bool,
}

impl FilterOptions {
    pub fn is_active(&self) -> bool {
        self.favorite_only || self.unwatched_only
    }

    /// Whether `item` still belongs in a result filtered by these options.
    pub fn admits(&self, item: &CatalogItem) -> bool {
        if self.favorite_only && !item.is_favorite() {
            return false;
        }
        if self.unwatched_only && item.is_played() {
            return false;
        }
        true
    }
}

/// Parameters that define which items a grid is about, independent of how
/// they are ordered or narrowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseQuery {
    pub parent_id: Option<ItemId>,
    pub include_categories: Vec<ItemCategory>,
    pub recursive: bool,
    pub similar_to: Option<ItemId>,
}

impl BaseQuery {
    pub fn for_parent(parent_id: ItemId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }
}

/// Hash of the parts of a request that force a collection rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestIdentity(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseRequest {
    pub kind: QueryKind,
    pub base: BaseQuery,
    pub chunk_size: usize,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub filters: FilterOptions,
    /// Already normalised.
    pub genre: Option<String>,
    /// Always upper case.
    pub start_letter: Option<char>,
    pub static_height: bool,
}

impl BrowseRequest {
    pub fn new(kind: QueryKind, base: BaseQuery, chunk_size: usize) -> Self {
        Self {
            kind,
            base,
            chunk_size: chunk_size.max(1),
            sort_key: SortKey::SortName,
            sort_order: SortOrder::Ascending,
            filters: FilterOptions::default(),
            genre: None,
            start_letter: None,
            static_height: false,
        }
    }

    pub fn with_sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_key = key;
        self.sort_order = order;
        self
    }

    pub fn with_filters(mut self, filters: FilterOptions) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_genre(mut self, genre: Option<String>) -> Self {
        self.genre = genre;
        self
    }

    pub fn with_start_letter(mut self, letter: Option<char>) -> Self {
        self.start_letter = letter.map(|c| c.to_ascii_uppercase());
        self
    }

    /// Computes the content hash over kind, base parameters and chunk size.
    pub fn identity(&self) -> RequestIdentity {
        let mut input = Vec::with_capacity(64);
        input.push(self.kind.tag());
        push_optional_id(&mut input, self.base.parent_id);
        input.push(self.base.include_categories.len() as u8);
        for category in &self.base.include_categories {
            input.push(category.tag());
        }
        input.push(self.base.recursive as u8);
        push_optional_id(&mut input, self.base.similar_to);
        input.extend_from_slice(&(self.chunk_size as u64).to_le_bytes());
        RequestIdentity(xxh3_64(&input))
    }

    /// Builds the page query for `offset`.
    pub fn page_query(&self, offset: usize) -> ItemQuery {
        ItemQuery {
            kind: self.kind,
            base: self.base.clone(),
            offset,
            limit: self.chunk_size,
            sort_key: self.sort_key,
            sort_order: self.sort_order,
            filters: self.filters,
            genre: self.genre.clone(),
            start_letter: self.start_letter,
        }
    }
}

fn push_optional_id(input: &mut Vec<u8>, id: Option<ItemId>) {
    match id {
        Some(id) => {
            input.push(1);
            input.extend_from_slice(id.as_bytes());
        }
        None => input.push(0),
    }
}

/// One page request as handed to the query service.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub kind: QueryKind,
    pub base: BaseQuery,
    pub offset: usize,
    pub limit: usize,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub filters: FilterOptions,
    pub genre: Option<String>,
    pub start_letter: Option<char>,
}

/// One page of results, in server sort order.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<CatalogItem>,
    /// Size of the full filtered result, not of this page.
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BrowseRequest {
        BrowseRequest::new(
            QueryKind::Items,
            BaseQuery::for_parent(ItemId::from_u128(7)),
            150,
        )
    }

    #[test]
    fn test_identity_ignores_sort_and_filters() {
        let base = request();
        let changed = base
            .clone()
            .with_sort(SortKey::DateCreated, SortOrder::Descending)
            .with_filters(FilterOptions {
                favorite_only: true,
                unwatched_only: true,
            })
            .with_genre(Some("drama".into()))
            .with_start_letter(Some('m'));

        assert_eq!(base.identity(), changed.identity());
    }

    #[test]
    fn test_identity_changes_on_chunking_and_parent() {
        let base = request();
        let mut bigger = base.clone();
        bigger.chunk_size = 200;
        assert_ne!(base.identity(), bigger.identity());

        let other_parent = BrowseRequest::new(
            QueryKind::Items,
            BaseQuery::for_parent(ItemId::from_u128(8)),
            150,
        );
        assert_ne!(base.identity(), other_parent.identity());

        let mut other_kind = base.clone();
        other_kind.kind = QueryKind::Artists;
        assert_ne!(base.identity(), other_kind.identity());
    }

    #[test]
    fn test_start_letter_is_upper_cased() {
        let req = request().with_start_letter(Some('m'));
        assert_eq!(req.start_letter, Some('M'));
        assert_eq!(req.page_query(300).start_letter, Some('M'));
        assert_eq!(req.page_query(300).offset, 300);
    }

    #[test]
    fn test_filters_admit() {
        let mut item = CatalogItem::new(ItemId::from_u128(1), "x", ItemCategory::Movie);
        let unwatched = FilterOptions {
            favorite_only: false,
            unwatched_only: true,
        };
        assert!(unwatched.admits(&item));
        item.user_data.played = true;
        assert!(!unwatched.admits(&item));

        let favorites = FilterOptions {
            favorite_only: true,
            unwatched_only: false,
        };
        assert!(!favorites.admits(&item));
        item.user_data.favorite = true;
        assert!(favorites.admits(&item));
    }
}
