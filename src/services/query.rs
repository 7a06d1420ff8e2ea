//! The catalog query contract and an in-memory implementation.
//!
//! [`InMemoryCatalog`] applies filtering, ordering and paging itself, the way
//! a real server would, so the browse layer can be exercised end to end
//! without a network.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::error::QueryError;
use crate::models::{
    CatalogItem, GenreNormalizer, ItemCategory, ItemId, ItemPage, ItemQuery, QueryKind, SortKey,
    SortOrder,
};

/// Source of catalog pages.
///
/// Results are ordered by the server; `total_count` is the size of the whole
/// filtered result, not of the returned page.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query_items(&self, query: ItemQuery) -> Result<ItemPage, QueryError>;

    /// Current state of one item.
    async fn fetch_item(&self, id: ItemId) -> Result<CatalogItem, QueryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<CatalogItem>>,
    genres: GenreNormalizer,
    queries: AtomicUsize,
    fetches: AtomicUsize,
    failures: Mutex<Vec<QueryError>>,
    offsets: Mutex<Vec<usize>>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
            ..Default::default()
        }
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// The next call (query or fetch) fails with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, error: QueryError) {
        self.failures.lock().insert(0, error);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Offsets of every `query_items` call, in call order.
    pub fn requested_offsets(&self) -> Vec<usize> {
        self.offsets.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn set_played(&self, id: ItemId, played: bool) -> bool {
        self.update(id, |item| item.user_data.played = played)
    }

    pub fn set_favorite(&self, id: ItemId, favorite: bool) -> bool {
        self.update(id, |item| item.user_data.favorite = favorite)
    }

    fn update(&self, id: ItemId, change: impl FnOnce(&mut CatalogItem)) -> bool {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                change(item);
                true
            }
            None => false,
        }
    }

    async fn simulate_call(&self) -> Result<(), QueryError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.lock().pop() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn matches(&self, item: &CatalogItem, query: &ItemQuery) -> bool {
        let kind_ok = match query.kind {
            QueryKind::Items => true,
            QueryKind::NextUp => item.category == ItemCategory::Episode && !item.is_played(),
            QueryKind::Views => matches!(
                item.category,
                ItemCategory::CollectionFolder | ItemCategory::UserView
            ),
            QueryKind::SimilarSeries => item.category == ItemCategory::Series,
            QueryKind::SimilarMovies => item.category == ItemCategory::Movie,
            QueryKind::LiveTvChannel => item.category == ItemCategory::TvChannel,
            QueryKind::LiveTvProgram => item.category == ItemCategory::TvProgram,
            QueryKind::LiveTvRecording => item.category == ItemCategory::Recording,
            QueryKind::Artists | QueryKind::AlbumArtists => {
                item.category == ItemCategory::MusicArtist
            }
        };
        if !kind_ok || Some(item.id) == query.base.similar_to {
            return false;
        }
        if !query.base.include_categories.is_empty()
            && !query.base.include_categories.contains(&item.category)
        {
            return false;
        }
        if !query.filters.admits(item) {
            return false;
        }
        if let Some(genre) = &query.genre {
            if !item.genres.iter().any(|g| self.genres.same_genre(g, genre)) {
                return false;
            }
        }
        if let Some(letter) = query.start_letter {
            // Names at or after the letter, like a "starts with or greater" filter.
            let first = item
                .sort_name()
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase());
            if first.map_or(true, |c| c < letter) {
                return false;
            }
        }
        true
    }
}

fn compare(a: &CatalogItem, b: &CatalogItem, key: SortKey) -> CmpOrdering {
    fn float(a: Option<f32>, b: Option<f32>) -> CmpOrdering {
        a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
    }
    let by_name = || {
        a.sort_name()
            .to_lowercase()
            .cmp(&b.sort_name().to_lowercase())
    };
    let primary = match key {
        SortKey::SortName | SortKey::Random => CmpOrdering::Equal,
        SortKey::DateCreated => a.date_created.cmp(&b.date_created),
        SortKey::PremiereDate => a.premiere_date.cmp(&b.premiere_date),
        SortKey::OfficialRating => a.official_rating.cmp(&b.official_rating),
        SortKey::CommunityRating => float(a.community_rating, b.community_rating),
        SortKey::CriticRating => float(a.critic_rating, b.critic_rating),
        SortKey::DatePlayed | SortKey::SeriesDatePlayed => {
            a.user_data.last_played.cmp(&b.user_data.last_played)
        }
        SortKey::Runtime => a.runtime_ticks.cmp(&b.runtime_ticks),
        SortKey::ProductionYear => a.production_year.cmp(&b.production_year),
    };
    primary.then_with(by_name)
}

#[async_trait]
impl QueryService for InMemoryCatalog {
    async fn query_items(&self, query: ItemQuery) -> Result<ItemPage, QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.offsets.lock().push(query.offset);
        self.simulate_call().await?;

        let mut matching: Vec<CatalogItem> = self
            .items
            .read()
            .iter()
            .filter(|item| self.matches(item, &query))
            .cloned()
            .collect();
        // Random keeps catalog order so results stay reproducible.
        if query.sort_key != SortKey::Random {
            matching.sort_by(|a, b| compare(a, b, query.sort_key));
            if query.sort_order == SortOrder::Descending {
                matching.reverse();
            }
        }

        let total_count = matching.len();
        let items: Vec<CatalogItem> = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        trace!(
            offset = query.offset,
            limit = query.limit,
            returned = items.len(),
            total = total_count,
            "catalog query"
        );
        Ok(ItemPage { items, total_count })
    }

    async fn fetch_item(&self, id: ItemId) -> Result<CatalogItem, QueryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        self.items
            .read()
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }
}
