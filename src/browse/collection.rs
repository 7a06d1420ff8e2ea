//! Incrementally loaded, server-ordered item list.
//!
//! The collection never performs I/O itself. Operations that need the
//! network return a [`PageRequest`] or [`RefreshRequest`]; the caller runs it
//! and hands the result back through [`PaginatedCollection::apply_page`] or
//! [`PaginatedCollection::apply_refresh`].
//!
//! Fetching is a two-state machine:
//! - `Idle`: [`PaginatedCollection::fetch_next`] may issue a request.
//! - `Fetching`: further requests are coalesced (return `None`) until the
//!   pending ticket completes.
//!
//! Every request carries the generation it was issued under. Resets, rebuilds
//! and teardown move to a new generation, so late results for the old one are
//! rejected with [`BrowseError::StaleInstance`] instead of being applied.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::error::{BrowseError, QueryError, Result};
use crate::models::{
    BrowseRequest, CatalogItem, FilterOptions, ItemId, ItemPage, ItemQuery, RequestIdentity,
    SortKey, SortOrder,
};

/// Hands out generations that are unique across every collection sharing
/// the source.
#[derive(Debug, Clone, Default)]
pub struct GenerationSource(Arc<AtomicU64>);

impl GenerationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }
}

/// Identifies one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub generation: u64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: FetchTicket,
    pub query: ItemQuery,
}

/// Identifies one single-item refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    pub ticket: RefreshTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching { ticket: FetchTicket },
}

/// What [`PaginatedCollection::configure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// Same query identity; loaded items were dropped.
    Reset,
    /// Different query identity; the collection was rebuilt from scratch.
    Rebuilt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    pub offset: usize,
    pub appended: usize,
    pub rejected: usize,
    pub total: usize,
    pub first_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    /// The item no longer matches the active filter and was dropped.
    pub removed: bool,
    /// Position the item occupied, when it was still loaded.
    pub index: Option<usize>,
}

#[derive(Debug)]
pub struct PaginatedCollection {
    request: BrowseRequest,
    identity: RequestIdentity,
    items: Vec<CatalogItem>,
    ids: HashSet<ItemId>,
    /// `None` until the first page of the current request arrives.
    total: Option<usize>,
    state: FetchState,
    generation: u64,
    generations: GenerationSource,
    scroll_active: bool,
    /// No further pages will be requested for this generation.
    exhausted: bool,
    /// Set when a load was interrupted; the next resume starts over.
    stale: bool,
    prefetch_window: usize,
}

impl PaginatedCollection {
    pub fn new(request: BrowseRequest, prefetch_window: usize, generations: GenerationSource) -> Self {
        let generation = generations.next();
        let identity = request.identity();
        debug!(generation, chunk = request.chunk_size, kind = ?request.kind, "collection created");
        Self {
            request,
            identity,
            items: Vec::new(),
            ids: HashSet::new(),
            total: None,
            state: FetchState::Idle,
            generation,
            generations,
            scroll_active: false,
            exhausted: false,
            stale: false,
            prefetch_window,
        }
    }

    pub fn request(&self) -> &BrowseRequest {
        &self.request
    }

    pub fn identity(&self) -> RequestIdentity {
        self.identity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total reported by the server for the current request, once known.
    pub fn total_count(&self) -> Option<usize> {
        self.total
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FetchState::Fetching { .. })
    }

    pub fn is_scroll_active(&self) -> bool {
        self.scroll_active
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether another page could be requested.
    pub fn has_more(&self) -> bool {
        if self.exhausted {
            return false;
        }
        match self.total {
            None => true,
            Some(total) => self.items.len() < total,
        }
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.items.iter().position(|item| item.id == id)
    }

    /// Applies `request`. Sort, filter, genre and letter always drop loaded
    /// items; a different query identity rebuilds the collection.
    pub fn configure(&mut self, request: BrowseRequest) -> ConfigureOutcome {
        let identity = request.identity();
        let outcome = if identity == self.identity {
            ConfigureOutcome::Reset
        } else {
            ConfigureOutcome::Rebuilt
        };
        self.request = request;
        self.identity = identity;
        self.scroll_active = false;
        self.reset();
        info!(generation = self.generation, ?outcome, "collection configured");
        outcome
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) -> bool {
        if self.request.sort_key == key && self.request.sort_order == order {
            return false;
        }
        let request = self.request.clone().with_sort(key, order);
        self.configure(request);
        true
    }

    pub fn set_filters(&mut self, filters: FilterOptions) -> bool {
        if self.request.filters == filters {
            return false;
        }
        let request = self.request.clone().with_filters(filters);
        self.configure(request);
        true
    }

    /// `genre` must already be normalised.
    pub fn set_genre(&mut self, genre: Option<String>) -> bool {
        if self.request.genre == genre {
            return false;
        }
        let request = self.request.clone().with_genre(genre);
        self.configure(request);
        true
    }

    pub fn set_start_letter(&mut self, letter: Option<char>) -> bool {
        let letter = letter.map(|c| c.to_ascii_uppercase());
        if self.request.start_letter == letter {
            return false;
        }
        let request = self.request.clone().with_start_letter(letter);
        self.configure(request);
        true
    }

    fn reset(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.total = None;
        self.exhausted = false;
        self.stale = false;
        self.state = FetchState::Idle;
        self.generation = self.generations.next();
    }

    /// Requests the page after the last loaded item, unless one is already
    /// in flight or nothing remains.
    pub fn fetch_next(&mut self) -> Option<PageRequest> {
        if let FetchState::Fetching { ticket } = self.state {
            trace!(offset = ticket.offset, "fetch already in flight, coalesced");
            return None;
        }
        if !self.has_more() {
            return None;
        }
        let ticket = FetchTicket {
            generation: self.generation,
            offset: self.items.len(),
        };
        self.state = FetchState::Fetching { ticket };
        let query = self.request.page_query(ticket.offset);
        debug!(
            generation = ticket.generation,
            offset = ticket.offset,
            limit = query.limit,
            "fetch dispatched"
        );
        Some(PageRequest { ticket, query })
    }

    /// Fetches more when `index` is within the prefetch window of the end.
    /// Does nothing while scrolling.
    pub fn ensure_loaded_through(&mut self, index: usize) -> Option<PageRequest> {
        if self.scroll_active {
            return None;
        }
        if index.saturating_add(self.prefetch_window) < self.items.len() {
            return None;
        }
        self.fetch_next()
    }

    /// Records scroll state. The transition from scrolling to idle is the
    /// only scroll event that may start a fetch.
    pub fn set_scroll_active(&mut self, active: bool) -> Option<PageRequest> {
        let was_active = std::mem::replace(&mut self.scroll_active, active);
        if was_active && !active && self.has_more() {
            return self.ensure_loaded_through(self.items.len().saturating_sub(1));
        }
        None
    }

    pub fn apply_page(
        &mut self,
        ticket: FetchTicket,
        result: std::result::Result<ItemPage, QueryError>,
    ) -> Result<PageOutcome> {
        if ticket.generation != self.generation
            || self.state != (FetchState::Fetching { ticket })
        {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "stale page discarded"
            );
            return Err(BrowseError::StaleInstance {
                generation: ticket.generation,
            });
        }
        self.state = FetchState::Idle;

        let page = match result {
            Ok(page) => page,
            Err(source) => {
                warn!(offset = ticket.offset, error = %source, "page fetch failed");
                return Err(BrowseError::TransientFetch {
                    offset: ticket.offset,
                    source,
                });
            }
        };

        let first_page = ticket.offset == 0;
        let mut appended = 0;
        let mut rejected = 0;
        for item in page.items {
            if self.ids.insert(item.id) {
                self.items.push(item);
                appended += 1;
            } else {
                warn!(id = %item.id, "duplicate item rejected");
                rejected += 1;
            }
        }

        let mut total = page.total_count.max(self.items.len());
        if !self.request.kind.is_paged() {
            self.exhausted = true;
            total = self.items.len();
        } else if appended == 0 && self.items.len() < total {
            // Server claims more than it returns; stop asking.
            warn!(
                loaded = self.items.len(),
                reported = total,
                rejected,
                "page added nothing before reported total"
            );
            self.exhausted = true;
            total = self.items.len();
        }
        self.total = Some(total);

        debug!(
            generation = self.generation,
            offset = ticket.offset,
            appended,
            total,
            "page applied"
        );
        Ok(PageOutcome {
            offset: ticket.offset,
            appended,
            rejected,
            total,
            first_page,
        })
    }

    /// Starts a refresh of one loaded item.
    pub fn begin_refresh(&self, id: ItemId) -> Option<RefreshRequest> {
        self.index_of(id)?;
        Some(RefreshRequest {
            ticket: RefreshTicket {
                generation: self.generation,
                id,
            },
        })
    }

    /// Applies a refreshed item. Failures leave the local copy in place.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: std::result::Result<CatalogItem, QueryError>,
    ) -> Result<RefreshOutcome> {
        if ticket.generation != self.generation {
            return Err(BrowseError::StaleInstance {
                generation: ticket.generation,
            });
        }
        let fresh = match result {
            Ok(item) => item,
            Err(error) => {
                debug!(id = %ticket.id, %error, "item refresh failed, keeping local copy");
                return Ok(RefreshOutcome::default());
            }
        };
        let Some(index) = self.index_of(ticket.id) else {
            return Ok(RefreshOutcome::default());
        };

        self.items[index].apply_user_data(fresh.user_data);
        if self.request.filters.admits(&self.items[index]) {
            return Ok(RefreshOutcome {
                removed: false,
                index: Some(index),
            });
        }
        self.remove(ticket.id);
        info!(id = %ticket.id, index, "item no longer matches filter, removed");
        Ok(RefreshOutcome {
            removed: true,
            index: Some(index),
        })
    }

    /// Drops one item and shrinks the total to match.
    pub fn remove(&mut self, id: ItemId) -> Option<usize> {
        let index = self.index_of(id)?;
        self.items.remove(index);
        self.ids.remove(&id);
        if let Some(total) = self.total.as_mut() {
            *total = total.saturating_sub(1).max(self.items.len());
        }
        Some(index)
    }

    /// Marks the current contents as unreliable, e.g. when the view pauses
    /// mid-load. An in-flight fetch is abandoned.
    pub fn mark_stale(&mut self) {
        self.stale = true;
        if self.is_loading() {
            self.state = FetchState::Idle;
            self.generation = self.generations.next();
        }
    }

    /// On resume: starts over from offset 0 if the collection was marked
    /// stale. Returns whether it did.
    pub fn re_retrieve_if_needed(&mut self) -> bool {
        if !self.stale {
            return false;
        }
        info!(generation = self.generation, "re-retrieving stale collection");
        self.reset();
        true
    }

    /// Detaches from any in-flight work; later completions are discarded.
    pub fn detach(&mut self) {
        self.state = FetchState::Idle;
        self.generation = self.generations.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseQuery, ItemCategory, QueryKind, UserData};

    fn item(n: u128) -> CatalogItem {
        CatalogItem::new(ItemId::from_u128(n), format!("Item {n}"), ItemCategory::Movie)
    }

    fn page(range: std::ops::Range<u128>, total: usize) -> ItemPage {
        ItemPage {
            items: range.map(item).collect(),
            total_count: total,
        }
    }

    fn collection() -> PaginatedCollection {
        let request = BrowseRequest::new(QueryKind::Items, BaseQuery::default(), 10);
        PaginatedCollection::new(request, 3, GenerationSource::new())
    }

    fn load(collection: &mut PaginatedCollection, range: std::ops::Range<u128>, total: usize) {
        let request = collection.fetch_next().unwrap();
        collection.apply_page(request.ticket, Ok(page(range, total))).unwrap();
    }

    #[test]
    fn test_second_fetch_is_coalesced() {
        let mut c = collection();
        let first = c.fetch_next();
        assert!(first.is_some());
        assert!(c.fetch_next().is_none());
        assert!(c.is_loading());
        assert_eq!(first.unwrap().query.offset, 0);
    }

    #[test]
    fn test_pages_append_in_order() {
        let mut c = collection();
        load(&mut c, 0..10, 25);
        let next = c.fetch_next().unwrap();
        assert_eq!(next.query.offset, 10);
        let outcome = c.apply_page(next.ticket, Ok(page(10..20, 25))).unwrap();
        assert_eq!(outcome.appended, 10);
        assert!(!outcome.first_page);
        assert_eq!(c.len(), 20);
        assert_eq!(c.total_count(), Some(25));
        assert_eq!(c.get(10).unwrap().id, ItemId::from_u128(10));
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut c = collection();
        load(&mut c, 0..10, 20);
        let next = c.fetch_next().unwrap();
        let outcome = c.apply_page(next.ticket, Ok(page(8..18, 20))).unwrap();
        assert_eq!(outcome.rejected, 2);
        assert_eq!(c.len(), 18);
    }

    #[test]
    fn test_failure_keeps_items_and_retries_same_offset() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        let next = c.fetch_next().unwrap();
        let err = c
            .apply_page(next.ticket, Err(QueryError::Transport("reset".into())))
            .unwrap_err();
        assert!(matches!(err, BrowseError::TransientFetch { offset: 10, .. }));
        assert!(err.is_recoverable());
        assert_eq!(c.len(), 10);
        assert_eq!(c.total_count(), Some(30));
        assert!(!c.is_loading());
        assert_eq!(c.fetch_next().unwrap().query.offset, 10);
    }

    #[test]
    fn test_sort_change_resets_and_discards_in_flight() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        let in_flight = c.fetch_next().unwrap();
        assert!(c.set_sort(SortKey::DateCreated, SortOrder::Descending));
        assert!(c.is_empty());
        assert_eq!(c.total_count(), None);

        let err = c.apply_page(in_flight.ticket, Ok(page(10..20, 30))).unwrap_err();
        assert!(matches!(err, BrowseError::StaleInstance { .. }));
        assert!(c.is_empty());
        assert_eq!(c.fetch_next().unwrap().query.offset, 0);
    }

    #[test]
    fn test_unchanged_sort_is_a_no_op() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        assert!(!c.set_sort(SortKey::SortName, SortOrder::Ascending));
        assert_eq!(c.len(), 10);
    }

    #[test]
    fn test_configure_reports_rebuild_on_new_identity() {
        let mut c = collection();
        let same = c.request().clone().with_start_letter(Some('m'));
        assert_eq!(c.configure(same), ConfigureOutcome::Reset);
        let other = BrowseRequest::new(QueryKind::Items, BaseQuery::for_parent(ItemId::from_u128(5)), 10);
        assert_eq!(c.configure(other), ConfigureOutcome::Rebuilt);
    }

    #[test]
    fn test_prefetch_window() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        assert!(c.ensure_loaded_through(5).is_none());
        assert!(c.ensure_loaded_through(7).is_some());
    }

    #[test]
    fn test_scrolling_defers_fetch_until_stop() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        assert!(c.set_scroll_active(true).is_none());
        assert!(c.ensure_loaded_through(9).is_none());
        let request = c.set_scroll_active(false).unwrap();
        assert_eq!(request.query.offset, 10);
        // Second stop edge while the first fetch is pending
        c.set_scroll_active(true);
        assert!(c.set_scroll_active(false).is_none());
    }

    #[test]
    fn test_stop_when_everything_is_loaded() {
        let mut c = collection();
        load(&mut c, 0..10, 10);
        assert!(!c.has_more());
        c.set_scroll_active(true);
        assert!(c.set_scroll_active(false).is_none());
        assert!(c.fetch_next().is_none());
    }

    #[test]
    fn test_single_shot_kinds_stop_after_first_page() {
        let request = BrowseRequest::new(QueryKind::NextUp, BaseQuery::default(), 10);
        let mut c = PaginatedCollection::new(request, 3, GenerationSource::new());
        load(&mut c, 0..10, 50);
        assert_eq!(c.total_count(), Some(10));
        assert!(c.fetch_next().is_none());
    }

    #[test]
    fn test_short_server_total_is_corrected() {
        let mut c = collection();
        load(&mut c, 0..10, 20);
        load(&mut c, 20..20, 20);
        assert_eq!(c.total_count(), Some(10));
        assert!(!c.has_more());
    }

    #[test]
    fn test_page_of_only_duplicates_ends_paging() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        let next = c.fetch_next().unwrap();
        let outcome = c.apply_page(next.ticket, Ok(page(0..10, 30))).unwrap();
        assert_eq!(outcome.appended, 0);
        assert_eq!(outcome.rejected, 10);
        assert_eq!(outcome.total, 10);
        assert!(!c.has_more());
        assert!(c.fetch_next().is_none());
    }

    #[test]
    fn test_refresh_removes_item_failing_filter() {
        let request = BrowseRequest::new(QueryKind::Items, BaseQuery::default(), 10).with_filters(
            FilterOptions {
                favorite_only: false,
                unwatched_only: true,
            },
        );
        let mut c = PaginatedCollection::new(request, 3, GenerationSource::new());
        load(&mut c, 0..5, 12);

        let target = ItemId::from_u128(2);
        let refresh = c.begin_refresh(target).unwrap();
        let watched = item(2).with_user_data(UserData {
            played: true,
            ..Default::default()
        });
        let outcome = c.apply_refresh(refresh.ticket, Ok(watched)).unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome {
                removed: true,
                index: Some(2)
            }
        );
        assert_eq!(c.total_count(), Some(11));
        let ids: Vec<_> = c.items().iter().map(|i| i.id).collect();
        assert_eq!(
            ids,
            [0, 1, 3, 4].map(ItemId::from_u128)
        );
    }

    #[test]
    fn test_refresh_failure_is_ignored() {
        let mut c = collection();
        load(&mut c, 0..5, 5);
        let refresh = c.begin_refresh(ItemId::from_u128(1)).unwrap();
        let outcome = c
            .apply_refresh(refresh.ticket, Err(QueryError::Server { status: 500 }))
            .unwrap();
        assert!(!outcome.removed);
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_refresh_updates_user_data_in_place() {
        let mut c = collection();
        load(&mut c, 0..5, 5);
        let refresh = c.begin_refresh(ItemId::from_u128(3)).unwrap();
        let fresh = item(3).with_user_data(UserData {
            favorite: true,
            ..Default::default()
        });
        let outcome = c.apply_refresh(refresh.ticket, Ok(fresh)).unwrap();
        assert_eq!(outcome.index, Some(3));
        assert!(c.get(3).unwrap().is_favorite());
    }

    #[test]
    fn test_stale_collection_restarts_on_resume() {
        let mut c = collection();
        load(&mut c, 0..10, 30);
        let pending = c.fetch_next().unwrap();
        c.mark_stale();
        assert!(c.apply_page(pending.ticket, Ok(page(10..20, 30))).is_err());
        assert!(c.re_retrieve_if_needed());
        assert!(c.is_empty());
        assert!(!c.re_retrieve_if_needed());
    }

    #[test]
    fn test_generations_are_unique_across_collections() {
        let source = GenerationSource::new();
        let request = BrowseRequest::new(QueryKind::Items, BaseQuery::default(), 10);
        let a = PaginatedCollection::new(request.clone(), 3, source.clone());
        let b = PaginatedCollection::new(request, 3, source);
        assert_ne!(a.generation(), b.generation());
    }
}
