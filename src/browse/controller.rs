//! Orchestrates geometry, the paginated collection and the view-facing sinks
//! for one browsed folder.
//!
//! All methods run on the owning (UI) thread. Network work goes through the
//! [`FetchLoader`]; its results only take effect when the owner calls
//! [`BrowseController::poll`] or awaits [`BrowseController::wait_idle`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::browse::collection::{GenerationSource, PageRequest, PaginatedCollection};
use crate::browse::loader::{Completion, FetchLoader};
use crate::browse::sort::{apply_sort_choice, sort_option_for, SortChoice, SortOption};
use crate::browse::status::{counter_text, status_text, ItemInfo, StatusContext};
use crate::config::BrowseConfig;
use crate::error::{BrowseError, Result};
use crate::input::{FocusGrid, InputAction};
use crate::layout::{CardHeights, CardModel, CardResolver, GridGeometry, GridSolver, Viewport};
use crate::models::{
    BaseQuery, BrowseRequest, CatalogItem, CollectionType, FilterOptions, FolderKind,
    GenreNormalizer, ItemCategory, ItemId, LibraryPreferences, QueryKind, DISPLAY_GENRES,
};
use crate::services::{FocusSink, Navigator, NullSink, PreferencesStore, QueryService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseState {
    Uninitialized,
    Loading,
    Ready,
    Refreshing,
}

/// What applying one completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEvent {
    PageLoaded {
        appended: usize,
        total: usize,
        first_page: bool,
    },
    /// Recoverable; loaded items are untouched.
    FetchFailed { offset: usize, message: String },
    ItemRefreshed { index: usize },
    ItemRemoved { index: usize },
    /// Result for a collection generation that is no longer active.
    Discarded { generation: u64 },
}

/// Which sub-listing of a music library to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicListing {
    Artists,
    AlbumArtists,
}

/// The folder being browsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderContext {
    pub id: ItemId,
    pub name: String,
    pub kind: FolderKind,
    /// Key for per-library display preferences.
    pub preferences_key: String,
    pub music_listing: Option<MusicListing>,
    /// Forces a non-default endpoint (next up, live TV, ...).
    pub query_kind: Option<QueryKind>,
}

impl FolderContext {
    pub fn new(id: ItemId, name: impl Into<String>, kind: FolderKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            preferences_key: id.to_string(),
            music_listing: None,
            query_kind: None,
        }
    }

    pub fn from_item(item: &CatalogItem) -> Self {
        Self::new(item.id, item.name.clone(), FolderKind::of(item))
    }

    pub fn with_music_listing(mut self, listing: MusicListing) -> Self {
        self.music_listing = Some(listing);
        self
    }

    pub fn with_query_kind(mut self, kind: QueryKind) -> Self {
        self.query_kind = Some(kind);
        self
    }

    pub fn with_preferences_key(mut self, key: impl Into<String>) -> Self {
        self.preferences_key = key.into();
        self
    }

    /// Endpoint feeding this folder's grid.
    pub fn query_kind(&self) -> QueryKind {
        if let Some(kind) = self.query_kind {
            return kind;
        }
        let library = matches!(
            self.kind.category,
            ItemCategory::UserView | ItemCategory::CollectionFolder
        );
        match (library, self.kind.collection_type, self.music_listing) {
            (true, Some(CollectionType::Music), Some(MusicListing::Artists)) => QueryKind::Artists,
            (true, Some(CollectionType::Music), Some(MusicListing::AlbumArtists)) => {
                QueryKind::AlbumArtists
            }
            _ => QueryKind::Items,
        }
    }

    fn base_query(&self, kind: QueryKind) -> BaseQuery {
        let mut base = BaseQuery::for_parent(self.id);
        base.recursive = kind == QueryKind::Items;
        if matches!(kind, QueryKind::SimilarMovies | QueryKind::SimilarSeries) {
            base.similar_to = Some(self.id);
        }
        base
    }
}

/// External collaborators a controller talks to.
#[derive(Clone)]
pub struct BrowseServices {
    pub query: Arc<dyn QueryService>,
    pub preferences: Arc<dyn PreferencesStore>,
    pub sink: Arc<dyn FocusSink>,
    pub navigator: Arc<dyn Navigator>,
    pub runtime: Handle,
}

impl BrowseServices {
    pub fn new(
        query: Arc<dyn QueryService>,
        preferences: Arc<dyn PreferencesStore>,
        runtime: Handle,
    ) -> Self {
        Self {
            query,
            preferences,
            sink: Arc::new(NullSink),
            navigator: Arc::new(NullSink),
            runtime,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FocusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }
}

/// One genre menu row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreMenuEntry {
    /// `None` is the "All genres" entry.
    pub genre: Option<&'static str>,
    pub selected: bool,
}

pub struct BrowseController {
    config: BrowseConfig,
    folder: FolderContext,
    preferences: Arc<dyn PreferencesStore>,
    sink: Arc<dyn FocusSink>,
    navigator: Arc<dyn Navigator>,
    loader: FetchLoader,
    solver: GridSolver,
    genres: GenreNormalizer,
    generations: GenerationSource,
    viewport: Viewport,
    library: LibraryPreferences,
    geometry: Option<GridGeometry>,
    collection: Option<PaginatedCollection>,
    focus: FocusGrid,
    /// Index to restore once enough items have loaded after a relayout.
    restore_index: Option<usize>,
    state: BrowseState,
    dirty: bool,
}

impl BrowseController {
    pub fn new(
        config: BrowseConfig,
        folder: FolderContext,
        viewport: Viewport,
        services: BrowseServices,
    ) -> Self {
        let library = services.preferences.library(&folder.preferences_key);
        Self {
            solver: GridSolver::new(config.geometry_cache_entries),
            loader: FetchLoader::new(services.query, services.runtime),
            preferences: services.preferences,
            sink: services.sink,
            navigator: services.navigator,
            genres: GenreNormalizer::new(),
            generations: GenerationSource::new(),
            focus: FocusGrid::new(1, library.layout.direction),
            library,
            config,
            folder,
            viewport,
            geometry: None,
            collection: None,
            restore_index: None,
            state: BrowseState::Uninitialized,
            dirty: false,
        }
    }

    pub fn state(&self) -> BrowseState {
        self.state
    }

    pub fn folder(&self) -> &FolderContext {
        &self.folder
    }

    pub fn geometry(&self) -> Option<&GridGeometry> {
        self.geometry.as_ref()
    }

    pub fn solver(&self) -> &GridSolver {
        &self.solver
    }

    pub fn collection(&self) -> Option<&PaginatedCollection> {
        self.collection.as_ref()
    }

    pub fn library_preferences(&self) -> &LibraryPreferences {
        &self.library
    }

    pub fn focused_index(&self) -> usize {
        self.focus.index()
    }

    pub fn focused_item(&self) -> Option<&CatalogItem> {
        self.collection.as_ref()?.get(self.focus.index())
    }

    pub fn is_busy(&self) -> bool {
        self.loader.is_busy()
    }

    /// Solves geometry, builds the collection and requests the first page.
    pub fn start(&mut self) -> Result<()> {
        self.rebuild(false)
    }

    /// Applies a new layout. The collection is only reset when the geometry
    /// or the request changed, or the view was marked dirty. With
    /// `preserve_focus`, the focused index is restored once it is loaded
    /// again.
    fn rebuild(&mut self, preserve_focus: bool) -> Result<()> {
        let geometry = self.solver.solve(
            self.viewport,
            self.library.layout,
            self.folder.kind,
            self.config.focus_scale,
        )?;
        let request = self.build_request(&geometry);
        let unchanged = !self.dirty
            && self.geometry == Some(geometry)
            && self
                .collection
                .as_ref()
                .is_some_and(|c| c.request() == &request);
        if unchanged {
            debug!("layout unchanged, keeping loaded items");
            return Ok(());
        }

        if self.geometry != Some(geometry) {
            self.sink.geometry_changed(&geometry);
        }
        self.geometry = Some(geometry);
        self.focus
            .relayout(geometry.lines_for_navigation(), geometry.direction);

        self.restore_index = if preserve_focus && self.focus.index() > 0 {
            Some(self.focus.index())
        } else {
            None
        };
        match self.collection.as_mut() {
            Some(collection) => {
                collection.configure(request);
            }
            None => {
                self.collection = Some(PaginatedCollection::new(
                    request,
                    self.config.prefetch_window,
                    self.generations.clone(),
                ));
            }
        }
        self.dirty = false;
        self.begin_loading();
        Ok(())
    }

    fn build_request(&self, geometry: &GridGeometry) -> BrowseRequest {
        let kind = self.folder.query_kind();
        let chunk_size = match kind {
            QueryKind::LiveTvChannel => self.config.live_tv_channel_chunk,
            _ => self
                .config
                .chunk_size_for(geometry.estimated_visible_cards, geometry.visible_stride),
        };
        let sort = sort_option_for(self.folder.kind, self.library.sort_by);
        let order = self.library.sort_order.unwrap_or(sort.order);
        let genre = self
            .collection
            .as_ref()
            .and_then(|c| c.request().genre.clone());
        let letter = self.collection.as_ref().and_then(|c| c.request().start_letter);

        let mut request = BrowseRequest::new(kind, self.folder.base_query(kind), chunk_size)
            .with_sort(sort.key, order)
            .with_filters(self.library.filters)
            .with_genre(genre)
            .with_start_letter(letter);
        request.static_height = matches!(kind, QueryKind::LiveTvProgram);
        request
    }

    /// Clears focus and requests page one of the (already reset) collection.
    fn begin_loading(&mut self) {
        self.state = BrowseState::Loading;
        self.focus.set_len(0);
        let request = self.collection.as_mut().and_then(|c| c.fetch_next());
        self.submit(request);
        self.publish_status();
    }

    fn submit(&self, request: Option<PageRequest>) {
        if let Some(request) = request {
            self.loader.submit_page(request);
        }
    }

    /// Applies every completion that has arrived.
    pub fn poll(&mut self) -> Vec<BrowseEvent> {
        self.loader
            .poll_completions()
            .into_iter()
            .filter_map(|completion| self.apply_completion(completion))
            .collect()
    }

    /// Applies completions until nothing is in flight.
    pub async fn wait_idle(&mut self) -> Vec<BrowseEvent> {
        let mut events = Vec::new();
        while let Some(completion) = self.loader.next_completion().await {
            events.extend(self.apply_completion(completion));
        }
        events
    }

    pub fn apply_completion(&mut self, completion: Completion) -> Option<BrowseEvent> {
        match completion {
            Completion::Page { ticket, result } => {
                let collection = self.collection.as_mut()?;
                match collection.apply_page(ticket, result) {
                    Ok(outcome) => {
                        if self.state == BrowseState::Loading {
                            self.state = BrowseState::Ready;
                        }
                        self.after_items_changed();
                        Some(BrowseEvent::PageLoaded {
                            appended: outcome.appended,
                            total: outcome.total,
                            first_page: outcome.first_page,
                        })
                    }
                    Err(BrowseError::StaleInstance { generation }) => {
                        Some(BrowseEvent::Discarded { generation })
                    }
                    Err(BrowseError::TransientFetch { offset, source }) => {
                        Some(BrowseEvent::FetchFailed {
                            offset,
                            message: source.to_string(),
                        })
                    }
                    Err(e) => {
                        warn!(error = %e, "unexpected page error");
                        None
                    }
                }
            }
            Completion::Refresh { ticket, result } => {
                let collection = self.collection.as_mut()?;
                let outcome = collection.apply_refresh(ticket, result);
                if self.state == BrowseState::Refreshing {
                    self.state = BrowseState::Ready;
                }
                match outcome {
                    Ok(outcome) if outcome.removed => {
                        let index = outcome.index.unwrap_or(0);
                        self.after_items_changed();
                        Some(BrowseEvent::ItemRemoved { index })
                    }
                    Ok(outcome) => {
                        let index = outcome.index?;
                        if index == self.focus.index() {
                            self.publish_info();
                        }
                        Some(BrowseEvent::ItemRefreshed { index })
                    }
                    Err(BrowseError::StaleInstance { generation }) => {
                        Some(BrowseEvent::Discarded { generation })
                    }
                    Err(e) => {
                        warn!(error = %e, "unexpected refresh error");
                        None
                    }
                }
            }
            Completion::RefreshDue { generation } => {
                let current = self.collection.as_ref().map(|c| c.generation());
                if current == Some(generation) {
                    self.refresh_current_item();
                } else {
                    debug!(generation, "delayed refresh for old generation skipped");
                }
                None
            }
        }
    }

    /// Syncs focus bounds, restores a pending focus index and republishes the
    /// counter after the loaded items changed.
    fn after_items_changed(&mut self) {
        let Some(collection) = self.collection.as_mut() else {
            return;
        };
        self.focus.set_len(collection.len());
        if let Some(target) = self.restore_index {
            if target < collection.len() {
                self.focus.set_index(target);
                self.restore_index = None;
            } else if collection.has_more() {
                // Keep paging until the old position is loaded.
                let request = collection.fetch_next();
                self.submit(request);
            } else {
                self.restore_index = None;
            }
        }
        self.publish_counter();
        self.publish_info();
    }

    /// Retries after a failed fetch, from the same offset.
    pub fn retry(&mut self) {
        let request = self.collection.as_mut().and_then(|c| c.fetch_next());
        self.submit(request);
    }

    pub fn on_scroll_state(&mut self, scrolling: bool) {
        let request = self
            .collection
            .as_mut()
            .and_then(|c| c.set_scroll_active(scrolling));
        self.submit(request);
    }

    pub fn on_focus_changed(&mut self, index: usize) {
        self.focus.set_index(index);
        self.focus_moved();
    }

    fn focus_moved(&mut self) {
        let index = self.focus.index();
        let request = self
            .collection
            .as_mut()
            .and_then(|c| c.ensure_loaded_through(index));
        self.submit(request);
        self.publish_counter();
        self.publish_info();
    }

    pub fn handle_input(&mut self, action: InputAction) {
        match action {
            InputAction::Move(direction) => {
                if self.focus.move_focus(direction) {
                    self.focus_moved();
                }
            }
            InputAction::Confirm => {
                if let Some(item) = self.focused_item() {
                    let id = item.id;
                    info!(%id, "opening item");
                    self.navigator.open_item(id);
                }
            }
        }
    }

    pub fn set_sort(&mut self, choice: SortChoice) {
        let Some(collection) = self.collection.as_mut() else {
            return;
        };
        let current = (collection.request().sort_key, collection.request().sort_order);
        let (key, order) = apply_sort_choice(self.folder.kind, current, choice);
        let changed = collection.set_sort(key, order);
        self.library.sort_by = Some(key);
        self.library.sort_order = Some(order);
        self.save_library();
        if changed {
            self.begin_loading();
        }
    }

    pub fn toggle_unwatched(&mut self) {
        let mut filters = self.library.filters;
        filters.unwatched_only = !filters.unwatched_only;
        self.set_filters(filters);
    }

    pub fn toggle_favorites(&mut self) {
        let mut filters = self.library.filters;
        filters.favorite_only = !filters.favorite_only;
        self.set_filters(filters);
    }

    pub fn set_filters(&mut self, filters: FilterOptions) {
        self.library.filters = filters;
        self.save_library();
        let changed = self
            .collection
            .as_mut()
            .is_some_and(|c| c.set_filters(filters));
        if changed {
            self.begin_loading();
        }
    }

    /// `None` clears the genre filter.
    pub fn set_genre(&mut self, genre: Option<&str>) {
        let genre = genre
            .map(|g| self.genres.normalize(g))
            .filter(|g| !g.is_empty());
        let changed = self
            .collection
            .as_mut()
            .is_some_and(|c| c.set_genre(genre));
        if changed {
            self.begin_loading();
        }
    }

    /// `None` clears the jump-list letter.
    pub fn set_start_letter(&mut self, letter: Option<char>) {
        let changed = self
            .collection
            .as_mut()
            .is_some_and(|c| c.set_start_letter(letter));
        if changed {
            self.begin_loading();
        }
    }

    /// The view is going away temporarily. An interrupted load restarts on
    /// resume.
    pub fn on_pause(&mut self) {
        if let Some(collection) = self.collection.as_mut() {
            if collection.is_loading() {
                collection.mark_stale();
            }
        }
    }

    /// Back on screen. Layout preference changes rebuild everything;
    /// otherwise a stale collection reloads, or the focused item is refreshed
    /// after the configured delay.
    pub fn on_resume(&mut self) -> Result<()> {
        let stored = self.preferences.library(&self.folder.preferences_key);
        if stored.layout != self.library.layout || self.dirty {
            info!(layout = ?stored.layout, "layout preferences changed, rebuilding");
            self.library.layout = stored.layout;
            return self.rebuild(true);
        }

        let Some(collection) = self.collection.as_mut() else {
            return Ok(());
        };
        if collection.re_retrieve_if_needed() {
            self.begin_loading();
        } else if !collection.is_empty() {
            self.loader
                .schedule_refresh(collection.generation(), self.config.refresh_delay);
        }
        Ok(())
    }

    pub fn on_viewport_changed(&mut self, viewport: Viewport) -> Result<()> {
        if viewport == self.viewport {
            return Ok(());
        }
        self.viewport = viewport;
        self.rebuild(true)
    }

    /// Forces the next resume to rebuild.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Re-reads the focused item. If it no longer matches the active filter it
    /// is removed when the result arrives.
    pub fn refresh_current_item(&mut self) {
        let index = self.focus.index();
        let Some(collection) = self.collection.as_ref() else {
            return;
        };
        let Some(id) = collection.get(index).map(|item| item.id) else {
            return;
        };
        if let Some(request) = collection.begin_refresh(id) {
            self.state = BrowseState::Refreshing;
            self.loader.submit_refresh(request);
        }
    }

    /// Teardown: anything still in flight is discarded on arrival.
    pub fn detach(&mut self) {
        if let Some(collection) = self.collection.as_mut() {
            collection.detach();
        }
        self.state = BrowseState::Uninitialized;
    }

    pub fn genre_menu(&self) -> Vec<GenreMenuEntry> {
        let current = self
            .collection
            .as_ref()
            .and_then(|c| c.request().genre.as_deref());
        let mut entries = Vec::with_capacity(DISPLAY_GENRES.len() + 1);
        entries.push(GenreMenuEntry {
            genre: None,
            selected: current.is_none(),
        });
        entries.extend(DISPLAY_GENRES.iter().map(|genre| GenreMenuEntry {
            genre: Some(*genre),
            selected: current.is_some_and(|c| self.genres.same_genre(c, genre)),
        }));
        entries
    }

    pub fn sort_option(&self) -> SortOption {
        let key = self.collection.as_ref().map(|c| c.request().sort_key);
        sort_option_for(self.folder.kind, key)
    }

    pub fn status_text(&self) -> String {
        let request = self.collection.as_ref().map(|c| c.request());
        let sort_label = self
            .library
            .sort_by
            .map(|_| self.sort_option().label);
        status_text(&StatusContext {
            folder_name: &self.folder.name,
            filters: self.library.filters,
            sort_label,
            genre: request.and_then(|r| r.genre.as_deref()),
            start_letter: request.and_then(|r| r.start_letter),
        })
    }

    pub fn counter_text(&self) -> String {
        let total = self
            .collection
            .as_ref()
            .and_then(|c| c.total_count())
            .unwrap_or(0);
        counter_text(self.focus.index(), total)
    }

    /// Card model for the item at `index`.
    pub fn card_for(&self, index: usize) -> Option<CardModel> {
        let geometry = self.geometry.as_ref()?;
        let item = self.collection.as_ref()?.get(index)?;
        let static_height = self
            .collection
            .as_ref()
            .is_some_and(|c| c.request().static_height);
        let resolver = CardResolver::new(
            CardHeights::uniform(geometry.card_height),
            Some(geometry.image_type),
            geometry.direction,
        )
        .with_uniform_aspect(true)
        .with_static_height(static_height)
        .with_badges(self.preferences.badges());
        Some(resolver.card_for(item, unix_now()))
    }

    fn save_library(&self) {
        self.preferences
            .save_library(&self.folder.preferences_key, &self.library);
    }

    fn publish_status(&self) {
        self.sink.status_changed(&self.status_text());
    }

    fn publish_counter(&self) {
        let total = self
            .collection
            .as_ref()
            .and_then(|c| c.total_count())
            .unwrap_or(0);
        let position = if total == 0 { 0 } else { self.focus.index() + 1 };
        self.sink.counter_changed(position, total);
    }

    fn publish_info(&self) {
        let line = self
            .focused_item()
            .map(|item| ItemInfo::for_item(item).line())
            .unwrap_or_default();
        self.sink.info_changed(&line);
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
