pub mod collection;
pub mod controller;
pub mod loader;
pub mod sort;
pub mod status;

pub use collection::{
    ConfigureOutcome, FetchState, FetchTicket, GenerationSource, PageOutcome, PageRequest,
    PaginatedCollection, RefreshOutcome, RefreshRequest, RefreshTicket,
};
pub use controller::{
    BrowseController, BrowseEvent, BrowseServices, BrowseState, FolderContext, GenreMenuEntry,
    MusicListing,
};
pub use loader::{Completion, FetchLoader};
pub use sort::{apply_sort_choice, sort_option_for, sort_options, SortChoice, SortOption};
pub use status::{clamp_fling, counter_text, status_text, ItemInfo, StatusContext};
