use crate::models::{CollectionType, FolderKind, SortKey, SortOrder};

/// One entry of the sort menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOption {
    pub label: &'static str,
    pub key: SortKey,
    /// Order applied when the option is picked.
    pub order: SortOrder,
}

impl SortOption {
    const fn new(label: &'static str, key: SortKey, order: SortOrder) -> Self {
        Self { label, key, order }
    }
}

/// What stored or unknown keys resolve to.
pub const FALLBACK_SORT: SortOption =
    SortOption::new("Name", SortKey::SortName, SortOrder::Ascending);

/// Sort menu entries for a folder, in menu order.
pub fn sort_options(folder: FolderKind) -> Vec<SortOption> {
    use SortOrder::{Ascending, Descending};

    let last_played = if folder.collection_type == Some(CollectionType::TvShows) {
        SortKey::SeriesDatePlayed
    } else {
        SortKey::DatePlayed
    };
    let mut options = vec![
        FALLBACK_SORT,
        SortOption::new("Date added", SortKey::DateCreated, Descending),
        SortOption::new("Premiere date", SortKey::PremiereDate, Descending),
        SortOption::new("Parental rating", SortKey::OfficialRating, Ascending),
        SortOption::new("Community rating", SortKey::CommunityRating, Descending),
        SortOption::new("Critic rating", SortKey::CriticRating, Descending),
        SortOption::new("Last played", last_played, Descending),
        SortOption::new("Random", SortKey::Random, Ascending),
    ];
    if folder.collection_type == Some(CollectionType::Movies) {
        options.push(SortOption::new("Runtime", SortKey::Runtime, Ascending));
    }
    options.push(SortOption::new(
        "Production year",
        SortKey::ProductionYear,
        Descending,
    ));
    options
}

/// Finds the option for `key`; missing or unlisted keys give [`FALLBACK_SORT`].
pub fn sort_option_for(folder: FolderKind, key: Option<SortKey>) -> SortOption {
    key.and_then(|key| {
        sort_options(folder)
            .into_iter()
            .find(|option| option.key == key)
    })
    .unwrap_or(FALLBACK_SORT)
}

/// A sort menu pick: either a new key (with its default order) or just a new
/// order for the current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortChoice {
    Key(SortKey),
    Order(SortOrder),
}

/// Resolves a menu pick against the current sort.
pub fn apply_sort_choice(
    folder: FolderKind,
    current: (SortKey, SortOrder),
    choice: SortChoice,
) -> (SortKey, SortOrder) {
    match choice {
        SortChoice::Key(key) => {
            let option = sort_option_for(folder, Some(key));
            (option.key, option.order)
        }
        SortChoice::Order(order) => (sort_option_for(folder, Some(current.0)).key, order),
    }
}
