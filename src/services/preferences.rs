use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::models::{BadgePreferences, LibraryPreferences};

/// Read/write access to persisted display preferences.
///
/// Library preferences are keyed by the folder's display preferences id.
pub trait PreferencesStore: Send + Sync {
    fn library(&self, key: &str) -> LibraryPreferences;

    fn save_library(&self, key: &str, prefs: &LibraryPreferences);

    fn badges(&self) -> BadgePreferences;
}

/// Process-local store; nothing is written to disk.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    libraries: RwLock<HashMap<String, LibraryPreferences>>,
    badges: RwLock<BadgePreferences>,
    writes: AtomicUsize,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(self, key: &str, prefs: LibraryPreferences) -> Self {
        self.libraries.write().insert(key.to_string(), prefs);
        self
    }

    pub fn set_badges(&self, badges: BadgePreferences) {
        *self.badges.write() = badges;
    }

    /// Replaces stored preferences without counting as a user write, as an
    /// edit made on another screen would.
    pub fn replace_library(&self, key: &str, prefs: LibraryPreferences) {
        self.libraries.write().insert(key.to_string(), prefs);
    }

    /// Number of [`PreferencesStore::save_library`] calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreferencesStore for InMemoryPreferences {
    fn library(&self, key: &str) -> LibraryPreferences {
        self.libraries.read().get(key).cloned().unwrap_or_default()
    }

    fn save_library(&self, key: &str, prefs: &LibraryPreferences) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.libraries.write().insert(key.to_string(), prefs.clone());
    }

    fn badges(&self) -> BadgePreferences {
        *self.badges.read()
    }
}
