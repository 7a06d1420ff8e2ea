use std::collections::HashMap;

/// Genres offered in the genre picker, in display order.
pub const DISPLAY_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "History",
    "Horror",
    "Music",
    "Mystery",
    "Romance",
    "Science Fiction",
    "Thriller",
    "War",
    "Western",
];

const SYNONYMS: &[(&str, &str)] = &[
    ("sci-fi", "science fiction"),
    ("science fiction", "science fiction"),
    ("sci fi", "science fiction"),
    ("rom-com", "romance"),
    ("rom com", "romance"),
    ("martial arts", "action"),
    ("superhero", "action"),
    ("animated", "animation"),
    ("doc", "documentary"),
    ("docu", "documentary"),
];

/// Maps genre spellings onto the names the server filters by.
///
/// Owned by whoever needs it (one per controller); there is no process-wide
/// table.
#[derive(Debug, Clone)]
pub struct GenreNormalizer {
    synonyms: HashMap<String, String>,
}

impl GenreNormalizer {
    pub fn new() -> Self {
        let synonyms = SYNONYMS
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();
        Self { synonyms }
    }

    pub fn with_synonym(mut self, from: &str, to: &str) -> Self {
        self.synonyms
            .insert(from.trim().to_lowercase(), to.trim().to_lowercase());
        self
    }

    /// Trims and lower-cases `genre`, then applies the synonym table.
    /// Unknown genres come back trimmed and lower-cased.
    pub fn normalize(&self, genre: &str) -> String {
        let key = genre.trim().to_lowercase();
        match self.synonyms.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    pub fn same_genre(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

impl Default for GenreNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
