//! Pure helpers behind recommendations: genre tallies, genre matching and
//! merging per-kind candidate lists.
//!
//! Nothing here touches the store, so every function is deterministic for a
//! given input.

use crate::content::CatalogItem;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// How an item's genre is compared with a wanted genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreMatch {
    /// Case-insensitive substring: "Sci-Fi" matches "Sci-Fi Thriller".
    #[default]
    Contains,
    /// Case-insensitive equality after trimming.
    Exact,
}

impl GenreMatch {
    #[must_use]
    pub fn matches(self, item_genre: &str, wanted: &str) -> bool {
        let item_genre = normalize_genre(item_genre);
        let wanted = normalize_genre(wanted);
        if wanted.is_empty() {
            return false;
        }
        match self {
            GenreMatch::Contains => item_genre.contains(&wanted),
            GenreMatch::Exact => item_genre == wanted,
        }
    }
}

impl FromStr for GenreMatch {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Ok(GenreMatch::Contains),
            "exact" => Ok(GenreMatch::Exact),
            other => Err(CatalogError::InvalidInput(format!(
                "unknown genre match '{other}', expected 'contains' or 'exact'"
            ))),
        }
    }
}

/// How many top-rated items of each kind make up a "popular" fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularSplit {
    pub audiovisual: usize,
    pub audio: usize,
}

impl Default for PopularSplit {
    fn default() -> Self {
        Self {
            audiovisual: 3,
            audio: 2,
        }
    }
}

/// Tuning for the recommendation engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendContext {
    #[serde(default)]
    pub genre_match: GenreMatch,
    #[serde(default)]
    pub popular_split: PopularSplit,
}

/// Occurrences of one genre among a viewer's favorites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCount {
    /// Spelling of the first occurrence seen.
    pub genre: String,
    pub count: usize,
    key: String,
}

#[must_use]
pub fn normalize_genre(genre: &str) -> String {
    genre.trim().to_lowercase()
}

/// Count genres case-insensitively. Blank genres are ignored.
///
/// The result is ordered by count descending, then by normalized genre name
/// ascending, so the first element is the dominant genre.
#[must_use]
pub fn tally_genres<'a, I>(genres: I) -> Vec<GenreCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut tally: Vec<GenreCount> = Vec::new();

    for genre in genres {
        let key = normalize_genre(genre);
        if key.is_empty() {
            continue;
        }
        match positions.get(&key) {
            Some(&index) => tally[index].count += 1,
            None => {
                positions.insert(key.clone(), tally.len());
                tally.push(GenreCount {
                    genre: genre.trim().to_string(),
                    count: 1,
                    key,
                });
            }
        }
    }

    tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    tally
}

/// The most frequent genre, ties broken by lexicographic name.
#[must_use]
pub fn dominant_genre(tally: &[GenreCount]) -> Option<&GenreCount> {
    tally.first()
}

/// Round-robin over `lists`: first of each, then second of each, and so on.
#[must_use]
pub fn interleave<T: Clone>(lists: &[Vec<T>]) -> Vec<T> {
    let max_len = lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut result = Vec::with_capacity(lists.iter().map(Vec::len).sum());

    for i in 0..max_len {
        for list in lists {
            if let Some(item) = list.get(i) {
                result.push(item.clone());
            }
        }
    }

    result
}

/// Concatenate `lists` and order by `average_rating` descending. The sort is
/// stable, so ties keep list order and then per-list order.
#[must_use]
pub fn merge_by_rating(lists: Vec<Vec<CatalogItem>>) -> Vec<CatalogItem> {
    let mut merged: Vec<CatalogItem> = lists.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(Ordering::Equal)
    });
    merged
}
