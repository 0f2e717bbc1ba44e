//! Domain types shared by every component.
//!
//! Catalog items come in two kinds that share one shape. Instead of a loosely
//! typed list inspected at runtime, every reference to an item is a
//! [`ContentRef`] and kind-specific fields live in [`KindDetails`].

use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque viewer key. May name an account or a sub-profile; the engine does
/// not care which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(pub i64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The viewer a request is made on behalf of, together with their age-rating
/// ceiling. Built by the presentation layer and passed explicitly to every
/// viewer-scoped call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: ViewerId,
    /// Maximum content category this viewer may access, as a raw token
    /// (`G`, `PG`, `PG-13`, `R`, `General`, `Explicit`).
    pub ceiling: String,
}

impl Viewer {
    pub fn new(id: i64, ceiling: impl Into<String>) -> Self {
        Self {
            id: ViewerId(id),
            ceiling: ceiling.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    AudioVisual,
    Audio,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::AudioVisual, ContentKind::Audio];

    /// Token used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentKind::AudioVisual => "audiovisual",
            ContentKind::Audio => "audio",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audiovisual" => Ok(ContentKind::AudioVisual),
            "audio" => Ok(ContentKind::Audio),
            other => Err(CatalogError::InvalidInput(format!(
                "unknown content type '{other}', expected 'audiovisual' or 'audio'"
            ))),
        }
    }
}

/// Typed reference to a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContentRef {
    AudioVisual(i64),
    Audio(i64),
}

impl ContentRef {
    #[must_use]
    pub const fn new(kind: ContentKind, id: i64) -> Self {
        match kind {
            ContentKind::AudioVisual => ContentRef::AudioVisual(id),
            ContentKind::Audio => ContentRef::Audio(id),
        }
    }

    #[must_use]
    pub const fn kind(self) -> ContentKind {
        match self {
            ContentRef::AudioVisual(_) => ContentKind::AudioVisual,
            ContentRef::Audio(_) => ContentKind::Audio,
        }
    }

    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            ContentRef::AudioVisual(id) | ContentRef::Audio(id) => id,
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.id())
    }
}

/// Fields only one kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KindDetails {
    AudioVisual {
        #[serde(default)]
        synopsis: String,
        #[serde(default)]
        release_year: i32,
        #[serde(default)]
        director: String,
        /// Cast, in billing order.
        #[serde(default)]
        actors: Vec<String>,
    },
    Audio {
        #[serde(default)]
        artist: String,
        #[serde(default)]
        album: String,
        #[serde(default)]
        track_number: i32,
    },
}

impl KindDetails {
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            KindDetails::AudioVisual { .. } => ContentKind::AudioVisual,
            KindDetails::Audio { .. } => ContentKind::Audio,
        }
    }
}

/// A movie, series, documentary, song, podcast or audiobook.
///
/// `average_rating` is the only field the engine ever mutates; everything
/// else is owned by catalog authoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Assigned by the store on insert.
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub age_rating: String,
    #[serde(default)]
    pub duration_seconds: u32,
    /// 0.0 when unrated, otherwise the mean of submitted scores in [1.0, 10.0].
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default = "default_available")]
    pub available: bool,
    pub details: KindDetails,
}

fn default_available() -> bool {
    true
}

impl CatalogItem {
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        self.details.kind()
    }

    #[must_use]
    pub const fn content_ref(&self) -> ContentRef {
        ContentRef::new(self.kind(), self.id)
    }
}

/// One viewer's score for one item. Resubmission overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub viewer: ViewerId,
    pub content: ContentRef,
    pub score: f64,
}

/// Last known playback position of a viewer on an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEntry {
    pub viewer: ViewerId,
    pub content: ContentRef,
    pub progress_seconds: u32,
    /// Set once progress reached the item's full duration.
    pub completed: bool,
    pub watched_at: DateTime<Utc>,
}

impl PlaybackEntry {
    /// Fraction of `item` consumed, in [0.0, 1.0]. Derived for display only.
    #[must_use]
    pub fn fraction_of(&self, item: &CatalogItem) -> f64 {
        if item.duration_seconds == 0 {
            return 0.0;
        }
        (f64::from(self.progress_seconds) / f64::from(item.duration_seconds)).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub viewer: ViewerId,
    pub content: ContentRef,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub i64);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered list of items owned by one viewer. Names are unique per
/// viewer, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub owner: ViewerId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of a playlist. Positions run 1..=n without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub playlist: PlaylistId,
    pub content: ContentRef,
    pub position: u32,
}
