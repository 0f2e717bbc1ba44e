//! Persistence seams consumed by the engine.
//!
//! The engine owns no storage. It applies its rules through these traits;
//! [`crate::db::SqliteStore`] is the bundled implementation. All methods take
//! `&self` so one store can be shared between sessions.

use crate::content::{
    CatalogItem, ContentKind, ContentRef, FavoriteEntry, PlaybackEntry, Playlist, PlaylistId,
    PlaylistItem, RatingSubmission, ViewerId,
};
use crate::error::StoreError;
use chrono::{DateTime, Utc};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to catalog items plus the one write the engine performs.
pub trait CatalogStore {
    /// Lookup regardless of availability.
    fn find_by_id(&self, content: ContentRef) -> StoreResult<Option<CatalogItem>>;

    /// Every available item of `kind`, `average_rating` descending, then id.
    fn find_all(&self, kind: ContentKind) -> StoreResult<Vec<CatalogItem>>;

    fn update_average_rating(&self, content: ContentRef, new_average: f64) -> StoreResult<()>;
}

pub trait RatingStore {
    /// Insert or overwrite the submission keyed by (viewer, content) and
    /// recompute the item's average from every recorded score, as one atomic
    /// unit across every handle on the same database.
    ///
    /// Returns the new average, or `None` when the item does not exist, in
    /// which case nothing is written.
    fn record_rating(&self, submission: &RatingSubmission) -> StoreResult<Option<f64>>;
}

pub trait PlaybackStore {
    /// Create the entry for (viewer, content) or reset an existing one to
    /// zero progress, uncompleted, watched at `at`.
    fn upsert_play(&self, viewer: ViewerId, content: ContentRef, at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Overwrite progress on an existing entry. Returns `false` when there is
    /// no entry to update.
    fn update_progress(
        &self,
        viewer: ViewerId,
        content: ContentRef,
        progress_seconds: u32,
        completed: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Most recent first, at most `limit` entries.
    fn history(&self, viewer: ViewerId, limit: usize) -> StoreResult<Vec<PlaybackEntry>>;
}

pub trait FavoriteStore {
    /// Returns `false` when the tuple is already present; nothing is written.
    fn insert_favorite(&self, viewer: ViewerId, content: ContentRef, at: DateTime<Utc>)
        -> StoreResult<bool>;

    /// Returns `false` when the tuple was absent.
    fn delete_favorite(&self, viewer: ViewerId, content: ContentRef) -> StoreResult<bool>;

    /// Most recently added first.
    fn favorites(&self, viewer: ViewerId) -> StoreResult<Vec<FavoriteEntry>>;
}

pub trait PlaylistStore {
    /// Returns `None` when `owner` already has a playlist with that name.
    fn insert_playlist(
        &self,
        owner: ViewerId,
        name: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Playlist>>;

    fn find_playlist(&self, id: PlaylistId) -> StoreResult<Option<Playlist>>;

    /// Newest first.
    fn playlists(&self, owner: ViewerId) -> StoreResult<Vec<Playlist>>;

    /// Remove the playlist and its items. Returns `false` when it was absent.
    fn delete_playlist(&self, id: PlaylistId) -> StoreResult<bool>;

    /// Append `content` after the current last position and return the new
    /// position, or `None` when it is already in the playlist.
    fn append_playlist_item(&self, id: PlaylistId, content: ContentRef) -> StoreResult<Option<u32>>;

    /// Remove `content` and close the gap it leaves. Returns `false` when it
    /// was not in the playlist.
    fn remove_playlist_item(&self, id: PlaylistId, content: ContentRef) -> StoreResult<bool>;

    /// Ordered by position.
    fn playlist_items(&self, id: PlaylistId) -> StoreResult<Vec<PlaylistItem>>;
}

/// Everything the engine needs from one backing store.
pub trait Store: CatalogStore + RatingStore + PlaybackStore + FavoriteStore + PlaylistStore {}

impl<T> Store for T where
    T: CatalogStore + RatingStore + PlaybackStore + FavoriteStore + PlaylistStore
{
}
