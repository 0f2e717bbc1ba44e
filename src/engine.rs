//! One entry point over a shared store.
//!
//! [`Engine`] owns every component and hands each the same `Arc`'d store, so
//! the presentation layer builds it once and passes a [`Viewer`] with each
//! call. The engine keeps no per-viewer state of its own.

use crate::age_gate::{AgeGate, UnknownRatingPolicy};
use crate::algorithm::{GenreMatch, PopularSplit, RecommendContext};
use crate::catalog::{CatalogBrowser, ContentReport};
use crate::content::{
    CatalogItem, ContentKind, ContentRef, FavoriteEntry, PlaybackEntry, Playlist, PlaylistId,
    PlaylistItem, Viewer,
};
use crate::error::{log_store_error, Result};
use crate::favorites::FavoritesSet;
use crate::playback::{PlaybackTracker, DEFAULT_CONTINUE_WATCHING_LIMIT, DEFAULT_HISTORY_LIMIT};
use crate::playlists::PlaylistManager;
use crate::rating::RatingAggregator;
use crate::recommend::{RecommendationEngine, Recommendations};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tunables shared by the engine's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub history_limit: usize,
    pub continue_watching_limit: usize,
    pub unknown_rating: UnknownRatingPolicy,
    pub genre_match: GenreMatch,
    pub popular_split: PopularSplit,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            continue_watching_limit: DEFAULT_CONTINUE_WATCHING_LIMIT,
            unknown_rating: UnknownRatingPolicy::default(),
            genre_match: GenreMatch::default(),
            popular_split: PopularSplit::default(),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn recommend_context(&self) -> RecommendContext {
        RecommendContext {
            genre_match: self.genre_match,
            popular_split: self.popular_split,
        }
    }
}

#[derive(Debug)]
pub struct Engine<S> {
    store: Arc<S>,
    gate: AgeGate,
    ratings: RatingAggregator<S>,
    playback: PlaybackTracker<S>,
    favorites: FavoritesSet<S>,
    playlists: PlaylistManager<S>,
    recommender: RecommendationEngine<S>,
    catalog: CatalogBrowser<S>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, settings: EngineSettings) -> Self {
        Self::from_shared(Arc::new(store), settings)
    }

    pub fn from_shared(store: Arc<S>, settings: EngineSettings) -> Self {
        let gate = AgeGate::new(settings.unknown_rating);
        Self {
            ratings: RatingAggregator::new(Arc::clone(&store)),
            playback: PlaybackTracker::with_limits(
                Arc::clone(&store),
                settings.history_limit,
                settings.continue_watching_limit,
            ),
            favorites: FavoritesSet::new(Arc::clone(&store)),
            playlists: PlaylistManager::new(Arc::clone(&store)),
            recommender: RecommendationEngine::new(
                Arc::clone(&store),
                gate,
                settings.recommend_context(),
                settings.history_limit,
            ),
            catalog: CatalogBrowser::new(Arc::clone(&store), gate, settings.genre_match),
            gate,
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn gate(&self) -> AgeGate {
        self.gate
    }

    pub fn catalog(&self) -> &CatalogBrowser<S> {
        &self.catalog
    }

    /// Direct lookup for display. Not gated: already consumed content stays
    /// visible after a ceiling change.
    pub fn item(&self, content: ContentRef) -> Result<Option<CatalogItem>> {
        self.store.find_by_id(content).map_err(log_store_error)
    }

    pub fn submit_rating(&self, viewer: &Viewer, content: ContentRef, score: f64) -> Result<f64> {
        self.ratings.submit_rating(viewer.id, content, score)
    }

    pub fn record_play(&self, viewer: &Viewer, content: ContentRef) -> Result<()> {
        self.playback.record_play(viewer.id, content)
    }

    pub fn update_progress(&self, viewer: &Viewer, content: ContentRef, progress_seconds: i64) -> Result<()> {
        self.playback.update_progress(viewer.id, content, progress_seconds)
    }

    pub fn history(&self, viewer: &Viewer) -> Result<Vec<PlaybackEntry>> {
        self.playback.history(viewer.id)
    }

    pub fn continue_watching(&self, viewer: &Viewer) -> Result<Vec<PlaybackEntry>> {
        self.playback.continue_watching(viewer.id)
    }

    pub fn add_favorite(&self, viewer: &Viewer, content: ContentRef) -> Result<()> {
        self.favorites.add(viewer.id, content)
    }

    pub fn remove_favorite(&self, viewer: &Viewer, content: ContentRef) -> Result<()> {
        self.favorites.remove(viewer.id, content)
    }

    pub fn list_favorites(&self, viewer: &Viewer) -> Result<Vec<FavoriteEntry>> {
        self.favorites.list(viewer.id)
    }

    pub fn create_playlist(&self, viewer: &Viewer, name: &str, description: &str) -> Result<Playlist> {
        self.playlists.create(viewer.id, name, description)
    }

    pub fn list_playlists(&self, viewer: &Viewer) -> Result<Vec<Playlist>> {
        self.playlists.list(viewer.id)
    }

    pub fn delete_playlist(&self, viewer: &Viewer, playlist: PlaylistId) -> Result<()> {
        self.playlists.delete(viewer.id, playlist)
    }

    pub fn add_to_playlist(&self, viewer: &Viewer, playlist: PlaylistId, content: ContentRef) -> Result<u32> {
        self.playlists.add_item(viewer.id, playlist, content)
    }

    pub fn remove_from_playlist(
        &self,
        viewer: &Viewer,
        playlist: PlaylistId,
        content: ContentRef,
    ) -> Result<()> {
        self.playlists.remove_item(viewer.id, playlist, content)
    }

    pub fn playlist_items(&self, viewer: &Viewer, playlist: PlaylistId) -> Result<Vec<PlaylistItem>> {
        self.playlists.items(viewer.id, playlist)
    }

    pub fn recommend(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        self.recommender.recommend(viewer, limit)
    }

    pub fn recommend_explained(&self, viewer: &Viewer, limit: usize) -> Result<Recommendations> {
        self.recommender.recommend_explained(viewer, limit)
    }

    pub fn list(&self, viewer: &Viewer, kind: ContentKind) -> Result<Vec<CatalogItem>> {
        self.catalog.list(viewer, kind)
    }

    pub fn search_by_title(&self, viewer: &Viewer, query: &str) -> Result<Vec<CatalogItem>> {
        self.catalog.search_by_title(viewer, query)
    }

    pub fn search_by_genre(&self, viewer: &Viewer, genre: &str) -> Result<Vec<CatalogItem>> {
        self.catalog.search_by_genre(viewer, genre)
    }

    pub fn search_by_actor(&self, viewer: &Viewer, actor: &str) -> Result<Vec<CatalogItem>> {
        self.catalog.search_by_actor(viewer, actor)
    }

    pub fn top_rated(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        self.catalog.top_rated(viewer, limit)
    }

    pub fn content_report(&self) -> Result<ContentReport> {
        self.catalog.content_report()
    }
}
