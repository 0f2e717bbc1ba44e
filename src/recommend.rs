//! Recommendations.
//!
//! A greedy, single-factor recommender:
//!
//! 1. Resolve the genre of every favorite and tally them.
//! 2. No favorites (or none resolvable): fall back to the top-rated items of
//!    each kind, interleaved, see [`PopularStrategy`].
//! 3. Otherwise return gated catalog items matching the dominant genre in
//!    rating order, see [`GenreAffinityStrategy`].
//!
//! Recent playback history is gathered and reported with the result but does
//! not influence ranking.

use crate::age_gate::AgeGate;
use crate::algorithm::{self, GenreCount, GenreMatch, PopularSplit, RecommendContext};
use crate::content::{CatalogItem, ContentKind, Viewer};
use crate::error::{log_store_error, Result};
use crate::store::{CatalogStore, FavoriteStore, PlaybackStore};
use log::{debug, trace, warn};
use std::sync::Arc;

/// A way of producing candidate items for a viewer.
pub trait RecommendStrategy {
    /// Up to `limit` items `viewer` is allowed to see.
    ///
    /// # Errors
    ///
    /// Only store failures; an empty result is a valid answer.
    fn recommend(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>>;
}

/// Top-rated items of each kind, interleaved.
#[derive(Debug)]
pub struct PopularStrategy<'a, S> {
    store: &'a S,
    gate: AgeGate,
    split: PopularSplit,
}

impl<'a, S: CatalogStore> PopularStrategy<'a, S> {
    pub fn new(store: &'a S, gate: AgeGate, split: PopularSplit) -> Self {
        Self { store, gate, split }
    }

    fn top_of(&self, kind: ContentKind, take: usize, viewer: &Viewer) -> Result<Vec<CatalogItem>> {
        let items = self.store.find_all(kind).map_err(log_store_error)?;
        Ok(self.gate.filter(items, viewer).take(take).collect())
    }
}

impl<S: CatalogStore> RecommendStrategy for PopularStrategy<'_, S> {
    fn recommend(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        let audiovisual = self.top_of(ContentKind::AudioVisual, self.split.audiovisual, viewer)?;
        let audio = self.top_of(ContentKind::Audio, self.split.audio, viewer)?;

        let mut items = algorithm::interleave(&[audiovisual, audio]);
        items.truncate(limit);
        Ok(items)
    }
}

/// Items of one genre, both kinds, best rated first.
#[derive(Debug)]
pub struct GenreAffinityStrategy<'a, S> {
    store: &'a S,
    gate: AgeGate,
    genre: &'a str,
    matcher: GenreMatch,
}

impl<'a, S: CatalogStore> GenreAffinityStrategy<'a, S> {
    pub fn new(store: &'a S, gate: AgeGate, genre: &'a str, matcher: GenreMatch) -> Self {
        Self {
            store,
            gate,
            genre,
            matcher,
        }
    }
}

impl<S: CatalogStore> RecommendStrategy for GenreAffinityStrategy<'_, S> {
    fn recommend(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        let mut per_kind = Vec::with_capacity(ContentKind::ALL.len());
        for kind in ContentKind::ALL {
            let items = self.store.find_all(kind).map_err(log_store_error)?;
            per_kind.push(
                self.gate
                    .filter(items, viewer)
                    .filter(|item| self.matcher.matches(&item.genre, self.genre))
                    .collect::<Vec<_>>(),
            );
        }

        let mut items = algorithm::merge_by_rating(per_kind);
        trace!("{} items match genre '{}'", items.len(), self.genre);
        items.truncate(limit);
        Ok(items)
    }
}

/// Why a set of recommendations was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Basis {
    /// No usable favorites.
    Popular,
    /// Most frequent genre among favorites.
    Genre { genre: String, favorites: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub items: Vec<CatalogItem>,
    pub basis: Basis,
    /// Size of the recent history consulted. Informational only.
    pub recent_plays: usize,
}

#[derive(Debug)]
pub struct RecommendationEngine<S> {
    store: Arc<S>,
    gate: AgeGate,
    context: RecommendContext,
    history_limit: usize,
}

impl<S> RecommendationEngine<S>
where
    S: CatalogStore + FavoriteStore + PlaybackStore,
{
    pub fn new(store: Arc<S>, gate: AgeGate, context: RecommendContext, history_limit: usize) -> Self {
        Self {
            store,
            gate,
            context,
            history_limit,
        }
    }

    /// Up to `limit` items for `viewer`, polymorphic over both kinds.
    pub fn recommend(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        Ok(self.recommend_explained(viewer, limit)?.items)
    }

    /// Like [`recommend`](Self::recommend), also returning what drove the choice.
    pub fn recommend_explained(&self, viewer: &Viewer, limit: usize) -> Result<Recommendations> {
        let recent_plays = self
            .store
            .history(viewer.id, self.history_limit)
            .map_err(log_store_error)?
            .len();
        let tally = self.favorite_genres(viewer)?;

        let (items, basis) = match algorithm::dominant_genre(&tally) {
            None => {
                debug!("Viewer {} has no usable favorites, using popular items", viewer.id);
                let strategy = PopularStrategy::new(&*self.store, self.gate, self.context.popular_split);
                (strategy.recommend(viewer, limit)?, Basis::Popular)
            }
            Some(GenreCount { genre, count, .. }) => {
                debug!("Viewer {} favors '{genre}' ({count} favorites)", viewer.id);
                let strategy = GenreAffinityStrategy::new(
                    &*self.store,
                    self.gate,
                    genre,
                    self.context.genre_match,
                );
                let basis = Basis::Genre {
                    genre: genre.clone(),
                    favorites: *count,
                };
                (strategy.recommend(viewer, limit)?, basis)
            }
        };

        Ok(Recommendations {
            items,
            basis,
            recent_plays,
        })
    }

    /// Genres of the viewer's favorites. Favorites whose item has vanished
    /// from the catalog are skipped. Lookups here are not age-gated.
    fn favorite_genres(&self, viewer: &Viewer) -> Result<Vec<GenreCount>> {
        let favorites = self.store.favorites(viewer.id).map_err(log_store_error)?;

        let mut genres = Vec::with_capacity(favorites.len());
        for favorite in &favorites {
            match self.store.find_by_id(favorite.content).map_err(log_store_error)? {
                Some(item) => genres.push(item.genre),
                None => warn!(
                    "Favorite {} of viewer {} no longer exists in the catalog",
                    favorite.content, viewer.id
                ),
            }
        }

        Ok(algorithm::tally_genres(genres.iter().map(String::as_str)))
    }
}
