//! Viewer-scoped catalog reads. Every path here passes through the age gate.

use crate::age_gate::AgeGate;
use crate::algorithm::{self, GenreMatch};
use crate::content::{CatalogItem, ContentKind, KindDetails, Viewer};
use crate::error::{log_store_error, CatalogError, Result};
use crate::store::CatalogStore;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

const REPORT_TOP_RATED: usize = 5;

/// Catalog-wide totals for operators. Not viewer-scoped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentReport {
    pub total_audiovisual: usize,
    pub total_audio: usize,
    /// Best rated titles, formatted `"Title (7.5/10)"`.
    pub top_rated: Vec<String>,
}

#[derive(Debug)]
pub struct CatalogBrowser<S> {
    store: Arc<S>,
    gate: AgeGate,
    genre_match: GenreMatch,
}

impl<S: CatalogStore> CatalogBrowser<S> {
    pub fn new(store: Arc<S>, gate: AgeGate, genre_match: GenreMatch) -> Self {
        Self {
            store,
            gate,
            genre_match,
        }
    }

    fn all_kinds(&self) -> Result<Vec<Vec<CatalogItem>>> {
        ContentKind::ALL
            .iter()
            .map(|&kind| self.store.find_all(kind).map_err(log_store_error))
            .collect()
    }

    fn visible<F>(&self, viewer: &Viewer, keep: F) -> Result<Vec<CatalogItem>>
    where
        F: Fn(&CatalogItem) -> bool,
    {
        let merged = algorithm::merge_by_rating(self.all_kinds()?);
        Ok(self.gate.filter(merged, viewer).filter(|item| keep(item)).collect())
    }

    /// Available items of one kind, best rated first.
    pub fn list(&self, viewer: &Viewer, kind: ContentKind) -> Result<Vec<CatalogItem>> {
        let items = self.store.find_all(kind).map_err(log_store_error)?;
        Ok(self.gate.filter(items, viewer).collect())
    }

    /// Case-insensitive title substring search across both kinds.
    pub fn search_by_title(&self, viewer: &Viewer, query: &str) -> Result<Vec<CatalogItem>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CatalogError::InvalidInput("search query cannot be empty".into()));
        }
        let found = self.visible(viewer, |item| item.title.to_lowercase().contains(&needle))?;
        debug!("Title search '{query}' found {} items", found.len());
        Ok(found)
    }

    pub fn search_by_genre(&self, viewer: &Viewer, genre: &str) -> Result<Vec<CatalogItem>> {
        if genre.trim().is_empty() {
            return Err(CatalogError::InvalidInput("genre cannot be empty".into()));
        }
        self.visible(viewer, |item| self.genre_match.matches(&item.genre, genre))
    }

    /// Audiovisual items whose cast includes a name containing `actor`,
    /// ignoring case. Best rated first.
    pub fn search_by_actor(&self, viewer: &Viewer, actor: &str) -> Result<Vec<CatalogItem>> {
        let needle = actor.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CatalogError::InvalidInput("actor name cannot be empty".into()));
        }

        let items = self
            .store
            .find_all(ContentKind::AudioVisual)
            .map_err(log_store_error)?;
        let found: Vec<CatalogItem> = self
            .gate
            .filter(items, viewer)
            .filter(|item| match &item.details {
                KindDetails::AudioVisual { actors, .. } => actors
                    .iter()
                    .any(|name| name.to_lowercase().contains(&needle)),
                KindDetails::Audio { .. } => false,
            })
            .collect();
        debug!("Actor search '{actor}' found {} items", found.len());
        Ok(found)
    }

    /// Trending: rated items of both kinds, best first.
    pub fn top_rated(&self, viewer: &Viewer, limit: usize) -> Result<Vec<CatalogItem>> {
        let mut items = self.visible(viewer, |item| item.average_rating > 0.0)?;
        items.truncate(limit);
        Ok(items)
    }

    pub fn content_report(&self) -> Result<ContentReport> {
        let audiovisual = self
            .store
            .find_all(ContentKind::AudioVisual)
            .map_err(log_store_error)?;
        let audio = self.store.find_all(ContentKind::Audio).map_err(log_store_error)?;
        let total_audiovisual = audiovisual.len();
        let total_audio = audio.len();

        let top_rated = algorithm::merge_by_rating(vec![audiovisual, audio])
            .into_iter()
            .filter(|item| item.average_rating > 0.0)
            .take(REPORT_TOP_RATED)
            .map(|item| format!("{} ({:.1}/10)", item.title, item.average_rating))
            .collect();

        Ok(ContentReport {
            total_audiovisual,
            total_audio,
            top_rated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age_gate::UnknownRatingPolicy;
    use crate::db::tests::{movie, track};
    use crate::db::SqliteStore;

    fn browser() -> CatalogBrowser<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_item(&movie(1, "Drama", "G", 6.0)).unwrap();
        store.insert_item(&movie(2, "Crime Drama", "R", 9.0)).unwrap();
        store.insert_item(&movie(3, "Comedy", "NC-17", 8.0)).unwrap();
        store.insert_item(&track(1, "Drama", "General", 7.0)).unwrap();
        store.insert_item(&track(2, "Hip-Hop", "Explicit", 0.0)).unwrap();
        CatalogBrowser::new(
            Arc::new(store),
            AgeGate::new(UnknownRatingPolicy::Deny),
            GenreMatch::Contains,
        )
    }

    fn refs(items: &[CatalogItem]) -> Vec<String> {
        items.iter().map(|i| i.content_ref().to_string()).collect()
    }

    #[test]
    fn test_list_is_gated() {
        let browser = browser();
        let kid = Viewer::new(1, "G");
        let adult = Viewer::new(2, "R");

        assert_eq!(refs(&browser.list(&kid, ContentKind::AudioVisual).unwrap()), vec!["audiovisual#1"]);
        assert_eq!(
            refs(&browser.list(&adult, ContentKind::AudioVisual).unwrap()),
            vec!["audiovisual#2", "audiovisual#1"]
        );
    }

    #[test]
    fn test_title_search_spans_kinds() {
        let browser = browser();
        let adult = Viewer::new(2, "R");

        let found = browser.search_by_title(&adult, "  TRACK ").unwrap();
        assert_eq!(refs(&found), vec!["audio#1", "audio#2"]);
        assert!(matches!(
            browser.search_by_title(&adult, "   "),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_genre_search_uses_matcher_and_gate() {
        let browser = browser();
        let teen = Viewer::new(3, "PG-13");
        let adult = Viewer::new(2, "R");

        assert_eq!(
            refs(&browser.search_by_genre(&teen, "drama").unwrap()),
            vec!["audio#1", "audiovisual#1"]
        );
        assert_eq!(
            refs(&browser.search_by_genre(&adult, "drama").unwrap()),
            vec!["audiovisual#2", "audio#1", "audiovisual#1"]
        );
    }

    #[test]
    fn test_actor_search_is_gated_and_case_insensitive() {
        let browser = browser();
        let kid = Viewer::new(1, "G");
        let adult = Viewer::new(2, "R");

        // Every fixture movie lists "Lead Actor"; NC-17 is unknown and denied.
        assert_eq!(
            refs(&browser.search_by_actor(&adult, "lead ACTOR").unwrap()),
            vec!["audiovisual#2", "audiovisual#1"]
        );
        assert_eq!(refs(&browser.search_by_actor(&kid, "extra 1").unwrap()), vec!["audiovisual#1"]);
        assert!(browser.search_by_actor(&kid, "extra 2").unwrap().is_empty());
        assert!(matches!(
            browser.search_by_actor(&adult, " "),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_top_rated_skips_unrated() {
        let browser = browser();
        let adult = Viewer::new(2, "Explicit");
        assert_eq!(
            refs(&browser.top_rated(&adult, 10).unwrap()),
            vec!["audiovisual#2", "audio#1", "audiovisual#1"]
        );
        assert_eq!(browser.top_rated(&adult, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_content_report() {
        let report = browser().content_report().unwrap();
        assert_eq!(report.total_audiovisual, 3);
        assert_eq!(report.total_audio, 2);
        assert_eq!(
            report.top_rated,
            vec![
                "Movie 2 (9.0/10)",
                "Movie 3 (8.0/10)",
                "Track 1 (7.0/10)",
                "Movie 1 (6.0/10)"
            ]
        );
    }

    #[test]
    fn test_content_report_counts_each_kind() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_item(&track(1, "Jazz", "General", 4.0)).unwrap();
        store.insert_item(&track(2, "Jazz", "General", 0.0)).unwrap();
        let browser = CatalogBrowser::new(
            Arc::new(store),
            AgeGate::new(UnknownRatingPolicy::Deny),
            GenreMatch::Contains,
        );

        let report = browser.content_report().unwrap();
        assert_eq!(report.total_audiovisual, 0);
        assert_eq!(report.total_audio, 2);
        assert_eq!(report.top_rated, vec!["Track 1 (4.0/10)"]);
    }
}
