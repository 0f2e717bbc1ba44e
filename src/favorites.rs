//! Per-viewer favorites. Set semantics: a (viewer, item) pair is either
//! present or not, and adding it twice is a conflict.

use crate::content::{ContentRef, FavoriteEntry, ViewerId};
use crate::error::{log_store_error, CatalogError, Result};
use crate::store::{CatalogStore, FavoriteStore};
use chrono::Utc;
use log::info;
use std::sync::Arc;

#[derive(Debug)]
pub struct FavoritesSet<S> {
    store: Arc<S>,
}

impl<S> FavoritesSet<S>
where
    S: CatalogStore + FavoriteStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn add(&self, viewer: ViewerId, content: ContentRef) -> Result<()> {
        if self
            .store
            .find_by_id(content)
            .map_err(log_store_error)?
            .is_none()
        {
            return Err(CatalogError::ContentNotFound { content });
        }

        let inserted = self
            .store
            .insert_favorite(viewer, content, Utc::now())
            .map_err(log_store_error)?;
        if !inserted {
            return Err(CatalogError::Conflict(format!(
                "{content} is already a favorite of viewer {viewer}"
            )));
        }

        info!("Viewer {viewer} favorited {content}");
        Ok(())
    }

    pub fn remove(&self, viewer: ViewerId, content: ContentRef) -> Result<()> {
        let deleted = self
            .store
            .delete_favorite(viewer, content)
            .map_err(log_store_error)?;
        if !deleted {
            return Err(CatalogError::NotFound(format!(
                "{content} is not a favorite of viewer {viewer}"
            )));
        }

        info!("Viewer {viewer} unfavorited {content}");
        Ok(())
    }

    /// Most recently added first.
    pub fn list(&self, viewer: ViewerId) -> Result<Vec<FavoriteEntry>> {
        self.store.favorites(viewer).map_err(log_store_error)
    }
}
