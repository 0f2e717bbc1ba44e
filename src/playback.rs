//! Playback tracking.
//!
//! Playing an item creates (or resets) one entry per viewer and item; progress
//! updates overwrite it in place. "Continue watching" is derived from the
//! history at read time and is never stored separately, so it always reflects
//! the latest progress update.
//!
//! Only raw seconds are stored. Percent complete is a display concern, see
//! [`PlaybackEntry::fraction_of`].

use crate::content::{ContentRef, PlaybackEntry, ViewerId};
use crate::error::{log_store_error, CatalogError, Result};
use crate::store::{CatalogStore, PlaybackStore};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_CONTINUE_WATCHING_LIMIT: usize = 20;

#[derive(Debug)]
pub struct PlaybackTracker<S> {
    store: Arc<S>,
    history_limit: usize,
    continue_watching_limit: usize,
}

impl<S> PlaybackTracker<S>
where
    S: CatalogStore + PlaybackStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_limits(store, DEFAULT_HISTORY_LIMIT, DEFAULT_CONTINUE_WATCHING_LIMIT)
    }

    pub fn with_limits(store: Arc<S>, history_limit: usize, continue_watching_limit: usize) -> Self {
        Self {
            store,
            history_limit,
            continue_watching_limit,
        }
    }

    /// Start (or restart) playback of `content`: progress goes back to zero.
    pub fn record_play(&self, viewer: ViewerId, content: ContentRef) -> Result<()> {
        debug!("Recording play of {content} for viewer {viewer}");
        // Existence only; playback is not age-gated here.
        if self
            .store
            .find_by_id(content)
            .map_err(log_store_error)?
            .is_none()
        {
            return Err(CatalogError::ContentNotFound { content });
        }

        self.store
            .upsert_play(viewer, content, Utc::now())
            .map_err(log_store_error)?;
        info!("Viewer {viewer} started {content}");
        Ok(())
    }

    /// Overwrite the playback position of a previously played item.
    ///
    /// Reaching the item's full duration marks the entry completed, which
    /// drops it from [`continue_watching`](Self::continue_watching).
    pub fn update_progress(
        &self,
        viewer: ViewerId,
        content: ContentRef,
        progress_seconds: i64,
    ) -> Result<()> {
        let progress = u32::try_from(progress_seconds).map_err(|_| {
            CatalogError::InvalidInput(format!(
                "progress must be a non-negative number of seconds, got {progress_seconds}"
            ))
        })?;

        let item = self
            .store
            .find_by_id(content)
            .map_err(log_store_error)?
            .ok_or(CatalogError::ContentNotFound { content })?;
        let completed = item.duration_seconds > 0 && progress >= item.duration_seconds;

        let updated = self
            .store
            .update_progress(viewer, content, progress, completed, Utc::now())
            .map_err(log_store_error)?;
        if !updated {
            return Err(CatalogError::NotFound(format!(
                "no playback of {content} for viewer {viewer}; play it before recording progress"
            )));
        }

        debug!("Viewer {viewer} at {progress}s of {content} (completed: {completed})");
        Ok(())
    }

    /// Most recent first, capped at the configured history limit.
    pub fn history(&self, viewer: ViewerId) -> Result<Vec<PlaybackEntry>> {
        self.store
            .history(viewer, self.history_limit)
            .map_err(log_store_error)
    }

    /// Entries with progress that are not finished yet, most recent first.
    /// Always a subset of [`history`](Self::history).
    pub fn continue_watching(&self, viewer: ViewerId) -> Result<Vec<PlaybackEntry>> {
        Ok(self
            .history(viewer)?
            .into_iter()
            .filter(|entry| entry.progress_seconds > 0 && !entry.completed)
            .take(self.continue_watching_limit)
            .collect())
    }
}
