//! Rating aggregation.
//!
//! A submission upserts the viewer's score and recomputes the item's average
//! from every recorded score. The store runs both steps as one transaction,
//! so two sessions rating the same item (in this process or another one on
//! the same database) cannot lose each other's update.

use crate::content::{ContentRef, RatingSubmission, ViewerId};
use crate::error::{log_store_error, CatalogError, Result};
use crate::store::RatingStore;
use log::info;
use std::sync::Arc;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug)]
pub struct RatingAggregator<S> {
    store: Arc<S>,
}

impl<S: RatingStore> RatingAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record `score` for `content` by `viewer` and return the new average.
    ///
    /// Fails with [`CatalogError::InvalidInput`] for scores outside
    /// [1.0, 10.0] and [`CatalogError::ContentNotFound`] for unknown items;
    /// in both cases nothing is written. Resubmitting overwrites the
    /// viewer's previous score.
    pub fn submit_rating(&self, viewer: ViewerId, content: ContentRef, score: f64) -> Result<f64> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(CatalogError::InvalidInput(format!(
                "score must be between {MIN_SCORE:.1} and {MAX_SCORE:.1}, got {score}"
            )));
        }

        let submission = RatingSubmission {
            viewer,
            content,
            score,
        };
        let average = self
            .store
            .record_rating(&submission)
            .map_err(log_store_error)?
            .ok_or(CatalogError::ContentNotFound { content })?;

        info!("Viewer {viewer} rated {content} {score:.1}; average now {average:.2}");
        Ok(average)
    }
}
