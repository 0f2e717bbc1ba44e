//! Error types for catalog personalization.
//!
//! Business-rule failures are returned as [`CatalogError`] variants and never
//! panic. Persistence failures are wrapped in [`StoreError`] with a context
//! message describing what was being attempted.

use crate::content::ContentRef;
use std::error::Error as StdError;
use thiserror::Error;

/// Result alias used by every core component.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failure taxonomy of the personalization engine.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Referenced content does not exist for the given kind.
    #[error("Content not found: {content}")]
    ContentNotFound { content: ContentRef },

    /// Out-of-range score, negative progress, unknown content kind token.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Set-semantics violation, e.g. favoriting twice.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Removing or updating an entry that was never created.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// True only for persistence failures; everything else is a business rule.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Opaque persistence failure with context.
#[derive(Error, Debug)]
#[error("Store error: {context}")]
pub struct StoreError {
    context: String,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl StoreError {
    pub fn new<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Attach a context message to a fallible store call, like
/// `anyhow::Context::with_context` but producing a typed [`StoreError`].
pub trait StoreContext<T> {
    fn store_context<F, S>(self, f: F) -> std::result::Result<T, StoreError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> StoreContext<T> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn store_context<F, S>(self, f: F) -> std::result::Result<T, StoreError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| StoreError::new(f(), err))
    }
}

/// Log a store failure with its full source chain, then hand it back.
pub fn log_store_error(err: StoreError) -> CatalogError {
    let mut chain = String::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    log::error!("{}{chain}", err);
    CatalogError::Store(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_store_context_wraps_source() {
        let failing: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        let err = failing.store_context(|| "writing rating").unwrap_err();

        assert_eq!(err.context(), "writing rating");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
        assert!(err.to_string().contains("writing rating"));
    }

    #[test]
    fn test_only_store_errors_are_fatal() {
        let store = StoreError::new("x", io::Error::new(io::ErrorKind::Other, "y"));
        assert!(CatalogError::from(store).is_fatal());
        assert!(!CatalogError::InvalidInput("score".into()).is_fatal());
        assert!(!CatalogError::Conflict("dup".into()).is_fatal());
    }

    #[test]
    fn test_logged_store_errors_stay_fatal() {
        let err = log_store_error(StoreError::new(
            "opening catalog",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        ));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Store error: opening catalog");
    }
}
