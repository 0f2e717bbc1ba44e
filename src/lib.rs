//! Catalog personalization and access control for a media subscription
//! service.
//!
//! Core modules:
//! - [`age_gate`] - Which items a viewer may see
//! - [`rating`] - Score submission and average recomputation
//! - [`playback`] - Playback history and "continue watching"
//! - [`favorites`] - Per-viewer favorites set
//! - [`playlists`] - Per-viewer ordered playlists
//! - [`recommend`] - Genre-affinity recommendations
//! - [`catalog`] - Gated listing, title/genre/actor search and trending
//!
//! ### Supporting Modules
//!
//! - [`content`] - Domain types shared by every component
//! - [`store`] / [`db`] - Persistence traits and the SQLite implementation
//! - [`algorithm`] - Pure genre tally and list-merging helpers
//! - [`engine`] - One facade wiring the components over a shared store
//! - [`config`] - Data directory and runtime configuration
//! - [`cli`] / [`completion`] - Command-line definitions and shell completion
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use reel::content::{ContentRef, Viewer};
//! use reel::db::SqliteStore;
//! use reel::engine::{Engine, EngineSettings};
//!
//! let store = SqliteStore::open(&reel::config::get_db_path()?)?;
//! let engine = Engine::new(store, EngineSettings::default());
//!
//! // Sessions are explicit values, not process state.
//! let viewer = Viewer::new(7, "PG-13");
//! engine.add_favorite(&viewer, ContentRef::AudioVisual(10))?;
//! engine.record_play(&viewer, ContentRef::Audio(3))?;
//! engine.update_progress(&viewer, ContentRef::Audio(3), 95)?;
//!
//! for item in engine.recommend(&viewer, 5)? {
//!     println!("{} ({})", item.title, item.genre);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Component methods return [`error::Result`]. Business-rule failures
//! (unknown content, invalid input, conflicts, missing entries) are plain
//! variants of [`error::CatalogError`]; only [`error::CatalogError::Store`]
//! signals an unexpected persistence failure, and it is logged with its full
//! source chain before being returned.

pub mod age_gate;
pub mod algorithm;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod playback;
pub mod playlists;
pub mod rating;
pub mod recommend;
pub mod store;
