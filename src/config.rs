//! # Configuration Module
//!
//! Data directory setup and runtime configuration for Reel.
//!
//! ## Data Storage
//!
//! Reel stores its database in the platform-standard data directory:
//! - Linux: `~/.local/share/reel/catalog.db`
//! - macOS: `~/Library/Application Support/reel/catalog.db`
//! - Windows: `%APPDATA%\reel\catalog.db`
//!
//! ## Load Order
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults
//! 2. JSON file (`<data_dir>/reel/config.json`, or an explicit `--config` path)
//! 3. Environment: `REEL_DB_PATH`, `REEL_UNKNOWN_RATING`
//! 4. The `--db` command-line flag, applied by the caller via
//!    [`RuntimeConfig::with_db_path`]

use crate::age_gate::UnknownRatingPolicy;
use crate::engine::EngineSettings;
use anyhow::{Context, Result};
use log::debug;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "REEL_DB_PATH";
pub const UNKNOWN_RATING_ENV: &str = "REEL_UNKNOWN_RATING";

const APP_DIR: &str = "reel";
const DB_FILE: &str = "catalog.db";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-appropriate data directory for Reel, creating it if
/// needed.
///
/// # Errors
///
/// Fails when the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let reel_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&reel_dir).with_context(|| {
        format!(
            "Failed to create Reel data directory at {}. Please check file permissions.",
            reel_dir.display()
        )
    })?;

    Ok(reel_dir)
}

/// Returns the platform-appropriate database file path.
///
/// ```no_run
/// use reel::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Configuration for runtime behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    #[serde(flatten)]
    pub engine: EngineSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path().unwrap_or_else(|_| PathBuf::from(DB_FILE)),
            engine: EngineSettings::default(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults, then `config_file` (or the default config file if it
    /// exists), then environment overrides.
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_file = get_data_dir()?.join(CONFIG_FILE);
                if default_file.exists() {
                    Self::from_file(&default_file)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env()?;
        config.db_path = absolutize(&config.db_path)?;
        debug!("Runtime configuration: {config:?}");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(db_path) = env::var_os(DB_PATH_ENV) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Ok(policy) = env::var(UNKNOWN_RATING_ENV) {
            self.engine.unknown_rating = policy
                .parse::<UnknownRatingPolicy>()
                .with_context(|| format!("Invalid {UNKNOWN_RATING_ENV}"))?;
        }
        Ok(())
    }

    /// Override the database path, e.g. from `--db`.
    pub fn with_db_path(mut self, db_path: &Path) -> Result<Self> {
        self.db_path = absolutize(db_path)?;
        Ok(self)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Cannot resolve path {}", path.display()))?
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::GenreMatch;

    #[test]
    fn test_get_db_path_returns_valid_path() {
        let path = get_db_path().expect("Should get valid path");
        assert_eq!(path.file_name().unwrap(), "catalog.db");

        let parent = path.parent().expect("Database path should have parent");
        assert_eq!(parent.file_name().unwrap(), "reel");
        assert!(parent.is_dir());
        assert!(path.is_absolute(), "Database path should be absolute");
    }

    #[test]
    fn test_get_db_path_consistent_results() {
        let path1 = get_db_path().expect("First call should succeed");
        let path2 = get_db_path().expect("Second call should succeed");
        assert_eq!(path1, path2);
    }

    #[test]
    fn test_from_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        fs::write(
            &file,
            r#"{ "db_path": "/tmp/reel-test.db", "genre_match": "exact", "popular_split": { "audiovisual": 1, "audio": 4 } }"#,
        )
        .unwrap();

        let config = RuntimeConfig::from_file(&file).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/reel-test.db"));
        assert_eq!(config.engine.genre_match, GenreMatch::Exact);
        assert_eq!(config.engine.popular_split.audio, 4);
        assert_eq!(config.engine.history_limit, 50);
        assert_eq!(config.engine.unknown_rating, UnknownRatingPolicy::Deny);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        fs::write(&file, r#"{ "unknown_rating": "maybe" }"#).unwrap();
        assert!(RuntimeConfig::from_file(&file).is_err());
        assert!(RuntimeConfig::from_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_with_db_path_absolutizes() {
        let config = RuntimeConfig::default()
            .with_db_path(Path::new("some/relative.db"))
            .unwrap();
        assert!(config.db_path.is_absolute());
        assert!(config.db_path.ends_with("some/relative.db"));
    }
}
