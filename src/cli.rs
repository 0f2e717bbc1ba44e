//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `reel` binary. Every command runs on
//! behalf of one viewer, described by the global `--viewer` and
//! `--ceiling`/`--profile` flags; nothing about the viewer is remembered
//! between invocations.
//!
//! ## Examples
//!
//! ```bash
//! reel init-db
//! reel import catalog.json
//! reel --viewer 7 --ceiling PG-13 recommend
//! reel --viewer 7 --profile kids search "ocean"
//! reel --viewer 7 rate audiovisual 12 8.5
//! reel --viewer 7 playlist create "Road Trip"
//! reel --viewer 7 playlist add 1 audio 3
//! ```

use crate::age_gate::AgeRating;
use crate::content::{ContentKind, ContentRef, Viewer};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn parse_profile(profile_type: &str) -> Result<AgeRating, String> {
    AgeRating::for_profile_type(profile_type)
        .ok_or_else(|| format!("unknown profile type '{profile_type}', expected kids, teen or adult"))
}

#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(about = "Reel: personal catalog, playback tracking and recommendations")]
#[command(version)]
pub struct Args {
    /// Viewer (account or profile) id the command runs for
    #[arg(long, global = true, default_value_t = 1)]
    pub viewer: i64,

    /// Maximum age rating the viewer may see (G, PG, PG-13, R, General, Explicit)
    #[arg(long, global = true, conflicts_with = "profile")]
    pub ceiling: Option<String>,

    /// Use the ceiling of a profile category (kids, teen, adult) instead of --ceiling
    #[arg(long, global = true, value_parser = parse_profile)]
    pub profile: Option<AgeRating>,

    /// Database file, overriding config and REEL_DB_PATH
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// The viewer described by the global flags. Without `--ceiling` or
    /// `--profile` the most restrictive ceiling is used.
    #[must_use]
    pub fn session(&self) -> Viewer {
        let ceiling = match (&self.ceiling, self.profile) {
            (Some(ceiling), _) => ceiling.clone(),
            (None, Some(profile)) => profile.as_str().to_string(),
            (None, None) => AgeRating::General.as_str().to_string(),
        };
        Viewer::new(self.viewer, ceiling)
    }
}

/// A catalog item on the command line: `<KIND> <ID>`.
#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct Target {
    /// audiovisual or audio
    pub kind: ContentKind,
    pub id: i64,
}

impl Target {
    #[must_use]
    pub fn content(self) -> ContentRef {
        ContentRef::new(self.kind, self.id)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty catalog database
    InitDb {
        /// Delete and recreate the database if it already exists
        #[arg(long)]
        force: bool,
    },

    /// Import catalog items from a JSON array
    Import {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// List available items of one kind the viewer may see
    List {
        /// audiovisual or audio
        kind: ContentKind,
    },

    /// Search titles (case-insensitive substring)
    Search { query: String },

    /// Items of a genre
    Genre { genre: String },

    /// Audiovisual items featuring an actor (case-insensitive substring)
    Actor { name: String },

    /// Best rated items across both kinds
    Top {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Catalog totals and best rated titles
    Report,

    /// Rate an item from 1.0 to 10.0
    Rate {
        #[command(flatten)]
        target: Target,
        score: f64,
    },

    /// Start (or restart) playback of an item
    Play {
        #[command(flatten)]
        target: Target,
    },

    /// Record playback position in seconds
    Progress {
        #[command(flatten)]
        target: Target,
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },

    /// Recent playback, most recent first
    History,

    /// Started but unfinished items
    Continue,

    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Manage playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Recommendations based on favorite genres
    Recommend {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Also show why these items were chosen
        #[arg(short, long)]
        explain: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: reel completion bash > ~/.local/share/bash-completion/completions/reel
    Completion { shell: Shell },

    /// List catalog titles for completion scripts (hidden command)
    #[command(hide = true)]
    CompleteTitles,
}

#[derive(Subcommand, Debug)]
pub enum FavoriteAction {
    Add {
        #[command(flatten)]
        target: Target,
    },
    Remove {
        #[command(flatten)]
        target: Target,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Create an empty playlist
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List the viewer's playlists, newest first
    List,
    /// Show the items of a playlist in order
    Show { playlist: i64 },
    Delete { playlist: i64 },
    /// Append an item to a playlist
    Add {
        playlist: i64,
        #[command(flatten)]
        target: Target,
    },
    Remove {
        playlist: i64,
        #[command(flatten)]
        target: Target,
    },
}
