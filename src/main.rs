//! # Reel
//!
//! Command-line front end for the catalog personalization engine. Each
//! invocation builds an explicit viewer session from the global flags, opens
//! the catalog database and runs one command.
//!
//! ```bash
//! reel init-db
//! reel import catalog.json
//! reel --viewer 3 --ceiling PG-13 play audiovisual 12
//! reel --viewer 3 --ceiling PG-13 progress audiovisual 12 600
//! reel --viewer 3 --ceiling PG-13 continue
//! ```
//!
//! Logging is controlled via `RUST_LOG`:
//! - `RUST_LOG=debug reel recommend`
//! - `RUST_LOG=reel::recommend=trace reel recommend`

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use reel::catalog::ContentReport;
use reel::cli::{self, Args, Command, FavoriteAction, PlaylistAction};
use reel::completion;
use reel::config::RuntimeConfig;
use reel::content::{CatalogItem, PlaybackEntry, PlaylistId, Viewer};
use reel::db::{self, SqliteStore};
use reel::engine::Engine;
use reel::error::{log_store_error, CatalogError};
use reel::recommend::Basis;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        match err.downcast_ref::<CatalogError>() {
            // Business-rule failures are expected outcomes, not crashes.
            Some(business) if !business.is_fatal() => eprintln!("{business}"),
            _ => eprintln!("Error: {err:#}"),
        }
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    // Commands that need no configuration or database
    match &args.command {
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(*shell), &mut cmd);
            return Ok(());
        }
        Command::InitDb { force } => {
            let config = load_config(&args)?;
            info!("Initializing catalog database at: {}", config.db_path.display());
            db::init_database(&config.db_path, *force).map_err(log_store_error)?;
            println!("Created catalog database at {}", config.db_path.display());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&args)?;
    let session = args.session();
    debug!("Session: viewer {} with ceiling {}", session.id, session.ceiling);

    let store = SqliteStore::open(&config.db_path).map_err(log_store_error)?;
    let engine = Engine::new(store, config.engine);

    match args.command {
        Command::Completion { .. } | Command::InitDb { .. } => {}
        Command::Import { file } => {
            let count = import_catalog(&engine, &file)?;
            println!("Imported {count} items");
        }
        Command::List { kind } => print_items(&engine.list(&session, kind)?),
        Command::Search { query } => print_items(&engine.search_by_title(&session, &query)?),
        Command::Genre { genre } => print_items(&engine.search_by_genre(&session, &genre)?),
        Command::Actor { name } => print_items(&engine.search_by_actor(&session, &name)?),
        Command::Top { limit } => print_items(&engine.top_rated(&session, limit)?),
        Command::Report => print_report(&engine.content_report()?),
        Command::Rate { target, score } => {
            let average = engine.submit_rating(&session, target.content(), score)?;
            println!("Rated {} {score:.1}; average is now {average:.1}/10", target.content());
        }
        Command::Play { target } => {
            engine.record_play(&session, target.content())?;
            println!("Playing {}", target.content());
        }
        Command::Progress { target, seconds } => {
            engine.update_progress(&session, target.content(), seconds)?;
            println!("Saved position {seconds}s for {}", target.content());
        }
        Command::History => print_playback(&engine, &engine.history(&session)?)?,
        Command::Continue => print_playback(&engine, &engine.continue_watching(&session)?)?,
        Command::Favorite { action } => match action {
            FavoriteAction::Add { target } => {
                engine.add_favorite(&session, target.content())?;
                println!("Added {} to favorites", target.content());
            }
            FavoriteAction::Remove { target } => {
                engine.remove_favorite(&session, target.content())?;
                println!("Removed {} from favorites", target.content());
            }
            FavoriteAction::List => {
                for favorite in engine.list_favorites(&session)? {
                    match engine.item(favorite.content)? {
                        Some(item) => println!("{}", describe(&item)),
                        None => println!("[{}] (no longer in catalog)", favorite.content),
                    }
                }
            }
        },
        Command::Playlist { action } => run_playlist(&engine, &session, action)?,
        Command::Recommend { limit, explain } => {
            let recommendations = engine.recommend_explained(&session, limit)?;
            if explain {
                match &recommendations.basis {
                    Basis::Popular => println!("Based on: popular items"),
                    Basis::Genre { genre, favorites } => {
                        println!("Based on: {genre} ({favorites} favorites)");
                    }
                }
                println!("Recent plays considered: {}", recommendations.recent_plays);
            }
            print_items(&recommendations.items);
        }
        Command::CompleteTitles => {
            for title in completion::title_completions(engine.store()).map_err(log_store_error)? {
                println!("{}", completion::quote_completion(&title));
            }
        }
    }

    Ok(())
}

fn run_playlist(engine: &Engine<SqliteStore>, session: &Viewer, action: PlaylistAction) -> Result<()> {
    match action {
        PlaylistAction::Create { name, description } => {
            let playlist = engine.create_playlist(session, &name, &description)?;
            println!("Created playlist {} '{}'", playlist.id, playlist.name);
        }
        PlaylistAction::List => {
            let playlists = engine.list_playlists(session)?;
            if playlists.is_empty() {
                println!("Nothing to show");
            }
            for playlist in playlists {
                if playlist.description.is_empty() {
                    println!("[{}] {}", playlist.id, playlist.name);
                } else {
                    println!("[{}] {} - {}", playlist.id, playlist.name, playlist.description);
                }
            }
        }
        PlaylistAction::Show { playlist } => {
            let items = engine.playlist_items(session, PlaylistId(playlist))?;
            if items.is_empty() {
                println!("Nothing to show");
            }
            for entry in items {
                match engine.item(entry.content)? {
                    Some(item) => println!("{}. {}", entry.position, describe(&item)),
                    None => println!("{}. [{}] (no longer in catalog)", entry.position, entry.content),
                }
            }
        }
        PlaylistAction::Delete { playlist } => {
            engine.delete_playlist(session, PlaylistId(playlist))?;
            println!("Deleted playlist {playlist}");
        }
        PlaylistAction::Add { playlist, target } => {
            let position = engine.add_to_playlist(session, PlaylistId(playlist), target.content())?;
            println!("Added {} to playlist {playlist} at position {position}", target.content());
        }
        PlaylistAction::Remove { playlist, target } => {
            engine.remove_from_playlist(session, PlaylistId(playlist), target.content())?;
            println!("Removed {} from playlist {playlist}", target.content());
        }
    }
    Ok(())
}

fn load_config(args: &cli::Args) -> Result<RuntimeConfig> {
    let config = RuntimeConfig::load(args.config.as_deref())?;
    match &args.db {
        Some(db) => config.with_db_path(db),
        None => Ok(config),
    }
}

fn import_catalog(engine: &Engine<SqliteStore>, file: &Path) -> Result<usize> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read catalog file {}", file.display()))?;
    let items: Vec<CatalogItem> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid catalog file {}", file.display()))?;
    Ok(engine.store().import_items(&items).map_err(log_store_error)?)
}

fn describe(item: &CatalogItem) -> String {
    let rating = if item.average_rating > 0.0 {
        format!("{:.1}/10", item.average_rating)
    } else {
        "unrated".to_string()
    };
    format!(
        "[{}] {} ({}, {}) {rating}",
        item.content_ref(),
        item.title,
        item.genre,
        item.age_rating
    )
}

fn print_items(items: &[CatalogItem]) {
    if items.is_empty() {
        println!("Nothing to show");
    }
    for item in items {
        println!("{}", describe(item));
    }
}

fn print_playback(engine: &Engine<SqliteStore>, entries: &[PlaybackEntry]) -> Result<()> {
    if entries.is_empty() {
        println!("Nothing to show");
    }
    for entry in entries {
        // History is shown regardless of the current ceiling.
        let line = match engine.item(entry.content)? {
            Some(item) => format!(
                "{} - {}s ({:.0}%)",
                describe(&item),
                entry.progress_seconds,
                entry.fraction_of(&item) * 100.0
            ),
            None => format!("[{}] {}s", entry.content, entry.progress_seconds),
        };
        let status = if entry.completed { " finished" } else { "" };
        println!("{line}{status} at {}", entry.watched_at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn print_report(report: &ContentReport) {
    println!("Audiovisual items: {}", report.total_audiovisual);
    println!("Audio items:       {}", report.total_audio);
    println!("Top rated:");
    for (rank, title) in report.top_rated.iter().enumerate() {
        println!("  {}. {title}", rank + 1);
    }
}
