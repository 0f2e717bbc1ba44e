//! SQLite-backed store.
//!
//! Each content kind has its own table with the shared columns plus its
//! kind-specific ones, so ids are only unique per kind. Ratings, playback and
//! favorites are keyed by `(viewer_id, content_id, content_type)`; playlist items
//! by `(playlist_id, content_id, content_type)`.
//!
//! The connection sits behind a mutex: every store call runs to completion
//! before the next one starts. Separate handles on the same file (one per
//! process, typically) are serialized by SQLite's own locking.

use crate::content::{
    CatalogItem, ContentKind, ContentRef, FavoriteEntry, KindDetails, PlaybackEntry, Playlist,
    PlaylistId, PlaylistItem, RatingSubmission, ViewerId,
};
use crate::error::{StoreContext, StoreError};
use crate::store::{
    CatalogStore, FavoriteStore, PlaybackStore, PlaylistStore, RatingStore, StoreResult,
};
use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS audiovisual_content (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT    NOT NULL,
        genre            TEXT    NOT NULL,
        age_rating       TEXT    NOT NULL,
        duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK (duration_seconds >= 0),
        average_rating   REAL    NOT NULL DEFAULT 0.0,
        is_available     INTEGER NOT NULL DEFAULT 1 CHECK (is_available IN (0, 1)),
        synopsis         TEXT    NOT NULL DEFAULT '',
        release_year     INTEGER NOT NULL DEFAULT 0,
        director         TEXT    NOT NULL DEFAULT '',
        actors           TEXT    NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS audio_content (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT    NOT NULL,
        genre            TEXT    NOT NULL,
        age_rating       TEXT    NOT NULL,
        duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK (duration_seconds >= 0),
        average_rating   REAL    NOT NULL DEFAULT 0.0,
        is_available     INTEGER NOT NULL DEFAULT 1 CHECK (is_available IN (0, 1)),
        artist           TEXT    NOT NULL DEFAULT '',
        album            TEXT    NOT NULL DEFAULT '',
        track_number     INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS user_ratings (
        viewer_id    INTEGER NOT NULL,
        content_id   INTEGER NOT NULL,
        content_type TEXT    NOT NULL,
        rating       REAL    NOT NULL CHECK (rating BETWEEN 1.0 AND 10.0),
        rated_at     DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (viewer_id, content_id, content_type)
    );

    CREATE TABLE IF NOT EXISTS playback_history (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        viewer_id        INTEGER NOT NULL,
        content_id       INTEGER NOT NULL,
        content_type     TEXT    NOT NULL,
        progress_seconds INTEGER NOT NULL DEFAULT 0 CHECK (progress_seconds >= 0),
        is_completed     INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
        watched_at       TEXT    NOT NULL,
        seq              INTEGER NOT NULL,
        UNIQUE (viewer_id, content_id, content_type)
    );

    CREATE TABLE IF NOT EXISTS favorites (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        viewer_id    INTEGER NOT NULL,
        content_id   INTEGER NOT NULL,
        content_type TEXT    NOT NULL,
        added_at     TEXT    NOT NULL,
        UNIQUE (viewer_id, content_id, content_type)
    );

    CREATE TABLE IF NOT EXISTS playlists (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        viewer_id    INTEGER NOT NULL,
        name         TEXT    NOT NULL COLLATE NOCASE,
        description  TEXT    NOT NULL DEFAULT '',
        created_at   TEXT    NOT NULL,
        UNIQUE (viewer_id, name)
    );

    CREATE TABLE IF NOT EXISTS playlist_items (
        playlist_id  INTEGER NOT NULL,
        content_id   INTEGER NOT NULL,
        content_type TEXT    NOT NULL,
        position     INTEGER NOT NULL CHECK (position >= 1),
        UNIQUE (playlist_id, content_id, content_type)
    );

    CREATE INDEX IF NOT EXISTS idx_ratings_content ON user_ratings(content_id, content_type);
    CREATE INDEX IF NOT EXISTS idx_playback_viewer ON playback_history(viewer_id, seq);
    CREATE INDEX IF NOT EXISTS idx_favorites_viewer ON favorites(viewer_id, id);
    CREATE INDEX IF NOT EXISTS idx_playlists_viewer ON playlists(viewer_id, id);
    CREATE INDEX IF NOT EXISTS idx_playlist_items ON playlist_items(playlist_id, position);
";

// Columns introduced after the first schema; older databases get them on open.
const ADDED_COLUMNS: [(&str, &str, &str); 1] =
    [("audiovisual_content", "actors", "TEXT NOT NULL DEFAULT '[]'")];

const SELECT_AUDIOVISUAL: &str = "SELECT id, title, genre, age_rating, duration_seconds, average_rating, is_available,
            synopsis, release_year, director, actors
     FROM audiovisual_content";

const SELECT_AUDIO: &str = "SELECT id, title, genre, age_rating, duration_seconds, average_rating, is_available,
            artist, album, track_number
     FROM audio_content";

// How long a connection waits for another one holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Monotonic per database; orders history without relying on clock resolution.
const NEXT_SEQ: &str = "(SELECT COALESCE(MAX(seq), 0) + 1 FROM playback_history)";

impl ToSql for ContentKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ContentKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

const fn table(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::AudioVisual => "audiovisual_content",
        ContentKind::Audio => "audio_content",
    }
}

const fn select(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::AudioVisual => SELECT_AUDIOVISUAL,
        ContentKind::Audio => SELECT_AUDIO,
    }
}

fn item_from_row(kind: ContentKind, row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    let details = match kind {
        ContentKind::AudioVisual => KindDetails::AudioVisual {
            synopsis: row.get(7)?,
            release_year: row.get(8)?,
            director: row.get(9)?,
            actors: actors_from_json(&row.get::<_, String>(10)?)?,
        },
        ContentKind::Audio => KindDetails::Audio {
            artist: row.get(7)?,
            album: row.get(8)?,
            track_number: row.get(9)?,
        },
    };

    Ok(CatalogItem {
        id: row.get(0)?,
        title: row.get(1)?,
        genre: row.get(2)?,
        age_rating: row.get(3)?,
        duration_seconds: row.get(4)?,
        average_rating: row.get(5)?,
        available: row.get(6)?,
        details,
    })
}

// Cast lists are stored as a JSON array of names.
fn actors_from_json(json: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(json)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(err)))
}

fn actors_to_json(actors: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(actors).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn playback_from_row(row: &Row<'_>) -> rusqlite::Result<PlaybackEntry> {
    let kind: ContentKind = row.get(2)?;
    Ok(PlaybackEntry {
        viewer: ViewerId(row.get(0)?),
        content: ContentRef::new(kind, row.get(1)?),
        progress_seconds: row.get(3)?,
        completed: row.get(4)?,
        watched_at: row.get(5)?,
    })
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<FavoriteEntry> {
    let kind: ContentKind = row.get(2)?;
    Ok(FavoriteEntry {
        viewer: ViewerId(row.get(0)?),
        content: ContentRef::new(kind, row.get(1)?),
        added_at: row.get(3)?,
    })
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: PlaylistId(row.get(0)?),
        owner: ViewerId(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn playlist_item_from_row(row: &Row<'_>) -> rusqlite::Result<PlaylistItem> {
    let kind: ContentKind = row.get(2)?;
    Ok(PlaylistItem {
        playlist: PlaylistId(row.get(0)?),
        content: ContentRef::new(kind, row.get(1)?),
        position: row.get(3)?,
    })
}

fn add_missing_columns(conn: &Connection) -> rusqlite::Result<()> {
    for (table, column, definition) in ADDED_COLUMNS {
        let present = {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            names.iter().any(|name| name == column)
        };
        if !present {
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
            info!("Added column {column} to {table}");
        }
    }
    Ok(())
}

fn insert_item_on(conn: &Connection, item: &CatalogItem) -> rusqlite::Result<i64> {
    // id 0 means "let the store assign one".
    let id = (item.id != 0).then_some(item.id);
    match &item.details {
        KindDetails::AudioVisual {
            synopsis,
            release_year,
            director,
            actors,
        } => conn.execute(
            "INSERT INTO audiovisual_content
                (id, title, genre, age_rating, duration_seconds, average_rating, is_available,
                 synopsis, release_year, director, actors)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id,
                item.title,
                item.genre,
                item.age_rating,
                item.duration_seconds,
                item.average_rating,
                item.available,
                synopsis,
                release_year,
                director,
                actors_to_json(actors)?
            ],
        )?,
        KindDetails::Audio {
            artist,
            album,
            track_number,
        } => conn.execute(
            "INSERT INTO audio_content
                (id, title, genre, age_rating, duration_seconds, average_rating, is_available,
                 artist, album, track_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                item.title,
                item.genre,
                item.age_rating,
                item.duration_seconds,
                item.average_rating,
                item.available,
                artist,
                album,
                track_number
            ],
        )?,
    };
    Ok(conn.last_insert_rowid())
}

/// rusqlite-backed implementation of every store trait.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)
            .store_context(|| format!("Failed to open catalog database at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests and benchmarks.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .store_context(|| "Failed to open in-memory catalog database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .store_context(|| "Failed to set database busy timeout")?;
        conn.execute_batch(SCHEMA)
            .store_context(|| "Failed to create catalog schema")?;
        add_missing_columns(&conn).store_context(|| "Failed to upgrade catalog schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied
        // statement behind, so a poisoned connection is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one item and return its id.
    pub fn insert_item(&self, item: &CatalogItem) -> StoreResult<i64> {
        let conn = self.conn();
        let id = insert_item_on(&conn, item)
            .store_context(|| format!("Failed to insert catalog item '{}'", item.title))?;
        trace!("Inserted {} item {id}: {}", item.kind(), item.title);
        Ok(id)
    }

    /// Add many items in a single transaction. Returns how many were written.
    pub fn import_items(&self, items: &[CatalogItem]) -> StoreResult<usize> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .store_context(|| "Failed to begin import transaction")?;

        for item in items {
            insert_item_on(&tx, item)
                .store_context(|| format!("Failed to import catalog item '{}'", item.title))?;
        }

        tx.commit().store_context(|| "Committing import transaction failed")?;
        info!("Imported {} catalog items", items.len());
        Ok(items.len())
    }
}

/// Create a fresh database file at `path`.
///
/// Fails when the file already exists unless `force` is set, in which case
/// the old file is removed first.
pub fn init_database(path: &Path, force: bool) -> StoreResult<SqliteStore> {
    if path.exists() {
        if !force {
            return Err(StoreError::new(
                format!("Database already exists at {} (use --force to overwrite)", path.display()),
                io::Error::from(io::ErrorKind::AlreadyExists),
            ));
        }
        fs::remove_file(path)
            .store_context(|| format!("Failed to remove existing database {}", path.display()))?;
        info!("Removed existing database at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .store_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    SqliteStore::open(path)
}

impl CatalogStore for SqliteStore {
    fn find_by_id(&self, content: ContentRef) -> StoreResult<Option<CatalogItem>> {
        let kind = content.kind();
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(&format!("{} WHERE id = ?1", select(kind)))
            .store_context(|| format!("Invalid SQL statement when SELECTing {content}"))?;

        stmt.query_row([content.id()], |row| item_from_row(kind, row))
            .optional()
            .store_context(|| format!("Failed to query {content}"))
    }

    fn find_all(&self, kind: ContentKind) -> StoreResult<Vec<CatalogItem>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(&format!(
                "{} WHERE is_available = 1 ORDER BY average_rating DESC, id ASC",
                select(kind)
            ))
            .store_context(|| format!("Invalid SQL statement when SELECTing all FROM {}", table(kind)))?;

        let rows = stmt
            .query_map([], |row| item_from_row(kind, row))
            .store_context(|| format!("Cannot query {kind} content"))?;

        let mut items = Vec::new();
        // Could use collect, but then no per-row context.
        for item in rows {
            items.push(item.store_context(|| format!("Queried {kind} row could not be read"))?);
        }
        Ok(items)
    }

    fn update_average_rating(&self, content: ContentRef, new_average: f64) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            &format!("UPDATE {} SET average_rating = ?1 WHERE id = ?2", table(content.kind())),
            params![new_average, content.id()],
        )
        .store_context(|| format!("Failed to update average rating of {content}"))?;
        debug!("Average rating of {content} is now {new_average:.2}");
        Ok(())
    }
}

impl RatingStore for SqliteStore {
    fn record_rating(&self, submission: &RatingSubmission) -> StoreResult<Option<f64>> {
        let content = submission.content;
        let table = table(content.kind());
        let mut conn = self.conn();
        // IMMEDIATE takes the write lock before the existence read, so other
        // connections on the same file queue behind the whole recompute.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .store_context(|| format!("Failed to begin rating transaction for {content}"))?;

        let exists = tx
            .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [content.id()], |_| Ok(()))
            .optional()
            .store_context(|| format!("Failed to query {content}"))?
            .is_some();
        if !exists {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO user_ratings (viewer_id, content_id, content_type, rating)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (viewer_id, content_id, content_type)
             DO UPDATE SET rating = excluded.rating, rated_at = CURRENT_TIMESTAMP",
            params![submission.viewer.0, content.id(), content.kind(), submission.score],
        )
        .store_context(|| {
            format!("Failed to save rating of {content} by viewer {}", submission.viewer)
        })?;

        tx.execute(
            &format!(
                "UPDATE {table}
                 SET average_rating = (SELECT COALESCE(AVG(rating), 0.0) FROM user_ratings
                                       WHERE content_id = ?1 AND content_type = ?2)
                 WHERE id = ?1"
            ),
            params![content.id(), content.kind()],
        )
        .store_context(|| format!("Failed to recompute average rating of {content}"))?;

        let average: f64 = tx
            .query_row(
                &format!("SELECT average_rating FROM {table} WHERE id = ?1"),
                [content.id()],
                |row| row.get(0),
            )
            .store_context(|| format!("Failed to read average rating of {content}"))?;

        tx.commit()
            .store_context(|| format!("Committing rating of {content} failed"))?;
        debug!("Average rating of {content} is now {average:.2}");
        Ok(Some(average))
    }
}

impl PlaybackStore for SqliteStore {
    fn upsert_play(
        &self,
        viewer: ViewerId,
        content: ContentRef,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO playback_history
                    (viewer_id, content_id, content_type, progress_seconds, is_completed, watched_at, seq)
                 VALUES (?1, ?2, ?3, 0, 0, ?4, {NEXT_SEQ})
                 ON CONFLICT (viewer_id, content_id, content_type)
                 DO UPDATE SET progress_seconds = 0, is_completed = 0,
                               watched_at = excluded.watched_at, seq = excluded.seq"
            ),
            params![viewer.0, content.id(), content.kind(), at],
        )
        .store_context(|| format!("Failed to record play of {content} by viewer {viewer}"))?;
        Ok(())
    }

    fn update_progress(
        &self,
        viewer: ViewerId,
        content: ContentRef,
        progress_seconds: u32,
        completed: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                &format!(
                    "UPDATE playback_history
                     SET progress_seconds = ?1, is_completed = ?2, watched_at = ?3, seq = {NEXT_SEQ}
                     WHERE viewer_id = ?4 AND content_id = ?5 AND content_type = ?6"
                ),
                params![
                    progress_seconds,
                    completed,
                    at,
                    viewer.0,
                    content.id(),
                    content.kind()
                ],
            )
            .store_context(|| format!("Failed to update progress of {content} for viewer {viewer}"))?;
        Ok(changed > 0)
    }

    fn history(&self, viewer: ViewerId, limit: usize) -> StoreResult<Vec<PlaybackEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT viewer_id, content_id, content_type, progress_seconds, is_completed, watched_at
                 FROM playback_history
                 WHERE viewer_id = ?1
                 ORDER BY seq DESC
                 LIMIT ?2",
            )
            .store_context(|| "Invalid SQL statement when SELECTing playback history")?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![viewer.0, limit], playback_from_row)
            .store_context(|| format!("Cannot query playback history of viewer {viewer}"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .store_context(|| format!("Playback row of viewer {viewer} could not be read"))
    }
}

impl FavoriteStore for SqliteStore {
    fn insert_favorite(
        &self,
        viewer: ViewerId,
        content: ContentRef,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO favorites (viewer_id, content_id, content_type, added_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![viewer.0, content.id(), content.kind(), at],
            )
            .store_context(|| format!("Failed to add favorite {content} for viewer {viewer}"))?;
        Ok(inserted > 0)
    }

    fn delete_favorite(&self, viewer: ViewerId, content: ContentRef) -> StoreResult<bool> {
        let conn = self.conn();
        let deleted = conn
            .execute(
                "DELETE FROM favorites
                 WHERE viewer_id = ?1 AND content_id = ?2 AND content_type = ?3",
                params![viewer.0, content.id(), content.kind()],
            )
            .store_context(|| format!("Failed to delete favorite {content} for viewer {viewer}"))?;
        Ok(deleted > 0)
    }

    fn favorites(&self, viewer: ViewerId) -> StoreResult<Vec<FavoriteEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT viewer_id, content_id, content_type, added_at
                 FROM favorites
                 WHERE viewer_id = ?1
                 ORDER BY id DESC",
            )
            .store_context(|| "Invalid SQL statement when SELECTing favorites")?;

        let rows = stmt
            .query_map([viewer.0], favorite_from_row)
            .store_context(|| format!("Cannot query favorites of viewer {viewer}"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .store_context(|| format!("Favorite row of viewer {viewer} could not be read"))
    }
}

impl PlaylistStore for SqliteStore {
    fn insert_playlist(
        &self,
        owner: ViewerId,
        name: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Playlist>> {
        let conn = self.conn();
        let inserted = conn
            .execute(
                "INSERT INTO playlists (viewer_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (viewer_id, name) DO NOTHING",
                params![owner.0, name, description, at],
            )
            .store_context(|| format!("Failed to create playlist '{name}' for viewer {owner}"))?;
        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(Playlist {
            id: PlaylistId(conn.last_insert_rowid()),
            owner,
            name: name.to_string(),
            description: description.to_string(),
            created_at: at,
        }))
    }

    fn find_playlist(&self, id: PlaylistId) -> StoreResult<Option<Playlist>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, viewer_id, name, description, created_at FROM playlists WHERE id = ?1",
            )
            .store_context(|| "Invalid SQL statement when SELECTing a playlist")?;

        stmt.query_row([id.0], playlist_from_row)
            .optional()
            .store_context(|| format!("Failed to query playlist {id}"))
    }

    fn playlists(&self, owner: ViewerId) -> StoreResult<Vec<Playlist>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, viewer_id, name, description, created_at
                 FROM playlists
                 WHERE viewer_id = ?1
                 ORDER BY id DESC",
            )
            .store_context(|| "Invalid SQL statement when SELECTing playlists")?;

        let rows = stmt
            .query_map([owner.0], playlist_from_row)
            .store_context(|| format!("Cannot query playlists of viewer {owner}"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .store_context(|| format!("Playlist row of viewer {owner} could not be read"))
    }

    fn delete_playlist(&self, id: PlaylistId) -> StoreResult<bool> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .store_context(|| format!("Failed to begin deleting playlist {id}"))?;

        tx.execute("DELETE FROM playlist_items WHERE playlist_id = ?1", [id.0])
            .store_context(|| format!("Failed to delete items of playlist {id}"))?;
        let deleted = tx
            .execute("DELETE FROM playlists WHERE id = ?1", [id.0])
            .store_context(|| format!("Failed to delete playlist {id}"))?;

        tx.commit()
            .store_context(|| format!("Committing deletion of playlist {id} failed"))?;
        Ok(deleted > 0)
    }

    fn append_playlist_item(&self, id: PlaylistId, content: ContentRef) -> StoreResult<Option<u32>> {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .store_context(|| format!("Failed to begin adding {content} to playlist {id}"))?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO playlist_items (playlist_id, content_id, content_type, position)
                 VALUES (?1, ?2, ?3,
                         (SELECT COALESCE(MAX(position), 0) + 1 FROM playlist_items WHERE playlist_id = ?1))",
                params![id.0, content.id(), content.kind()],
            )
            .store_context(|| format!("Failed to add {content} to playlist {id}"))?;
        if inserted == 0 {
            return Ok(None);
        }

        let position: u32 = tx
            .query_row(
                "SELECT position FROM playlist_items
                 WHERE playlist_id = ?1 AND content_id = ?2 AND content_type = ?3",
                params![id.0, content.id(), content.kind()],
                |row| row.get(0),
            )
            .store_context(|| format!("Failed to read position of {content} in playlist {id}"))?;

        tx.commit()
            .store_context(|| format!("Committing {content} to playlist {id} failed"))?;
        trace!("Playlist {id} position {position}: {content}");
        Ok(Some(position))
    }

    fn remove_playlist_item(&self, id: PlaylistId, content: ContentRef) -> StoreResult<bool> {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .store_context(|| format!("Failed to begin removing {content} from playlist {id}"))?;

        let position: Option<u32> = tx
            .query_row(
                "SELECT position FROM playlist_items
                 WHERE playlist_id = ?1 AND content_id = ?2 AND content_type = ?3",
                params![id.0, content.id(), content.kind()],
                |row| row.get(0),
            )
            .optional()
            .store_context(|| format!("Failed to look up {content} in playlist {id}"))?;
        let Some(position) = position else {
            return Ok(false);
        };

        tx.execute(
            "DELETE FROM playlist_items
             WHERE playlist_id = ?1 AND content_id = ?2 AND content_type = ?3",
            params![id.0, content.id(), content.kind()],
        )
        .store_context(|| format!("Failed to remove {content} from playlist {id}"))?;
        tx.execute(
            "UPDATE playlist_items SET position = position - 1
             WHERE playlist_id = ?1 AND position > ?2",
            params![id.0, position],
        )
        .store_context(|| format!("Failed to renumber playlist {id}"))?;

        tx.commit()
            .store_context(|| format!("Committing removal from playlist {id} failed"))?;
        Ok(true)
    }

    fn playlist_items(&self, id: PlaylistId) -> StoreResult<Vec<PlaylistItem>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlist_id, content_id, content_type, position
                 FROM playlist_items
                 WHERE playlist_id = ?1
                 ORDER BY position",
            )
            .store_context(|| "Invalid SQL statement when SELECTing playlist items")?;

        let rows = stmt
            .query_map([id.0], playlist_item_from_row)
            .store_context(|| format!("Cannot query items of playlist {id}"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .store_context(|| format!("Item row of playlist {id} could not be read"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn movie(id: i64, genre: &str, rating: &str, avg: f64) -> CatalogItem {
        CatalogItem {
            id,
            title: format!("Movie {id}"),
            genre: genre.to_string(),
            age_rating: rating.to_string(),
            duration_seconds: 5400,
            average_rating: avg,
            available: true,
            details: KindDetails::AudioVisual {
                synopsis: String::new(),
                release_year: 2001,
                director: "Someone".to_string(),
                actors: vec!["Lead Actor".to_string(), format!("Extra {id}")],
            },
        }
    }

    pub(crate) fn track(id: i64, genre: &str, rating: &str, avg: f64) -> CatalogItem {
        CatalogItem {
            id,
            title: format!("Track {id}"),
            genre: genre.to_string(),
            age_rating: rating.to_string(),
            duration_seconds: 240,
            average_rating: avg,
            available: true,
            details: KindDetails::Audio {
                artist: "Band".to_string(),
                album: "Album".to_string(),
                track_number: 1,
            },
        }
    }

    #[test]
    fn test_find_by_id_respects_kind() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        store.insert_item(&movie(1, "Drama", "PG", 0.0))?;

        assert!(store.find_by_id(ContentRef::AudioVisual(1))?.is_some());
        assert!(store.find_by_id(ContentRef::Audio(1))?.is_none());
        Ok(())
    }

    #[test]
    fn test_find_all_orders_by_rating_and_skips_unavailable() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let mut hidden = movie(4, "Drama", "G", 9.9);
        hidden.available = false;
        store.import_items(&[
            movie(1, "Drama", "G", 5.0),
            movie(2, "Drama", "G", 8.0),
            movie(3, "Drama", "G", 8.0),
            hidden,
        ])?;

        let ids: Vec<i64> = store
            .find_all(ContentKind::AudioVisual)?
            .iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);

        // Direct lookup still sees unavailable items.
        assert!(store.find_by_id(ContentRef::AudioVisual(4))?.is_some());
        Ok(())
    }

    #[test]
    fn test_record_rating_overwrites_and_recomputes() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        store.insert_item(&track(9, "Pop", "General", 0.0))?;
        store.insert_item(&movie(9, "Drama", "G", 0.0))?;
        let content = ContentRef::Audio(9);
        let mut submission = RatingSubmission {
            viewer: ViewerId(1),
            content,
            score: 4.0,
        };
        assert_eq!(store.record_rating(&submission)?, Some(4.0));
        submission.score = 6.0;
        assert_eq!(store.record_rating(&submission)?, Some(6.0));
        submission.viewer = ViewerId(2);
        submission.score = 9.0;
        assert_eq!(store.record_rating(&submission)?, Some(7.5));

        // Same id, other kind: untouched.
        let other = store.find_by_id(ContentRef::AudioVisual(9))?;
        assert_eq!(other.map(|item| item.average_rating), Some(0.0));
        Ok(())
    }

    #[test]
    fn test_update_average_rating_targets_one_kind() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        store.insert_item(&movie(2, "Drama", "G", 0.0))?;
        store.insert_item(&track(2, "Pop", "General", 0.0))?;

        store.update_average_rating(ContentRef::Audio(2), 7.25)?;
        let rated = store.find_by_id(ContentRef::Audio(2))?;
        let untouched = store.find_by_id(ContentRef::AudioVisual(2))?;
        assert_eq!(rated.map(|item| item.average_rating), Some(7.25));
        assert_eq!(untouched.map(|item| item.average_rating), Some(0.0));
        Ok(())
    }

    #[test]
    fn test_record_rating_for_missing_item_writes_nothing() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let missing = RatingSubmission {
            viewer: ViewerId(1),
            content: ContentRef::AudioVisual(3),
            score: 5.0,
        };
        assert_eq!(store.record_rating(&missing)?, None);

        // A later item with that id starts without the stray score.
        store.insert_item(&movie(3, "Drama", "G", 0.0))?;
        let first = RatingSubmission {
            viewer: ViewerId(2),
            ..missing
        };
        assert_eq!(store.record_rating(&RatingSubmission { score: 9.0, ..first })?, Some(9.0));
        Ok(())
    }

    #[test]
    fn test_replay_moves_entry_to_front_and_resets_progress() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let viewer = ViewerId(1);
        let now = Utc::now();

        store.upsert_play(viewer, ContentRef::AudioVisual(1), now)?;
        store.upsert_play(viewer, ContentRef::Audio(2), now)?;
        assert!(store.update_progress(viewer, ContentRef::AudioVisual(1), 90, false, now)?);
        store.upsert_play(viewer, ContentRef::Audio(2), now)?;
        store.upsert_play(viewer, ContentRef::AudioVisual(1), now)?;

        let history = store.history(viewer, 50)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, ContentRef::AudioVisual(1));
        assert_eq!(history[0].progress_seconds, 0);
        assert_eq!(history[1].content, ContentRef::Audio(2));
        Ok(())
    }

    #[test]
    fn test_update_progress_without_entry_reports_false() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let updated =
            store.update_progress(ViewerId(1), ContentRef::Audio(7), 120, false, Utc::now())?;
        assert!(!updated);
        assert!(store.history(ViewerId(1), 50)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_favorites_are_a_set() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let viewer = ViewerId(5);
        assert!(store.insert_favorite(viewer, ContentRef::Audio(1), Utc::now())?);
        assert!(!store.insert_favorite(viewer, ContentRef::Audio(1), Utc::now())?);
        assert!(store.insert_favorite(viewer, ContentRef::AudioVisual(1), Utc::now())?);

        let listed: Vec<ContentRef> = store.favorites(viewer)?.iter().map(|f| f.content).collect();
        assert_eq!(listed, vec![ContentRef::AudioVisual(1), ContentRef::Audio(1)]);

        assert!(store.delete_favorite(viewer, ContentRef::Audio(1))?);
        assert!(!store.delete_favorite(viewer, ContentRef::Audio(1))?);
        Ok(())
    }

    #[test]
    fn test_init_database_refuses_to_overwrite_without_force() -> StoreResult<()> {
        let dir = tempfile::tempdir().store_context(|| "tempdir")?;
        let path = dir.path().join("nested").join("catalog.db");

        init_database(&path, false)?.insert_item(&movie(1, "Drama", "G", 0.0))?;
        assert!(init_database(&path, false).is_err());

        let fresh = init_database(&path, true)?;
        assert!(fresh.find_all(ContentKind::AudioVisual)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_actors_round_trip() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        store.insert_item(&movie(1, "Drama", "PG", 0.0))?;

        let item = store.find_by_id(ContentRef::AudioVisual(1))?;
        let actors = match item.map(|item| item.details) {
            Some(KindDetails::AudioVisual { actors, .. }) => actors,
            other => panic!("unexpected details {other:?}"),
        };
        assert_eq!(actors, vec!["Lead Actor", "Extra 1"]);
        Ok(())
    }

    #[test]
    fn test_open_adds_actors_column_to_older_databases() -> StoreResult<()> {
        let dir = tempfile::tempdir().store_context(|| "tempdir")?;
        let path = dir.path().join("catalog.db");
        {
            let conn = Connection::open(&path).store_context(|| "open")?;
            conn.execute_batch(
                "CREATE TABLE audiovisual_content (
                    id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, genre TEXT NOT NULL,
                    age_rating TEXT NOT NULL, duration_seconds INTEGER NOT NULL DEFAULT 0,
                    average_rating REAL NOT NULL DEFAULT 0.0, is_available INTEGER NOT NULL DEFAULT 1,
                    synopsis TEXT NOT NULL DEFAULT '', release_year INTEGER NOT NULL DEFAULT 0,
                    director TEXT NOT NULL DEFAULT '');
                 INSERT INTO audiovisual_content (title, genre, age_rating) VALUES ('Old', 'Drama', 'G');",
            )
            .store_context(|| "old schema")?;
        }

        let store = SqliteStore::open(&path)?;
        let item = store.find_by_id(ContentRef::AudioVisual(1))?;
        assert!(matches!(
            item.map(|item| item.details),
            Some(KindDetails::AudioVisual { actors, .. }) if actors.is_empty()
        ));

        // Reopening does not try to add it again.
        drop(store);
        assert!(SqliteStore::open(&path).is_ok());
        Ok(())
    }

    #[test]
    fn test_playlist_names_are_unique_per_viewer() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let now = Utc::now();

        let first = store.insert_playlist(ViewerId(1), "Road Trip", "", now)?;
        assert!(first.is_some());
        assert!(store.insert_playlist(ViewerId(1), "road trip", "", now)?.is_none());
        assert!(store.insert_playlist(ViewerId(2), "Road Trip", "", now)?.is_some());
        store.insert_playlist(ViewerId(1), "Late Night", "quiet", now)?;

        let names: Vec<String> = store.playlists(ViewerId(1))?.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Late Night", "Road Trip"]);
        Ok(())
    }

    #[test]
    fn test_playlist_positions_stay_contiguous() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let playlist = store
            .insert_playlist(ViewerId(1), "Mix", "", Utc::now())?
            .map(|p| p.id)
            .expect("created");

        assert_eq!(store.append_playlist_item(playlist, ContentRef::Audio(1))?, Some(1));
        assert_eq!(store.append_playlist_item(playlist, ContentRef::AudioVisual(1))?, Some(2));
        assert_eq!(store.append_playlist_item(playlist, ContentRef::Audio(3))?, Some(3));
        assert_eq!(store.append_playlist_item(playlist, ContentRef::Audio(1))?, None);

        assert!(store.remove_playlist_item(playlist, ContentRef::AudioVisual(1))?);
        assert!(!store.remove_playlist_item(playlist, ContentRef::AudioVisual(1))?);

        let items: Vec<(ContentRef, u32)> = store
            .playlist_items(playlist)?
            .into_iter()
            .map(|item| (item.content, item.position))
            .collect();
        assert_eq!(items, vec![(ContentRef::Audio(1), 1), (ContentRef::Audio(3), 2)]);
        assert_eq!(store.append_playlist_item(playlist, ContentRef::Audio(4))?, Some(3));
        Ok(())
    }

    #[test]
    fn test_delete_playlist_removes_items() -> StoreResult<()> {
        let store = SqliteStore::open_in_memory()?;
        let playlist = store
            .insert_playlist(ViewerId(1), "Gone", "", Utc::now())?
            .map(|p| p.id)
            .expect("created");
        store.append_playlist_item(playlist, ContentRef::Audio(1))?;

        assert!(store.delete_playlist(playlist)?);
        assert!(!store.delete_playlist(playlist)?);
        assert!(store.find_playlist(playlist)?.is_none());
        assert!(store.playlist_items(playlist)?.is_empty());
        Ok(())
    }
}
