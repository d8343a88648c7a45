//! SQLite database for videos, comments, embeddings and topic matches.
//!
//! All access goes through one rusqlite [`Connection`] behind a
//! non-poisoning mutex. Operations are grouped by table family:
//!
//! - `video_ops`: videos, transcripts and comments
//! - `embedding_ops`: transcript and comment embeddings
//! - `match_ops`: nearest-neighbour queries and stored topic rankings

mod embedding_ops;
mod match_ops;
mod video_ops;

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::vector::init_vector_extension;

pub use match_ops::StoredMatch;

// ─────────────────────────────────────────────────────────────────────────────
// Schema Version
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

/// tubelens store backed by SQLite with sqlite-vec loaded.
///
/// Uses WAL mode; every embedding written must have `dimensions` values.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
    dimensions: usize,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl Database {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
                })?;
            }
        }

        init_vector_extension();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let db = Self {
            conn: Mutex::new(conn),
            dimensions,
        };
        db.initialize()?;

        info!(path = ?path, dimensions, "Store opened");
        Ok(db)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        init_vector_extension();
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
            dimensions,
        };
        db.initialize()?;

        debug!(dimensions, "In-memory store created");
        Ok(db)
    }

    /// Embedding dimensionality enforced by this store.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Reject vectors whose length differs from the store's dimensionality.
    pub(crate) fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        Ok(())
    }

    /// Initialize the database with schema and pragmas.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        create_schema(&conn)?;
        self.check_stored_dimensions(&conn)?;
        Ok(())
    }

    /// Record the embedding dimensionality, or verify it matches the record.
    fn check_stored_dimensions(&self, conn: &Connection) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'embedding.dimensions'",
                [],
                |row| row.get(0),
            )
            .ok();

        match stored.and_then(|s| s.parse::<usize>().ok()) {
            Some(existing) if existing != self.dimensions => Err(StoreError::DimensionMismatch {
                expected: existing,
                got: self.dimensions,
            }),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES ('embedding.dimensions', ?1)",
                    params![self.dimensions.to_string()],
                )?;
                Ok(())
            }
        }
    }
}

/// Create or migrate the database schema.
fn create_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        debug!("Schema up to date (version {})", current_version);
        return Ok(());
    }

    info!(
        "Migrating schema from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            thumbnail_url TEXT,
            html_summary TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transcripts (
            video_id TEXT PRIMARY KEY REFERENCES videos(id),
            original TEXT NOT NULL,
            summarized TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            video_id TEXT NOT NULL REFERENCES videos(id),
            text TEXT NOT NULL,
            parent_id TEXT,
            like_count INTEGER NOT NULL DEFAULT 0,
            published_at TEXT,
            total_reply_count INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_comments_video
            ON comments(video_id);

        CREATE INDEX IF NOT EXISTS idx_comments_parent
            ON comments(parent_id);

        CREATE TABLE IF NOT EXISTS transcript_embeddings (
            id TEXT PRIMARY KEY,
            video_id TEXT NOT NULL REFERENCES videos(id),
            parent_id TEXT,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transcript_embeddings_video
            ON transcript_embeddings(video_id);

        CREATE TABLE IF NOT EXISTS comment_embeddings (
            comment_id TEXT PRIMARY KEY REFERENCES comments(id),
            video_id TEXT NOT NULL REFERENCES videos(id),
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comment_embeddings_video
            ON comment_embeddings(video_id);

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    info!("Schema created (version {})", SCHEMA_VERSION);
    Ok(())
}

/// Migration v2: stored topic to comment rankings.
fn migrate_v2(conn: &Connection) -> Result<()> {
    info!("Running migration v2: adding topic_matches table");
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS topic_matches (
            topic_id TEXT NOT NULL,
            video_id TEXT NOT NULL REFERENCES videos(id),
            rank INTEGER NOT NULL,
            comment_id TEXT NOT NULL REFERENCES comments(id),
            distance REAL NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (topic_id, rank)
        );

        CREATE INDEX IF NOT EXISTS idx_topic_matches_video
            ON topic_matches(video_id);
        "#,
    )?;
    Ok(())
}

/// Current time in the format stored in `created_at` columns.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
