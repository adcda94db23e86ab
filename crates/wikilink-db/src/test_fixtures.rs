//! Test fixtures for database integration tests.
//!
//! Provides an in-memory SQLite database carrying the subset of Trilium's
//! schema the store touches, plus a builder for seeding notes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wikilink_db::test_fixtures::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new().await;
//!     TestDataBuilder::new(&test_db)
//!         .with_note("n1", "Research Notes", "See [[Timeline]]")
//!         .await
//!         .with_label("n1", "demoWikilink", "true")
//!         .await;
//!
//!     // Run your tests against test_db.store ...
//! }
//! ```

use std::time::Duration;

use sqlx::SqlitePool;

use crate::ids::{branch_id, utc_timestamp};
use crate::pool::{create_pool_from_url, PoolConfig};
use crate::sqlite::SqliteNoteStore;

/// Tables and indexes of a Trilium `document.db`, reduced to what the
/// store reads and writes.
pub const TRILIUM_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    noteId TEXT NOT NULL PRIMARY KEY,
    title TEXT NOT NULL DEFAULT 'note',
    isProtected INT NOT NULL DEFAULT 0,
    type TEXT NOT NULL DEFAULT 'text',
    mime TEXT NOT NULL DEFAULT 'text/html',
    blobId TEXT DEFAULT NULL,
    isDeleted INT NOT NULL DEFAULT 0,
    deleteId TEXT DEFAULT NULL,
    dateCreated TEXT NOT NULL,
    dateModified TEXT NOT NULL,
    utcDateCreated TEXT NOT NULL,
    utcDateModified TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS blobs (
    blobId TEXT NOT NULL PRIMARY KEY,
    content TEXT NULL DEFAULT NULL,
    dateModified TEXT NOT NULL,
    utcDateModified TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS branches (
    branchId TEXT NOT NULL PRIMARY KEY,
    noteId TEXT NOT NULL,
    parentNoteId TEXT NOT NULL,
    notePosition INTEGER NOT NULL,
    prefix TEXT,
    isExpanded INTEGER NOT NULL DEFAULT 0,
    isDeleted INTEGER NOT NULL DEFAULT 0,
    deleteId TEXT DEFAULT NULL,
    utcDateModified TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attributes (
    attributeId TEXT NOT NULL PRIMARY KEY,
    noteId TEXT NOT NULL,
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    value TEXT DEFAULT '' NOT NULL,
    position INT DEFAULT 0 NOT NULL,
    utcDateModified TEXT NOT NULL,
    isDeleted INT NOT NULL,
    deleteId TEXT DEFAULT NULL,
    isInheritable INT DEFAULT 0 NULL
);
CREATE INDEX IF NOT EXISTS IDX_notes_title ON notes (title);
CREATE INDEX IF NOT EXISTS IDX_branches_parentNoteId ON branches (parentNoteId);
CREATE INDEX IF NOT EXISTS IDX_attributes_name_value ON attributes (name, value);
"#;

/// In-memory Trilium database with the `root` note in place.
pub struct TestDatabase {
    pub pool: SqlitePool,
    pub store: SqliteNoteStore,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let pool = create_memory_pool().await;
        apply_schema(&pool).await;
        insert_note_row(&pool, "root", "root", "book", "", None, "2024-01-01 00:00:00.000Z").await;

        Self {
            store: SqliteNoteStore::new(pool.clone()),
            pool,
        }
    }
}

/// Single-connection pool on `sqlite::memory:`.
///
/// Every connection to `:memory:` opens its own database, so the pool must
/// never grow, idle out or recycle its one connection.
pub async fn create_memory_pool() -> SqlitePool {
    let config = PoolConfig::new()
        .max_connections(1)
        .min_connections(1)
        .query_timeout(Duration::from_secs(5))
        .idle_timeout(None)
        .max_lifetime(None);

    create_pool_from_url("sqlite::memory:", config)
        .await
        .expect("Failed to create in-memory database")
}

/// Create the Trilium tables.
pub async fn apply_schema(pool: &SqlitePool) {
    for statement in TRILIUM_SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .expect("Failed to apply test schema");
    }
}

async fn insert_note_row(
    pool: &SqlitePool,
    note_id: &str,
    title: &str,
    note_type: &str,
    content: &str,
    parent_id: Option<&str>,
    utc_modified: &str,
) {
    let blob_id = format!("blob_{note_id}");
    sqlx::query(
        "INSERT INTO blobs (blobId, content, dateModified, utcDateModified) VALUES (?, ?, ?, ?)",
    )
    .bind(&blob_id)
    .bind(content)
    .bind(utc_modified)
    .bind(utc_modified)
    .execute(pool)
    .await
    .expect("Failed to insert test blob");

    sqlx::query(
        "INSERT INTO notes (noteId, title, type, blobId, dateCreated, dateModified,
                            utcDateCreated, utcDateModified)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(note_id)
    .bind(title)
    .bind(note_type)
    .bind(&blob_id)
    .bind(utc_modified)
    .bind(utc_modified)
    .bind(utc_modified)
    .bind(utc_modified)
    .execute(pool)
    .await
    .expect("Failed to insert test note");

    if let Some(parent_id) = parent_id {
        sqlx::query(
            "INSERT INTO branches (branchId, noteId, parentNoteId, notePosition, utcDateModified)
             VALUES (?, ?, ?, 10, ?)",
        )
        .bind(branch_id(parent_id, note_id))
        .bind(note_id)
        .bind(parent_id)
        .bind(utc_modified)
        .execute(pool)
        .await
        .expect("Failed to insert test branch");
    }
}

/// Builder for test data with fluent API.
pub struct TestDataBuilder<'a> {
    db: &'a TestDatabase,
    created_notes: Vec<String>,
}

impl<'a> TestDataBuilder<'a> {
    pub fn new(db: &'a TestDatabase) -> Self {
        Self {
            db,
            created_notes: Vec::new(),
        }
    }

    /// Text note under `root`.
    pub async fn with_note(self, note_id: &str, title: &str, content: &str) -> Self {
        self.with_child("root", note_id, title, content).await
    }

    /// Text note under `parent_id`.
    pub async fn with_child(
        mut self,
        parent_id: &str,
        note_id: &str,
        title: &str,
        content: &str,
    ) -> Self {
        insert_note_row(
            &self.db.pool,
            note_id,
            title,
            "text",
            content,
            Some(parent_id),
            &utc_timestamp(),
        )
        .await;
        self.created_notes.push(note_id.to_string());
        self
    }

    /// Note with an explicit type and modification time.
    pub async fn with_typed_note(
        mut self,
        note_id: &str,
        title: &str,
        note_type: &str,
        utc_modified: &str,
    ) -> Self {
        insert_note_row(
            &self.db.pool,
            note_id,
            title,
            note_type,
            "",
            Some("root"),
            utc_modified,
        )
        .await;
        self.created_notes.push(note_id.to_string());
        self
    }

    /// Label attribute on an existing note.
    pub async fn with_label(self, note_id: &str, name: &str, value: &str) -> Self {
        sqlx::query(
            "INSERT INTO attributes (attributeId, noteId, type, name, value, utcDateModified, isDeleted)
             VALUES (?, ?, 'label', ?, ?, ?, 0)",
        )
        .bind(format!("attr_{note_id}_{name}"))
        .bind(note_id)
        .bind(name)
        .bind(value)
        .bind(utc_timestamp())
        .execute(&self.db.pool)
        .await
        .expect("Failed to insert test label");
        self
    }

    /// Ids of the notes created so far, in order.
    pub fn build(self) -> Vec<String> {
        self.created_notes
    }
}
