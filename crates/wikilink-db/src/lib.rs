//! # wikilink-db
//!
//! Storage adapters for the wikilink processor.
//!
//! This crate provides:
//! - SQLite connection pool management for Trilium `document.db` files
//! - [`SqliteNoteStore`], a [`NoteStore`] over Trilium's tables
//! - [`InMemoryNoteStore`], a [`NoteStore`] for tests and experiments
//!
//! ## Example
//!
//! ```rust,ignore
//! use wikilink_db::Database;
//! use wikilink_core::NoteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("/home/me/trilium-data/document.db").await?;
//!     let root = db.notes.get_note("root").await?;
//!     println!("{root:?}");
//!     Ok(())
//! }
//! ```

pub mod ids;
pub mod memory;
pub mod pool;
pub mod sqlite;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can build databases
pub mod test_fixtures;

pub use wikilink_core::*;

pub use memory::{InMemoryNoteStore, NoteSeed};
pub use pool::{create_pool, create_pool_from_url, create_pool_with_config, PoolConfig};
pub use sqlite::SqliteNoteStore;

use std::path::Path;

/// A Trilium document database and the note store over it.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::SqlitePool,
    pub notes: SqliteNoteStore,
}

impl Database {
    /// Open an existing `document.db` with default pool settings.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default()).await
    }

    pub async fn open_with_config(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(path, config).await?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            notes: SqliteNoteStore::new(pool.clone()),
            pool,
        }
    }
}
