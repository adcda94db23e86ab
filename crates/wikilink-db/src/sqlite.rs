//! Note store over a Trilium `document.db`.
//!
//! Reads and writes the `notes`, `blobs`, `branches` and `attributes` tables
//! directly. Intended for maintenance runs against a database that no Trilium
//! server holds open; no `entity_changes` rows are written, so sync peers do
//! not see the edits until Trilium's consistency checks pick them up.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, instrument};

use wikilink_core::{
    CandidateQuery, CreatedNote, Error, Note, NoteStore, NoteSummary, Result, TitleQuery,
};

use crate::ids::{branch_id, local_timestamp, new_entity_id, parse_utc_timestamp, utc_timestamp};

/// Columns selected for [`Note`] rows.
const NOTE_COLUMNS: &str = "notes.noteId, notes.title, notes.type, notes.isDeleted, notes.utcDateModified";

/// SQLite implementation of [`NoteStore`].
#[derive(Clone)]
pub struct SqliteNoteStore {
    pool: SqlitePool,
}

impl SqliteNoteStore {
    /// Create a store on an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn note_from_row(row: &SqliteRow) -> Result<Note> {
    let modified: Option<String> = row.try_get("utcDateModified").map_err(Error::Database)?;
    Ok(Note {
        note_id: row.try_get("noteId").map_err(Error::Database)?,
        title: row.try_get("title").map_err(Error::Database)?,
        note_type: row.try_get("type").map_err(Error::Database)?,
        is_deleted: row.try_get::<i64, _>("isDeleted").map_err(Error::Database)? != 0,
        date_modified: modified.as_deref().and_then(parse_utc_timestamp),
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<NoteSummary> {
    Ok(NoteSummary {
        note_id: row.try_get("noteId").map_err(Error::Database)?,
        title: row.try_get("title").map_err(Error::Database)?,
    })
}

/// Append the system-note and explicit-id exclusions shared by every query.
fn push_exclusions(builder: &mut QueryBuilder<'_, Sqlite>, exclude_system: bool, ids: &[String]) {
    if exclude_system {
        builder.push(" AND notes.noteId NOT LIKE '\\_%' ESCAPE '\\'");
    }
    if !ids.is_empty() {
        builder.push(" AND notes.noteId NOT IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");
    }
}

/// Prepend a `descendants(noteId)` CTE: the live `root_id` and every note
/// reachable from it through live branches.
fn push_descendants_cte(builder: &mut QueryBuilder<'_, Sqlite>, root_id: &str) {
    builder.push(
        "WITH RECURSIVE descendants(noteId) AS (
             SELECT noteId FROM notes WHERE isDeleted = 0 AND noteId = ",
    );
    builder.push_bind(root_id.to_string());
    builder.push(
        "
             UNION
             SELECT branches.noteId
             FROM branches
             JOIN descendants ON branches.parentNoteId = descendants.noteId
             WHERE branches.isDeleted = 0
         ) ",
    );
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notes.noteId = ? AND notes.isDeleted = 0"
        ))
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn get_content(&self, note: &Note) -> Result<String> {
        let content: Option<Option<Vec<u8>>> = sqlx::query_scalar(
            "SELECT blobs.content FROM notes
             JOIN blobs ON blobs.blobId = notes.blobId
             WHERE notes.noteId = ?",
        )
        .bind(&note.note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(content
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }

    #[instrument(skip(self, note, content), fields(note_id = %note.note_id))]
    async fn set_content(&self, note: &Note, content: &str) -> Result<()> {
        // Blobs may be shared between notes, so a new blob is written rather
        // than updating the current one in place.
        let blob_id = new_entity_id();
        let local = local_timestamp();
        let utc = utc_timestamp();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO blobs (blobId, content, dateModified, utcDateModified)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&blob_id)
        .bind(content)
        .bind(&local)
        .bind(&utc)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let updated = sqlx::query(
            "UPDATE notes SET blobId = ?, dateModified = ?, utcDateModified = ?
             WHERE noteId = ? AND isDeleted = 0",
        )
        .bind(&blob_id)
        .bind(&local)
        .bind(&utc)
        .bind(&note.note_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NoteNotFound(note.note_id.clone()));
        }

        tx.commit().await.map_err(Error::Database)?;
        debug!(blob_id = %blob_id, "Note content replaced");
        Ok(())
    }

    #[instrument(skip(self, content))]
    async fn create_text_note(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<CreatedNote> {
        let note_id = new_entity_id();
        let blob_id = new_entity_id();
        let branch = branch_id(parent_id, &note_id);
        let local = local_timestamp();
        let utc = utc_timestamp();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let parent_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM notes WHERE noteId = ? AND isDeleted = 0")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if parent_exists.is_none() {
            return Err(Error::NoteNotFound(parent_id.to_string()));
        }

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(notePosition), 0) + 10 FROM branches
             WHERE parentNoteId = ? AND isDeleted = 0",
        )
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO blobs (blobId, content, dateModified, utcDateModified)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&blob_id)
        .bind(content)
        .bind(&local)
        .bind(&utc)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO notes (noteId, title, isProtected, type, mime, blobId, isDeleted,
                                dateCreated, dateModified, utcDateCreated, utcDateModified)
             VALUES (?, ?, 0, 'text', 'text/html', ?, 0, ?, ?, ?, ?)",
        )
        .bind(&note_id)
        .bind(title)
        .bind(&blob_id)
        .bind(&local)
        .bind(&local)
        .bind(&utc)
        .bind(&utc)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO branches (branchId, noteId, parentNoteId, notePosition, prefix,
                                   isExpanded, isDeleted, utcDateModified)
             VALUES (?, ?, ?, ?, NULL, 0, 0, ?)",
        )
        .bind(&branch)
        .bind(&note_id)
        .bind(parent_id)
        .bind(position)
        .bind(&utc)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(note_id = %note_id, "Text note created");

        Ok(CreatedNote {
            note: Note {
                note_id,
                title: title.to_string(),
                note_type: "text".to_string(),
                is_deleted: false,
                date_modified: parse_utc_timestamp(&utc),
            },
            branch_id: branch,
        })
    }

    async fn set_label(&self, note: &Note, name: &str, value: &str) -> Result<()> {
        let utc = utc_timestamp();

        let updated = sqlx::query(
            "UPDATE attributes SET value = ?, utcDateModified = ?
             WHERE noteId = ? AND type = 'label' AND name = ? AND isDeleted = 0",
        )
        .bind(value)
        .bind(&utc)
        .bind(&note.note_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() > 0 {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO attributes (attributeId, noteId, type, name, value, position,
                                     utcDateModified, isDeleted, isInheritable)
             VALUES (?, ?, 'label', ?, ?,
                     (SELECT COALESCE(MAX(position), 0) + 10 FROM attributes WHERE noteId = ?),
                     ?, 0, 0)",
        )
        .bind(new_entity_id())
        .bind(&note.note_id)
        .bind(name)
        .bind(value)
        .bind(&note.note_id)
        .bind(&utc)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn query_notes_by_exact_title(
        &self,
        title: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT notes.noteId, notes.title FROM notes WHERE notes.isDeleted = 0");
        if query.case_sensitive {
            builder.push(" AND notes.title = ").push_bind(title.to_string());
        } else {
            builder
                .push(" AND LOWER(notes.title) = LOWER(")
                .push_bind(title.to_string())
                .push(")");
        }
        push_exclusions(&mut builder, query.exclude_system, &query.exclude_ids);
        builder.push(
            " ORDER BY CASE WHEN notes.noteId = 'root' THEN 0 ELSE 1 END,
                       LENGTH(notes.title) ASC, notes.noteId ASC LIMIT ",
        );
        builder.push_bind(query.limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn query_notes_by_title_substring(
        &self,
        pattern: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT notes.noteId, notes.title FROM notes WHERE notes.isDeleted = 0");
        if query.case_sensitive {
            builder
                .push(" AND instr(notes.title, ")
                .push_bind(pattern.to_string())
                .push(") > 0");
        } else {
            builder
                .push(" AND instr(LOWER(notes.title), LOWER(")
                .push_bind(pattern.to_string())
                .push(")) > 0");
        }
        push_exclusions(&mut builder, query.exclude_system, &query.exclude_ids);
        builder.push(" ORDER BY LENGTH(notes.title) ASC, notes.noteId ASC LIMIT ");
        builder.push_bind(query.limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn query_descendant_note_ids(&self, root_id: &str) -> Result<Vec<String>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("");
        push_descendants_cte(&mut builder, root_id);
        builder.push(
            "SELECT descendants.noteId FROM descendants
             JOIN notes ON notes.noteId = descendants.noteId
             WHERE notes.isDeleted = 0",
        );

        builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn query_candidate_note_ids(&self, query: &CandidateQuery) -> Result<Vec<String>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("");
        if let Some(root) = &query.scope_root {
            push_descendants_cte(&mut builder, root);
        }
        builder.push(
            "SELECT notes.noteId FROM notes WHERE notes.type = 'text' AND notes.isDeleted = 0",
        );
        if query.scope_root.is_some() {
            builder.push(" AND notes.noteId IN (SELECT noteId FROM descendants)");
        }
        push_exclusions(&mut builder, query.exclude_system, &query.exclude_ids);
        if query.order_by_recency {
            builder.push(" ORDER BY notes.utcDateModified DESC, notes.noteId ASC");
        } else {
            builder.push(" ORDER BY notes.noteId ASC");
        }
        builder.push(" LIMIT ").push_bind(query.limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("noteId").map_err(Error::Database))
            .collect()
    }

    async fn find_notes_with_label(&self, name: &str) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE notes.isDeleted = 0
               AND EXISTS (
                   SELECT 1 FROM attributes
                   WHERE attributes.noteId = notes.noteId
                     AND attributes.type = 'label'
                     AND attributes.name = ?
                     AND attributes.isDeleted = 0
               )
             ORDER BY notes.utcDateCreated ASC, notes.noteId ASC"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(note_from_row).collect()
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        let delete_id = new_entity_id();
        let local = local_timestamp();
        let utc = utc_timestamp();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let deleted = sqlx::query(
            "UPDATE notes SET isDeleted = 1, deleteId = ?, dateModified = ?, utcDateModified = ?
             WHERE noteId = ? AND isDeleted = 0",
        )
        .bind(&delete_id)
        .bind(&local)
        .bind(&utc)
        .bind(note_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if deleted.rows_affected() == 0 {
            return Err(Error::NoteNotFound(note_id.to_string()));
        }

        for table in ["branches", "attributes"] {
            sqlx::query(&format!(
                "UPDATE {table} SET isDeleted = 1, deleteId = ?, utcDateModified = ?
                 WHERE noteId = ? AND isDeleted = 0"
            ))
            .bind(&delete_id)
            .bind(&utc)
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
