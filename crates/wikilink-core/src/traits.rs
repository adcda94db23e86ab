//! The note store contract.
//!
//! The processor never talks to Trilium directly; every read and write goes
//! through a [`NoteStore`]. Implementations live in `wikilink-db` (SQLite
//! document database, in-memory) and `wikilink-etapi` (REST API).

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreatedNote, Note, NoteSummary};

/// Filters applied to title lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleQuery {
    /// Compare titles byte-for-byte instead of case-folded.
    pub case_sensitive: bool,
    /// Skip `_`-prefixed system notes.
    pub exclude_system: bool,
    pub exclude_ids: Vec<String>,
    /// Maximum rows returned.
    pub limit: usize,
}

impl TitleQuery {
    /// Whether a note id passes the exclusion rules.
    pub fn admits(&self, note_id: &str) -> bool {
        if self.exclude_system && crate::models::is_system_note_id(note_id) {
            return false;
        }
        !self.exclude_ids.iter().any(|id| id == note_id)
    }
}

/// Selection of notes to process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    /// Restrict to the subtree under this note, the note included.
    /// `None` means the whole tree; a missing or deleted root selects nothing.
    pub scope_root: Option<String>,
    pub exclude_system: bool,
    pub exclude_ids: Vec<String>,
    pub limit: usize,
    /// Most recently modified first.
    pub order_by_recency: bool,
}

impl CandidateQuery {
    /// Whether a note id passes the exclusion rules. Scope is applied by
    /// the store.
    pub fn admits(&self, note_id: &str) -> bool {
        if self.exclude_system && crate::models::is_system_note_id(note_id) {
            return false;
        }
        !self.exclude_ids.iter().any(|id| id == note_id)
    }
}

/// Access to notes, their content, labels and hierarchy.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch a note by id; `None` when it does not exist or is deleted.
    async fn get_note(&self, note_id: &str) -> Result<Option<Note>>;

    /// Read a note's content.
    async fn get_content(&self, note: &Note) -> Result<String>;

    /// Replace a note's content.
    async fn set_content(&self, note: &Note, content: &str) -> Result<()>;

    /// Create a text note under `parent_id`.
    async fn create_text_note(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<CreatedNote>;

    /// Set (or overwrite) a label on a note.
    async fn set_label(&self, note: &Note, name: &str, value: &str) -> Result<()>;

    /// Live notes whose title equals `title` under the query's case rule.
    ///
    /// Rows come back with `root` first, then shortest title.
    async fn query_notes_by_exact_title(
        &self,
        title: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>>;

    /// Live notes whose title contains `pattern` under the query's case rule,
    /// shortest title first.
    async fn query_notes_by_title_substring(
        &self,
        pattern: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>>;

    /// Transitive descendants of `root_id`, including `root_id` itself.
    async fn query_descendant_note_ids(&self, root_id: &str) -> Result<Vec<String>>;

    /// Ids of live text notes eligible for processing.
    async fn query_candidate_note_ids(&self, query: &CandidateQuery) -> Result<Vec<String>>;

    /// Live notes carrying a label with this name.
    async fn find_notes_with_label(&self, name: &str) -> Result<Vec<Note>>;

    /// Delete a note and its branches.
    async fn delete_note(&self, note_id: &str) -> Result<()>;

    /// First live note carrying the label, if any.
    async fn find_note_with_label(&self, name: &str) -> Result<Option<Note>> {
        Ok(self.find_notes_with_label(name).await?.into_iter().next())
    }
}
