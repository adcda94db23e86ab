//! Data model shared by the parser, resolver, rewriter and orchestrator.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{ROOT_NOTE_ID, SYSTEM_NOTE_PREFIX};

// =============================================================================
// WIKILINKS
// =============================================================================

/// A parsed `[[...]]` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wikilink {
    /// The complete token, brackets included.
    pub full_match: String,
    /// Note title the link points at.
    pub title: String,
    /// Display alias (`[[title|alias]]`), empty when absent.
    pub alias: String,
    /// Heading within the target note (`[[title#heading]]`), empty when absent.
    pub heading: String,
    /// Byte offset of the leading `[[` in the source text.
    pub position: usize,
}

impl Wikilink {
    /// Byte offset just past the closing `]]`.
    pub fn end(&self) -> usize {
        self.position + self.full_match.len()
    }

    /// Text shown for the link: the alias when given, otherwise the title.
    pub fn display_text(&self) -> &str {
        if self.alias.is_empty() {
            &self.title
        } else {
            &self.alias
        }
    }
}

/// A note considered as a resolution target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub note_id: String,
    pub title: String,
    /// Similarity in `[0, 1]`; exact matches score 1.0.
    pub score: f64,
}

/// Final outcome of resolving one wikilink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub note_id: String,
    pub title: String,
    /// The target note was created by this run.
    pub created: bool,
    pub confidence: f64,
}

impl Resolution {
    /// Resolution onto an existing note.
    pub fn existing(candidate: Candidate) -> Self {
        Self {
            note_id: candidate.note_id,
            title: candidate.title,
            created: false,
            confidence: candidate.score,
        }
    }

    /// Resolution onto a note created for an orphaned link.
    pub fn created(note_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            created: true,
            confidence: 1.0,
        }
    }
}

/// A wikilink paired with its resolution, ready for rewriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub wikilink: Wikilink,
    pub resolution: Resolution,
}

// =============================================================================
// PROCESSING RESULTS
// =============================================================================

/// One recorded error. `wikilink` is the offending token for link-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikilink: Option<String>,
    pub error: String,
}

impl LinkError {
    pub fn for_link(wikilink: &Wikilink, error: impl ToString) -> Self {
        Self {
            wikilink: Some(wikilink.full_match.clone()),
            error: error.to_string(),
        }
    }

    pub fn for_note(error: impl ToString) -> Self {
        Self {
            wikilink: None,
            error: error.to_string(),
        }
    }
}

/// Per-note outcome of a processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub note_id: String,
    pub note_title: String,
    pub wikilinks_found: usize,
    pub wikilinks_processed: usize,
    pub links_created: usize,
    pub notes_created: usize,
    pub errors: Vec<LinkError>,
    pub processing_time_ms: u64,
}

impl ProcessingResult {
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// =============================================================================
// NOTE STORE TYPES
// =============================================================================

/// A note as seen through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub title: String,
    /// Trilium note type ("text", "code", "book", ...).
    pub note_type: String,
    pub is_deleted: bool,
    pub date_modified: Option<DateTime<Utc>>,
}

impl Note {
    pub fn is_text(&self) -> bool {
        self.note_type == "text"
    }

    pub fn is_system(&self) -> bool {
        is_system_note_id(&self.note_id)
    }
}

/// Lightweight row returned by title queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub note_id: String,
    pub title: String,
}

impl NoteSummary {
    pub fn is_root(&self) -> bool {
        self.note_id == ROOT_NOTE_ID
    }
}

/// Result of creating a note: the note and the branch placing it in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNote {
    pub note: Note,
    pub branch_id: String,
}

/// Whether a note id belongs to a Trilium system note (`_hidden`, `_options`, ...).
pub fn is_system_note_id(note_id: &str) -> bool {
    note_id.starts_with(SYSTEM_NOTE_PREFIX)
}

/// Parse a Trilium `utcDateModified` value such as `2024-03-01 10:15:00.123Z`.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
