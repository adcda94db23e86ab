//! Centralized default constants for the wikilink processor.
//!
//! **This module is the single source of truth** for shared default values.
//! Store adapters, the orchestrator and the CLI reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// RESOLUTION
// =============================================================================

/// Minimum similarity score for a fuzzy candidate to be kept.
pub const MIN_MATCH_SCORE: f64 = 0.6;

/// Maximum fuzzy candidates considered after ranking.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Rows fetched by an exact-title query.
pub const EXACT_QUERY_LIMIT: usize = 5;

/// Rows fetched by the substring prefilter before scoring.
pub const FUZZY_PREFILTER_LIMIT: usize = 50;

/// Identifier of the tree root in Trilium.
pub const ROOT_NOTE_ID: &str = "root";

/// Note ids starting with this prefix are Trilium system notes.
pub const SYSTEM_NOTE_PREFIX: &str = "_";

// =============================================================================
// NOTE CREATION
// =============================================================================

/// Default parent for notes created from orphaned links.
pub const DEFAULT_PARENT_NOTE: &str = "root";

/// Label attached to every note created from a wikilink.
pub const CREATED_FROM_WIKILINK_LABEL: &str = "createdFromWikilink";

/// Label pointing a created note at its template.
pub const TEMPLATE_LABEL: &str = "template";

// =============================================================================
// BATCHING
// =============================================================================

/// Notes processed per batch.
pub const BATCH_SIZE: usize = 50;

/// Largest accepted batch size.
pub const BATCH_SIZE_MAX: usize = 1000;

/// Maximum notes selected per run.
pub const MAX_NOTES_PER_RUN: usize = 1000;

/// Pause between batches in milliseconds.
pub const BATCH_PAUSE_MS: u64 = 100;

/// Store query timeout in milliseconds.
pub const QUERY_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// REPORT
// =============================================================================

/// Title of the report note.
pub const REPORT_NOTE_TITLE: &str = "Wikilink Processing Report";

/// Parent of the report note.
pub const REPORT_NOTE_PARENT: &str = "root";

/// Label identifying the report note across runs.
pub const REPORT_NOTE_LABEL: &str = "wikilinkReport";

/// Product line printed in the report footer.
pub const REPORT_GENERATOR: &str = "Wikilink Processor v1.0";
