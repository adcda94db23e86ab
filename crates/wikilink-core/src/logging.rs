//! Structured logging field names shared by every crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run aborted, requires operator attention |
//! | WARN  | Recoverable issue (link or note error, report publish failure) |
//! | INFO  | Run lifecycle, batch progress, note creation |
//! | DEBUG | Resolution decisions, candidate counts, config choices |
//! | TRACE | Per-candidate scores |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "core", "db", "etapi", "jobs", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "resolver", "orchestrator", "sqlite_store", "report"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve", "select_candidates", "publish"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Trilium note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Wikilink title being resolved.
pub const WIKILINK: &str = "wikilink";

/// Batch number (1-based).
pub const BATCH: &str = "batch";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows or candidates returned.
pub const RESULT_COUNT: &str = "result_count";

/// Similarity score of the selected candidate.
pub const SCORE: &str = "score";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Whether the run is a dry run.
pub const DRY_RUN: &str = "dry_run";
