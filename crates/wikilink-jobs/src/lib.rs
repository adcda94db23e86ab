//! # wikilink-jobs
//!
//! The processing pipeline of the Trilium wikilink processor.
//!
//! This crate provides:
//! - [`NoteResolver`]: exact and fuzzy title resolution, note creation
//! - [`process_note`]: per-note parse → resolve → rewrite → persist
//! - [`WikilinkProcessor`]: candidate selection and batched runs
//! - [`Report`] building and rendering, report note publishing
//! - Demo note seeding and cleanup
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wikilink_jobs::{ProcessorConfig, WikilinkProcessor};
//! use wikilink_db::Database;
//!
//! let db = Database::open("document.db").await?;
//! let processor = WikilinkProcessor::new(Arc::new(db.notes), ProcessorConfig::from_env())?;
//! let outcome = processor.run().await?;
//! println!("{} notes processed", outcome.results.len());
//! ```

pub mod demo;
pub mod orchestrator;
pub mod processor;
pub mod publish;
pub mod report;
pub mod resolver;

// Re-export core types
pub use wikilink_core::*;

pub use orchestrator::{RunOutcome, WikilinkProcessor};
pub use processor::process_note;
pub use publish::publish_report;
pub use report::{render, Report, ReportError, ReportRow, ReportSettings, ReportTotals};
pub use resolver::{new_note_content, NoteResolver};
