//! # wikilink-core
//!
//! Core types, traits, and pure algorithms for the Trilium wikilink processor.
//!
//! This crate provides:
//! - The data model (wikilinks, candidates, resolutions, per-note results)
//! - The [`NoteStore`] trait every storage adapter implements
//! - Run configuration with environment loading and validation
//! - The wikilink parser, the similarity scorer and the content rewriter

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod rewriter;
pub mod similarity;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{LinkFormat, ProcessorConfig, ReportConfig, ReportFormat};
pub use error::{Error, Result};
pub use models::*;
pub use parser::{comment_spans, parse, parse_unprocessed};
pub use rewriter::{rewrite, LinkRewriter};
pub use similarity::{levenshtein_distance, similarity};
pub use traits::*;
