//! # wikilink-etapi
//!
//! Note store speaking Trilium's ETAPI (`/etapi/...`) over HTTP.
//!
//! Use this adapter against a running Trilium server; use `wikilink-db` for
//! offline maintenance on a `document.db` file.

pub mod client;
pub mod store;
pub mod types;

pub use client::{EtapiClient, EtapiConfig};
pub use store::EtapiNoteStore;
