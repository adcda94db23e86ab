//! Trilium-style entity identifiers and timestamps.

use chrono::{Local, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

pub use wikilink_core::parse_utc_timestamp;

/// Length of Trilium note, branch, attribute and blob ids.
pub const ENTITY_ID_LEN: usize = 12;

/// Random 12-character alphanumeric id, as Trilium generates them.
pub fn new_entity_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ENTITY_ID_LEN)
        .map(char::from)
        .collect()
}

/// Branch ids are `<parentNoteId>_<noteId>`.
pub fn branch_id(parent_note_id: &str, note_id: &str) -> String {
    format!("{parent_note_id}_{note_id}")
}

/// Local timestamp in Trilium's `dateModified` format.
pub fn local_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f%z").to_string()
}

/// UTC timestamp in Trilium's `utcDateModified` format.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_shape() {
        let id = new_entity_id();
        assert_eq!(id.len(), ENTITY_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(new_entity_id(), new_entity_id());
    }

    #[test]
    fn test_branch_id() {
        assert_eq!(branch_id("root", "abc"), "root_abc");
    }

    #[test]
    fn test_utc_timestamp_roundtrip() {
        let parsed = parse_utc_timestamp(&utc_timestamp());
        assert!(parsed.is_some());
    }
}
