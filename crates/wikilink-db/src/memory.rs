//! In-memory note store.
//!
//! Backs the processor's tests and dry experiments. Holds a small note tree
//! behind a `tokio::sync::RwLock` and follows the same ordering and exclusion
//! rules as the SQLite adapter.

use std::collections::{BTreeMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use wikilink_core::defaults::ROOT_NOTE_ID;
use wikilink_core::{
    CandidateQuery, CreatedNote, Error, Note, NoteStore, NoteSummary, Result, TitleQuery,
};

use crate::ids::{branch_id, new_entity_id};

/// Seed data for one note.
#[derive(Debug, Clone)]
pub struct NoteSeed {
    pub note_id: String,
    pub title: String,
    pub content: String,
    pub parent_id: String,
    pub note_type: String,
    pub date_modified: DateTime<Utc>,
}

impl NoteSeed {
    /// A text note under `root`.
    pub fn text(note_id: &str, title: &str, content: &str) -> Self {
        Self {
            note_id: note_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            parent_id: ROOT_NOTE_ID.to_string(),
            note_type: "text".to_string(),
            date_modified: Utc::now(),
        }
    }

    pub fn parent(mut self, parent_id: &str) -> Self {
        self.parent_id = parent_id.to_string();
        self
    }

    pub fn note_type(mut self, note_type: &str) -> Self {
        self.note_type = note_type.to_string();
        self
    }

    pub fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.date_modified = at;
        self
    }
}

#[derive(Debug, Clone)]
struct StoredNote {
    note: Note,
    content: String,
    parents: Vec<String>,
    labels: Vec<(String, String)>,
    created_seq: u64,
}

#[derive(Debug, Default)]
struct State {
    notes: BTreeMap<String, StoredNote>,
    next_seq: u64,
    set_content_calls: usize,
    failing_reads: HashSet<String>,
    failing_creates: bool,
}

impl State {
    fn live(&self, note_id: &str) -> Option<&StoredNote> {
        self.notes.get(note_id).filter(|n| !n.note.is_deleted)
    }

    /// `root_id` and its live descendants, breadth first. Empty when the
    /// root is missing or deleted.
    fn descendants(&self, root_id: &str) -> Vec<String> {
        if self.live(root_id).is_none() {
            return Vec::new();
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            order.push(current.clone());
            for child in self.notes.values() {
                if !child.note.is_deleted && child.parents.iter().any(|p| *p == current) {
                    queue.push_back(child.note.note_id.clone());
                }
            }
        }
        order
    }

    fn insert(&mut self, seed: NoteSeed) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let parents = if seed.note_id == ROOT_NOTE_ID {
            Vec::new()
        } else {
            vec![seed.parent_id]
        };
        self.notes.insert(
            seed.note_id.clone(),
            StoredNote {
                note: Note {
                    note_id: seed.note_id,
                    title: seed.title,
                    note_type: seed.note_type,
                    is_deleted: false,
                    date_modified: Some(seed.date_modified),
                },
                content: seed.content,
                parents,
                labels: Vec::new(),
                created_seq: seq,
            },
        );
    }
}

/// [`NoteStore`] held entirely in memory.
#[derive(Debug)]
pub struct InMemoryNoteStore {
    state: RwLock<State>,
}

impl Default for InMemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNoteStore {
    /// An empty tree containing only the `root` note.
    pub fn new() -> Self {
        Self::with_notes([])
    }

    /// Build a store from seeds, inserted in order under the `root` note.
    pub fn with_notes(seeds: impl IntoIterator<Item = NoteSeed>) -> Self {
        let mut state = State::default();
        state.insert(NoteSeed::text(ROOT_NOTE_ID, "root", "").note_type("book"));
        for seed in seeds {
            state.insert(seed);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn insert(&self, seed: NoteSeed) {
        self.state.write().await.insert(seed);
    }

    /// Make `get_content` fail for this note.
    pub async fn fail_reads_for(&self, note_id: &str) {
        self.state
            .write()
            .await
            .failing_reads
            .insert(note_id.to_string());
    }

    /// Make every `create_text_note` call fail.
    pub async fn fail_creates(&self, fail: bool) {
        self.state.write().await.failing_creates = fail;
    }

    /// Current content of a live note.
    pub async fn content(&self, note_id: &str) -> Option<String> {
        self.state.read().await.live(note_id).map(|n| n.content.clone())
    }

    /// Labels of a live note in insertion order.
    pub async fn labels(&self, note_id: &str) -> Vec<(String, String)> {
        self.state
            .read()
            .await
            .live(note_id)
            .map(|n| n.labels.clone())
            .unwrap_or_default()
    }

    /// Live children of a note.
    pub async fn children(&self, parent_id: &str) -> Vec<Note> {
        let state = self.state.read().await;
        let mut children: Vec<&StoredNote> = state
            .notes
            .values()
            .filter(|n| !n.note.is_deleted && n.parents.iter().any(|p| p == parent_id))
            .collect();
        children.sort_by_key(|n| n.created_seq);
        children.into_iter().map(|n| n.note.clone()).collect()
    }

    /// Live notes with this exact title.
    pub async fn notes_titled(&self, title: &str) -> Vec<Note> {
        let state = self.state.read().await;
        state
            .notes
            .values()
            .filter(|n| !n.note.is_deleted && n.note.title == title)
            .map(|n| n.note.clone())
            .collect()
    }

    /// Number of live notes, `root` included.
    pub async fn note_count(&self) -> usize {
        self.state
            .read()
            .await
            .notes
            .values()
            .filter(|n| !n.note.is_deleted)
            .count()
    }

    /// How many times `set_content` has been called.
    pub async fn set_content_calls(&self) -> usize {
        self.state.read().await.set_content_calls
    }
}

fn title_matches(title: &str, needle: &str, case_sensitive: bool, exact: bool) -> bool {
    let (title, needle) = if case_sensitive {
        (title.to_string(), needle.to_string())
    } else {
        (title.to_lowercase(), needle.to_lowercase())
    };
    if exact {
        title == needle
    } else {
        title.contains(&needle)
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        Ok(self.state.read().await.live(note_id).map(|n| n.note.clone()))
    }

    async fn get_content(&self, note: &Note) -> Result<String> {
        let state = self.state.read().await;
        if state.failing_reads.contains(&note.note_id) {
            return Err(Error::NoteAccess(format!(
                "content of {} is unreadable",
                note.note_id
            )));
        }
        state
            .live(&note.note_id)
            .map(|n| n.content.clone())
            .ok_or_else(|| Error::NoteNotFound(note.note_id.clone()))
    }

    async fn set_content(&self, note: &Note, content: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.set_content_calls += 1;
        let stored = state
            .notes
            .get_mut(&note.note_id)
            .filter(|n| !n.note.is_deleted)
            .ok_or_else(|| Error::NoteNotFound(note.note_id.clone()))?;
        stored.content = content.to_string();
        stored.note.date_modified = Some(Utc::now());
        Ok(())
    }

    async fn create_text_note(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<CreatedNote> {
        let mut state = self.state.write().await;
        if state.failing_creates {
            return Err(Error::Store {
                status: 500,
                message: "note creation disabled".to_string(),
            });
        }
        if state.live(parent_id).is_none() {
            return Err(Error::NoteNotFound(parent_id.to_string()));
        }

        let note_id = new_entity_id();
        state.insert(NoteSeed::text(&note_id, title, content).parent(parent_id));
        let note = state
            .live(&note_id)
            .map(|n| n.note.clone())
            .ok_or_else(|| Error::NoteNotFound(note_id.clone()))?;

        Ok(CreatedNote {
            branch_id: branch_id(parent_id, &note_id),
            note,
        })
    }

    async fn set_label(&self, note: &Note, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .notes
            .get_mut(&note.note_id)
            .filter(|n| !n.note.is_deleted)
            .ok_or_else(|| Error::NoteNotFound(note.note_id.clone()))?;
        match stored.labels.iter_mut().find(|(n, _)| n == name) {
            Some(label) => label.1 = value.to_string(),
            None => stored.labels.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    async fn query_notes_by_exact_title(
        &self,
        title: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>> {
        let state = self.state.read().await;
        let mut rows: Vec<NoteSummary> = state
            .notes
            .values()
            .filter(|n| !n.note.is_deleted && query.admits(&n.note.note_id))
            .filter(|n| title_matches(&n.note.title, title, query.case_sensitive, true))
            .map(|n| NoteSummary {
                note_id: n.note.note_id.clone(),
                title: n.note.title.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.is_root()
                .cmp(&a.is_root())
                .then(a.title.chars().count().cmp(&b.title.chars().count()))
                .then(a.note_id.cmp(&b.note_id))
        });
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn query_notes_by_title_substring(
        &self,
        pattern: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>> {
        let state = self.state.read().await;
        let mut rows: Vec<NoteSummary> = state
            .notes
            .values()
            .filter(|n| !n.note.is_deleted && query.admits(&n.note.note_id))
            .filter(|n| title_matches(&n.note.title, pattern, query.case_sensitive, false))
            .map(|n| NoteSummary {
                note_id: n.note.note_id.clone(),
                title: n.note.title.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.title
                .chars()
                .count()
                .cmp(&b.title.chars().count())
                .then(a.note_id.cmp(&b.note_id))
        });
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn query_descendant_note_ids(&self, root_id: &str) -> Result<Vec<String>> {
        Ok(self.state.read().await.descendants(root_id))
    }

    async fn query_candidate_note_ids(&self, query: &CandidateQuery) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let scope: Option<HashSet<String>> = query
            .scope_root
            .as_deref()
            .map(|root| state.descendants(root).into_iter().collect());
        let mut notes: Vec<&Note> = state
            .notes
            .values()
            .map(|n| &n.note)
            .filter(|n| !n.is_deleted && n.is_text() && query.admits(&n.note_id))
            .filter(|n| scope.as_ref().map_or(true, |ids| ids.contains(&n.note_id)))
            .collect();
        if query.order_by_recency {
            notes.sort_by(|a, b| {
                b.date_modified
                    .cmp(&a.date_modified)
                    .then(a.note_id.cmp(&b.note_id))
            });
        }
        Ok(notes
            .into_iter()
            .take(query.limit)
            .map(|n| n.note_id.clone())
            .collect())
    }

    async fn find_notes_with_label(&self, name: &str) -> Result<Vec<Note>> {
        let state = self.state.read().await;
        let mut found: Vec<&StoredNote> = state
            .notes
            .values()
            .filter(|n| !n.note.is_deleted && n.labels.iter().any(|(l, _)| l == name))
            .collect();
        found.sort_by_key(|n| n.created_seq);
        Ok(found.into_iter().map(|n| n.note.clone()).collect())
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .notes
            .get_mut(note_id)
            .filter(|n| !n.note.is_deleted)
            .ok_or_else(|| Error::NoteNotFound(note_id.to_string()))?;
        stored.note.is_deleted = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_store_has_root() {
        let store = InMemoryNoteStore::new();
        let root = store.get_note("root").await.unwrap().unwrap();
        assert_eq!(root.note_id, "root");
        assert_eq!(store.note_count().await, 1);
    }

    #[tokio::test]
    async fn test_set_label_overwrites() {
        let store = InMemoryNoteStore::with_notes([NoteSeed::text("a", "A", "")]);
        let note = store.get_note("a").await.unwrap().unwrap();
        store.set_label(&note, "k", "1").await.unwrap();
        store.set_label(&note, "k", "2").await.unwrap();
        assert_eq!(store.labels("a").await, vec![("k".to_string(), "2".to_string())]);
    }

    #[tokio::test]
    async fn test_deleted_notes_disappear() {
        let store = InMemoryNoteStore::with_notes([NoteSeed::text("a", "A", "body")]);
        store.delete_note("a").await.unwrap();
        assert!(store.get_note("a").await.unwrap().is_none());
        assert!(matches!(
            store.delete_note("a").await,
            Err(Error::NoteNotFound(_))
        ));
    }
}
