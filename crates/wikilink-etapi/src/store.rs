//! [`NoteStore`] over ETAPI.
//!
//! Trilium's search compares titles case-insensitively and cannot order by
//! title length, so title queries fetch a bounded page and the case rule,
//! exclusions and ordering are applied here.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use tracing::debug;

use wikilink_core::defaults::ROOT_NOTE_ID;
use wikilink_core::{
    CandidateQuery, CreatedNote, Error, Note, NoteStore, NoteSummary, Result, TitleQuery,
};

use crate::client::{EtapiClient, EtapiConfig};
use crate::types::{quote_search_value, CreateAttributeRequest, CreateNoteRequest, EtapiNote};

/// Rows requested from a title search before local filtering.
pub const TITLE_SEARCH_PAGE: usize = 500;

/// Rows requested when listing candidate text notes.
pub const CANDIDATE_SEARCH_PAGE: usize = 10_000;

pub struct EtapiNoteStore {
    client: EtapiClient,
}

impl EtapiNoteStore {
    pub fn new(config: EtapiConfig) -> Result<Self> {
        Ok(Self {
            client: EtapiClient::new(config)?,
        })
    }

    pub fn client(&self) -> &EtapiClient {
        &self.client
    }

    async fn title_search(
        &self,
        search: String,
        query: &TitleQuery,
        keep: impl Fn(&str) -> bool + Send,
    ) -> Result<Vec<NoteSummary>> {
        let notes = self
            .client
            .search(&search, None, None, Some(TITLE_SEARCH_PAGE))
            .await?;
        Ok(notes
            .into_iter()
            .filter(|n| query.admits(&n.note_id) && keep(&n.title))
            .map(|n| NoteSummary {
                note_id: n.note_id,
                title: n.title,
            })
            .collect())
    }
}

fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

#[async_trait]
impl NoteStore for EtapiNoteStore {
    async fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        Ok(self.client.get_note(note_id).await?.map(Note::from))
    }

    async fn get_content(&self, note: &Note) -> Result<String> {
        self.client.get_content(&note.note_id).await
    }

    async fn set_content(&self, note: &Note, content: &str) -> Result<()> {
        self.client.put_content(&note.note_id, content).await
    }

    async fn create_text_note(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
    ) -> Result<CreatedNote> {
        let response = self
            .client
            .create_note(&CreateNoteRequest {
                parent_note_id: parent_id,
                title,
                note_type: "text",
                content,
            })
            .await?;
        Ok(CreatedNote {
            branch_id: response.branch.branch_id,
            note: response.note.into(),
        })
    }

    async fn set_label(&self, note: &Note, name: &str, value: &str) -> Result<()> {
        let current = self
            .client
            .get_note(&note.note_id)
            .await?
            .ok_or_else(|| Error::NoteNotFound(note.note_id.clone()))?;

        if let Some(existing) = current.label(name) {
            return self
                .client
                .patch_attribute(&existing.attribute_id, value)
                .await;
        }

        self.client
            .create_attribute(&CreateAttributeRequest {
                note_id: &note.note_id,
                attribute_type: "label",
                name,
                value,
                is_inheritable: false,
            })
            .await?;
        Ok(())
    }

    async fn query_notes_by_exact_title(
        &self,
        title: &str,
        query: &TitleQuery,
    ) -> Result<Vec<NoteSummary>> {
        let wanted = fold(title, query.case_sensitive);
        let mut rows = self
            .title_search(
                format!("note.title = {}", quote_search_value(title)),
                query,
                |candidate| fold(candidate, query.case_sensitive) == wanted,
            )
            .await?;
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
        let wanted = fold(pattern, query.case_sensitive);
        let mut rows = self
            .title_search(
                format!("note.title *=* {}", quote_search_value(pattern)),
                query,
                |candidate| fold(candidate, query.case_sensitive).contains(&wanted),
            )
            .await?;
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
        let mut seen: HashSet<String> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root_id.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(note) = self.client.get_note(&current).await? else {
                continue;
            };
            order.push(note.note_id.clone());
            queue.extend(note.child_note_ids);
        }

        debug!(
            subsystem = "etapi",
            op = "descendants",
            root = root_id,
            result_count = order.len(),
            "Walked subtree"
        );
        Ok(order)
    }

    async fn query_candidate_note_ids(&self, query: &CandidateQuery) -> Result<Vec<String>> {
        let scope: Option<HashSet<String>> = match &query.scope_root {
            Some(root) => {
                let ids = self.query_descendant_note_ids(root).await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                Some(ids.into_iter().collect())
            }
            None => None,
        };

        let order_by = query
            .order_by_recency
            .then_some(("utcDateModified", "desc"));
        let notes: Vec<EtapiNote> = self
            .client
            .search(
                "note.type = text",
                None,
                order_by,
                Some(CANDIDATE_SEARCH_PAGE),
            )
            .await?;

        Ok(notes
            .into_iter()
            .filter(|n| n.note_type == "text" && query.admits(&n.note_id))
            .filter(|n| scope.as_ref().map_or(true, |ids| ids.contains(&n.note_id)))
            .take(query.limit)
            .map(|n| n.note_id)
            .collect())
    }

    async fn find_notes_with_label(&self, name: &str) -> Result<Vec<Note>> {
        let mut notes = self
            .client
            .search(&format!("#{name}"), None, None, None)
            .await?;
        notes.retain(|n| n.label(name).is_some());
        notes.sort_by(|a, b| {
            a.utc_date_created
                .cmp(&b.utc_date_created)
                .then(a.note_id.cmp(&b.note_id))
        });
        Ok(notes.into_iter().map(Note::from).collect())
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        if note_id == ROOT_NOTE_ID {
            return Err(Error::Store {
                status: 400,
                message: "the root note cannot be deleted".to_string(),
            });
        }
        self.client.delete_note(note_id).await
    }
}
