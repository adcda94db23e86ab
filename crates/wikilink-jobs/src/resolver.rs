//! Wikilink → note resolution.
//!
//! Exact title matches win outright. Otherwise substring candidates are
//! scored with [`similarity`] and the best one above the configured threshold
//! is used. Links with no candidate either get a freshly created note or
//! fail with [`Error::Resolution`].

use chrono::{DateTime, Local};
use tracing::{debug, info, trace, warn};

use wikilink_core::defaults::{
    CREATED_FROM_WIKILINK_LABEL, EXACT_QUERY_LIMIT, FUZZY_PREFILTER_LIMIT, TEMPLATE_LABEL,
};
use wikilink_core::{
    similarity, Candidate, Error, NoteStore, ProcessorConfig, Resolution, Result, TitleQuery,
    Wikilink,
};

/// Resolves wikilinks against a note store.
pub struct NoteResolver<'a> {
    store: &'a dyn NoteStore,
    config: &'a ProcessorConfig,
}

impl<'a> NoteResolver<'a> {
    pub fn new(store: &'a dyn NoteStore, config: &'a ProcessorConfig) -> Self {
        Self { store, config }
    }

    fn title_query(&self, limit: usize) -> TitleQuery {
        TitleQuery {
            case_sensitive: self.config.case_sensitive,
            exclude_system: self.config.exclude_system_notes,
            exclude_ids: self.config.exclude_note_ids.clone(),
            limit,
        }
    }

    /// Ranked candidates for a title.
    ///
    /// Exact matches come back alone with score 1.0. Fuzzy candidates are
    /// sorted by score descending, then by shorter title.
    pub async fn find_candidates(&self, title: &str) -> Result<Vec<Candidate>> {
        let lookup_failed =
            |e: Error| Error::Resolution(format!("Failed to search for notes with title \"{title}\": {e}"));

        let exact = self
            .store
            .query_notes_by_exact_title(title, &self.title_query(EXACT_QUERY_LIMIT))
            .await
            .map_err(lookup_failed)?;

        if !exact.is_empty() {
            return Ok(exact
                .into_iter()
                .map(|row| Candidate {
                    note_id: row.note_id,
                    title: row.title,
                    score: 1.0,
                })
                .collect());
        }

        if !self.config.fuzzy_search {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .query_notes_by_title_substring(title, &self.title_query(FUZZY_PREFILTER_LIMIT))
            .await
            .map_err(lookup_failed)?;

        let wanted = self.config.normalize_title(title);
        let mut scored: Vec<Candidate> = rows
            .into_iter()
            .map(|row| {
                let score = similarity(&self.config.normalize_title(&row.title), &wanted);
                trace!(candidate = %row.title, score, "Scored fuzzy candidate");
                Candidate {
                    note_id: row.note_id,
                    title: row.title,
                    score,
                }
            })
            .filter(|c| c.score >= self.config.min_match_score)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.title.chars().count().cmp(&b.title.chars().count()))
        });
        scored.truncate(self.config.max_search_results);
        Ok(scored)
    }

    /// Resolve one wikilink, creating its target note when allowed.
    pub async fn resolve(&self, wikilink: &Wikilink) -> Result<Resolution> {
        if wikilink.title.is_empty() {
            return Err(Error::Parse(format!(
                "Empty title in wikilink {}",
                wikilink.full_match
            )));
        }

        let mut candidates = self.find_candidates(&wikilink.title).await?;

        if candidates.is_empty() {
            if !self.config.auto_create_orphaned_links {
                return Err(Error::Resolution(format!(
                    "No matching note found for wikilink: [[{}]]",
                    wikilink.title
                )));
            }
            if self.config.dry_run {
                debug!(wikilink = %wikilink.title, "Dry run, would create note");
                return Ok(Resolution::created(String::new(), wikilink.title.clone()));
            }
            let note_id = self.create_note_for(wikilink).await?;
            return Ok(Resolution::created(note_id, wikilink.title.clone()));
        }

        if candidates.len() > 1 {
            let best = &candidates[0];
            if self.config.verbose_logging {
                info!(
                    wikilink = %wikilink.title,
                    note_id = %best.note_id,
                    chosen = %best.title,
                    score = best.score,
                    candidates = candidates.len(),
                    "Multiple matches, using best"
                );
            } else {
                debug!(
                    wikilink = %wikilink.title,
                    note_id = %best.note_id,
                    score = best.score,
                    candidates = candidates.len(),
                    "Multiple matches, using best"
                );
            }
        }

        Ok(Resolution::existing(candidates.swap_remove(0)))
    }

    /// Create the target note for an orphaned wikilink and return its id.
    pub async fn create_note_for(&self, wikilink: &Wikilink) -> Result<String> {
        let creation_failed = |e: Error| {
            Error::Resolution(format!(
                "Failed to create note for wikilink [[{}]]: {e}",
                wikilink.title
            ))
        };

        let content = new_note_content(wikilink, Local::now());
        let created = self
            .store
            .create_text_note(
                &self.config.default_parent_for_new_notes,
                &wikilink.title,
                &content,
            )
            .await
            .map_err(creation_failed)?;

        self.store
            .set_label(&created.note, CREATED_FROM_WIKILINK_LABEL, "true")
            .await
            .map_err(creation_failed)?;

        if let Some(template_id) = &self.config.default_template_for_new_notes {
            match self.store.get_note(template_id).await {
                Ok(Some(template)) => {
                    if let Err(e) = self
                        .store
                        .set_label(&created.note, TEMPLATE_LABEL, &template.note_id)
                        .await
                    {
                        warn!(template_id = %template_id, error = %e, "Could not apply template");
                    }
                }
                Ok(None) => {
                    warn!(template_id = %template_id, "Template note not found, skipping");
                }
                Err(e) => {
                    warn!(template_id = %template_id, error = %e, "Could not apply template");
                }
            }
        }

        info!(
            subsystem = "jobs",
            component = "resolver",
            op = "create_note",
            note_id = %created.note.note_id,
            title = %wikilink.title,
            "Created note from wikilink"
        );
        Ok(created.note.note_id)
    }
}

/// Initial content of a note created for an orphaned wikilink.
pub fn new_note_content(wikilink: &Wikilink, created_at: DateTime<Local>) -> String {
    let mut content = format!("# {}\n\n", wikilink.title);
    content.push_str("*This note was automatically created from a wikilink reference.*\n\n");

    if !wikilink.heading.is_empty() {
        content.push_str(&format!("## {}\n\n", wikilink.heading));
        content.push_str("Content for this section will be added here.\n\n");
    }

    content.push_str("---\n\n");
    content.push_str(&format!(
        "**Created:** {}\n",
        created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    content.push_str("**Source:** Wikilink processor\n");
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wikilink_core::parse;

    #[test]
    fn test_new_note_content_without_heading() {
        let link = parse("[[Academic Papers]]").remove(0);
        let at = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let content = new_note_content(&link, at);
        assert!(content.starts_with("# Academic Papers\n\n*This note was automatically created"));
        assert!(!content.contains("## "));
        assert!(content.contains("**Created:** 2024-05-06 07:08:09\n"));
        assert!(content.ends_with("**Source:** Wikilink processor\n"));
    }

    #[test]
    fn test_new_note_content_with_heading() {
        let link = parse("[[Timeline#Milestones|Key Dates]]").remove(0);
        let content = new_note_content(&link, Local::now());
        assert!(content.starts_with("# Timeline\n\n"));
        assert!(content.contains("## Milestones\n\nContent for this section will be added here.\n\n---"));
    }
}
