//! Per-note processing: fetch, parse, resolve, rewrite, persist.

use std::time::Instant;

use tracing::{debug, info, warn};

use wikilink_core::{
    parse_unprocessed, Error, LinkError, LinkRewriter, NoteStore, ProcessingResult,
    ProcessorConfig, ResolvedLink, Result,
};

use crate::resolver::NoteResolver;

/// Process one note. Never fails: every problem ends up in `errors`.
pub async fn process_note(
    store: &dyn NoteStore,
    config: &ProcessorConfig,
    note_id: &str,
) -> ProcessingResult {
    let start = Instant::now();
    let mut result = ProcessingResult::new(note_id);

    if let Err(e) = process_into(store, config, note_id, &mut result).await {
        warn!(
            subsystem = "jobs",
            component = "processor",
            note_id,
            error = %e,
            "Note processing failed"
        );
        result.errors.push(LinkError::for_note(e));
    }

    result.processing_time_ms = start.elapsed().as_millis() as u64;
    result
}

async fn process_into(
    store: &dyn NoteStore,
    config: &ProcessorConfig,
    note_id: &str,
    result: &mut ProcessingResult,
) -> Result<()> {
    let note = store
        .get_note(note_id)
        .await
        .map_err(|e| Error::NoteAccess(format!("Failed to load note {note_id}: {e}")))?
        .ok_or_else(|| Error::NoteAccess(format!("Note not found: {note_id}")))?;
    result.note_title = note.title.clone();

    let content = store
        .get_content(&note)
        .await
        .map_err(|e| Error::NoteAccess(format!("Failed to read content of {note_id}: {e}")))?;
    if content.is_empty() {
        return Ok(());
    }

    let wikilinks = parse_unprocessed(&content);
    result.wikilinks_found = wikilinks.len();
    if wikilinks.is_empty() {
        return Ok(());
    }

    let resolver = NoteResolver::new(store, config);
    let mut resolved = Vec::with_capacity(wikilinks.len());
    for wikilink in wikilinks {
        match resolver.resolve(&wikilink).await {
            Ok(resolution) => {
                if resolution.created {
                    result.notes_created += 1;
                }
                result.wikilinks_processed += 1;
                if config.verbose_logging {
                    info!(
                        note_id,
                        wikilink = %wikilink.full_match,
                        target = %resolution.note_id,
                        confidence = resolution.confidence,
                        "Resolved wikilink"
                    );
                }
                resolved.push(ResolvedLink {
                    wikilink,
                    resolution,
                });
            }
            Err(e) => {
                debug!(note_id, wikilink = %wikilink.full_match, error = %e, "Wikilink not resolved");
                result.errors.push(LinkError::for_link(&wikilink, e));
            }
        }
    }

    if resolved.is_empty() || config.dry_run {
        return Ok(());
    }

    let rewritten = LinkRewriter::from_config(config).rewrite(&content, &resolved);
    if rewritten != content {
        store
            .set_content(&note, &rewritten)
            .await
            .map_err(|e| Error::NoteAccess(format!("Failed to save note {note_id}: {e}")))?;
        result.links_created = resolved.len();
    }

    Ok(())
}
