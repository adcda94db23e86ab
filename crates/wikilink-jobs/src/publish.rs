//! Storing the rendered report as a note.

use tracing::info;

use wikilink_core::{NoteStore, ReportConfig, Result};

/// Write `content` into the note carrying the report label, creating and
/// labelling it under the report parent when none exists. Returns the note id.
pub async fn publish_report(
    store: &dyn NoteStore,
    config: &ReportConfig,
    content: &str,
) -> Result<String> {
    if let Some(existing) = store.find_note_with_label(&config.note_label).await? {
        store.set_content(&existing, content).await?;
        info!(
            subsystem = "jobs",
            component = "report",
            op = "publish",
            note_id = %existing.note_id,
            "Updated report note"
        );
        return Ok(existing.note_id);
    }

    let created = store
        .create_text_note(&config.note_parent, &config.note_title, content)
        .await?;
    store
        .set_label(&created.note, &config.note_label, "true")
        .await?;

    info!(
        subsystem = "jobs",
        component = "report",
        op = "publish",
        note_id = %created.note.note_id,
        "Created report note"
    );
    Ok(created.note.note_id)
}
