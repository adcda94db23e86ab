//! Demo notes exercising every wikilink form.
//!
//! `seed` creates five linked notes plus a summary, all labelled
//! `demoWikilink`; `cleanup` deletes every note with that label.

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use wikilink_core::defaults::ROOT_NOTE_ID;
use wikilink_core::{NoteStore, Result};

/// Label on every demo note.
pub const DEMO_LABEL: &str = "demoWikilink";
/// Label on the five content notes (value `wikilinks`).
pub const DEMO_CONTENT_LABEL: &str = "demoContent";
/// Label on the summary note.
pub const DEMO_SUMMARY_LABEL: &str = "demoSummary";
pub const DEMO_SUMMARY_TITLE: &str = "Wikilink Demo Summary";

pub struct DemoNote {
    pub title: &'static str,
    pub content: &'static str,
}

pub const DEMO_NOTES: &[DemoNote] = &[
    DemoNote {
        title: "Project Overview",
        content: "# Project Overview

This is a demo project to test the [[wikilink processor]] functionality.

## Related Documents
- [[Research Notes]]
- [[Technical Requirements]]
- [[Timeline|Project Schedule]]

## Key Features
The [[wikilink processor]] automatically converts markdown-style links to Trilium's native format.

This allows for seamless integration with [[Trilium Backlinks|existing backlink system]].

## References
- See [[Technical Requirements#Security]] for security considerations
- Check [[Timeline#Milestones]] for key dates
",
    },
    DemoNote {
        title: "Research Notes",
        content: "# Research Notes

Research findings related to the [[Project Overview]].

## Key Findings
1. [[wikilink processor]] implementation is feasible
2. Integration with [[Trilium Backlinks]] works well
3. [[User Experience]] improvements are significant

## Sources
- [[Academic Papers]]
- [[Technical Documentation|Docs]]
- [[User Feedback|Comments]]

## Related Topics
- [[Best Practices]]
- [[Performance Metrics]]
",
    },
    DemoNote {
        title: "Technical Requirements",
        content: "# Technical Requirements

Technical specifications for the [[Project Overview]].

## System Requirements
- [[wikilink processor]] must handle batch processing
- Integration with [[Trilium Backlinks]] required
- Support for [[User Experience]] features

## Security Section #Security

### Authentication
- [[Security Protocols]]
- [[User Access|Permissions]]

### Data Protection
- [[Encryption Standards]]
- [[Backup Procedures|Data Backup]]

## Performance
- [[Performance Metrics]] must be tracked
- [[Optimization Techniques]] should be implemented
",
    },
    DemoNote {
        title: "Timeline",
        content: "# Timeline

Project timeline for the [[Project Overview]].

## Phases

### Phase 1: Research
- Complete [[Research Notes]]
- Review [[Academic Papers]]
- Analyze [[User Feedback|Comments]]

### Phase 2: Development #Milestones
- Implement [[wikilink processor]]
- Integrate with [[Trilium Backlinks]]
- Test [[User Experience]] features

### Phase 3: Testing
- [[Performance Metrics]] evaluation
- [[Security Protocols]] validation
- [[User Feedback]] collection

## Deadlines
- See [[Timeline#Milestones]] for specific dates
- Review [[Timeline#Phase 3]] for testing schedule
",
    },
    DemoNote {
        title: "Best Practices",
        content: "# Best Practices

Recommended practices for using the [[wikilink processor]].

## Usage Guidelines
1. Use descriptive titles for [[wikilinks]]
2. Maintain consistency with [[Trilium Backlinks]]
3. Test with [[User Experience]] in mind

## Implementation Tips
- Batch process [[Performance Metrics]]
- Follow [[Security Protocols]]
- Document [[Technical Documentation|changes]]

## Resources
- [[Academic Papers]] on knowledge management
- [[User Feedback]] from testing
- [[Optimization Techniques]] for performance
",
    },
];

/// Result of seeding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedOutcome {
    /// `(note_id, title)` of each created content note.
    pub created: Vec<(String, String)>,
    /// Titles already present as demo notes.
    pub skipped: Vec<String>,
    pub summary_note_id: Option<String>,
}

/// Content of the summary note listing the created notes.
pub fn summary_content(created_titles: &[String]) -> String {
    let list: Vec<String> = created_titles.iter().map(|t| format!("- [[{t}]]")).collect();
    format!(
        "# Wikilink Demo Setup

This demo contains {count} notes with various [[wikilink]] formats to test the wikilink processor.

## Created Notes
{list}

## Wikilink Formats Used
- Basic: [[Project Overview]]
- With alias: [[Timeline|Project Schedule]]
- With heading: [[Technical Requirements#Security]]
- Combined: [[Timeline#Milestones|Key Dates]]

## Next Steps
1. Run the [[wikilink processor]]
2. Check the processing report
3. Verify that links are converted to ~noteId format
4. Test backlink functionality

## Notes to Create Orphaned Links
These wikilinks should trigger automatic note creation:
- [[Academic Papers]]
- [[User Experience]]
- [[Trilium Backlinks]]
- [[Security Protocols]]
- [[Performance Metrics]]
- [[User Feedback|Comments]]
- [[Technical Documentation|Docs]]
- [[Encryption Standards]]
- [[Backup Procedures|Data Backup]]
- [[Optimization Techniques]]

---
*Created by demo setup on {created}*
",
        count = created_titles.len(),
        list = list.join("\n"),
        created = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Create the demo notes under `root`. Titles already present as demo
/// notes are skipped; a failure on one note is logged and the rest continue.
pub async fn seed(store: &dyn NoteStore) -> Result<SeedOutcome> {
    let existing: Vec<String> = store
        .find_notes_with_label(DEMO_LABEL)
        .await?
        .into_iter()
        .map(|n| n.title)
        .collect();

    let mut outcome = SeedOutcome::default();

    for demo in DEMO_NOTES {
        if existing.iter().any(|t| t == demo.title) {
            info!(title = demo.title, "Demo note already exists, skipping");
            outcome.skipped.push(demo.title.to_string());
            continue;
        }

        let created = match store
            .create_text_note(ROOT_NOTE_ID, demo.title, demo.content)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                warn!(title = demo.title, error = %e, "Failed to create demo note");
                continue;
            }
        };
        store.set_label(&created.note, DEMO_LABEL, "true").await?;
        store
            .set_label(&created.note, DEMO_CONTENT_LABEL, "wikilinks")
            .await?;

        info!(note_id = %created.note.note_id, title = demo.title, "Created demo note");
        outcome
            .created
            .push((created.note.note_id, demo.title.to_string()));
    }

    let titles: Vec<String> = outcome.created.iter().map(|(_, t)| t.clone()).collect();
    let summary = store
        .create_text_note(ROOT_NOTE_ID, DEMO_SUMMARY_TITLE, &summary_content(&titles))
        .await?;
    store.set_label(&summary.note, DEMO_LABEL, "true").await?;
    store
        .set_label(&summary.note, DEMO_SUMMARY_LABEL, "true")
        .await?;
    outcome.summary_note_id = Some(summary.note.note_id);

    info!(
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        "Demo setup completed"
    );
    Ok(outcome)
}

/// Delete every note labelled [`DEMO_LABEL`]. Returns how many were deleted.
pub async fn cleanup(store: &dyn NoteStore) -> Result<usize> {
    let notes = store.find_notes_with_label(DEMO_LABEL).await?;
    let mut deleted = 0;

    for note in notes {
        match store.delete_note(&note.note_id).await {
            Ok(()) => {
                deleted += 1;
                info!(note_id = %note.note_id, title = %note.title, "Deleted demo note");
            }
            Err(e) => {
                warn!(note_id = %note.note_id, error = %e, "Failed to delete demo note");
            }
        }
    }

    info!(deleted, "Demo cleanup completed");
    Ok(deleted)
}
