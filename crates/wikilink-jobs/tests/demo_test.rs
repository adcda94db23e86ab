use std::sync::Arc;

use wikilink_db::InMemoryNoteStore;
use wikilink_jobs::demo::{self, DEMO_LABEL, DEMO_NOTES, DEMO_SUMMARY_TITLE};
use wikilink_jobs::{NoteStore, ProcessorConfig, WikilinkProcessor};

#[tokio::test]
async fn test_seed_creates_labelled_notes() {
    let store = InMemoryNoteStore::new();

    let outcome = demo::seed(&store).await.unwrap();

    assert_eq!(outcome.created.len(), DEMO_NOTES.len());
    assert!(outcome.skipped.is_empty());
    let summary_id = outcome.summary_note_id.unwrap();
    assert_eq!(
        store.get_note(&summary_id).await.unwrap().unwrap().title,
        DEMO_SUMMARY_TITLE
    );

    let labelled = store.find_notes_with_label(DEMO_LABEL).await.unwrap();
    assert_eq!(labelled.len(), DEMO_NOTES.len() + 1);

    let (first_id, first_title) = &outcome.created[0];
    assert_eq!(first_title, "Project Overview");
    let labels = store.labels(first_id).await;
    assert!(labels.contains(&("demoContent".to_string(), "wikilinks".to_string())));
}

#[tokio::test]
async fn test_seed_twice_skips_existing_titles() {
    let store = InMemoryNoteStore::new();
    demo::seed(&store).await.unwrap();

    let again = demo::seed(&store).await.unwrap();

    assert!(again.created.is_empty());
    assert_eq!(again.skipped.len(), DEMO_NOTES.len());
    assert_eq!(store.notes_titled("Timeline").await.len(), 1);
}

#[tokio::test]
async fn test_cleanup_removes_demo_notes_only() {
    let store = InMemoryNoteStore::new();
    demo::seed(&store).await.unwrap();
    let before = store.note_count().await;

    let deleted = demo::cleanup(&store).await.unwrap();

    assert_eq!(deleted, DEMO_NOTES.len() + 1);
    assert_eq!(store.note_count().await, before - deleted);
    assert!(store.get_note("root").await.unwrap().is_some());
    assert_eq!(demo::cleanup(&store).await.unwrap(), 0);
}

#[tokio::test]
async fn test_processing_demo_links_every_note() {
    let store = Arc::new(InMemoryNoteStore::new());
    demo::seed(store.as_ref()).await.unwrap();

    let mut config = ProcessorConfig {
        batch_pause_ms: 0,
        ..Default::default()
    };
    config.report.generate = false;
    let dyn_store: Arc<dyn NoteStore> = store.clone();
    let outcome = WikilinkProcessor::new(dyn_store, config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.total_errors(), 0);
    assert!(outcome.results.iter().any(|r| r.notes_created > 0));
    assert_eq!(store.notes_titled("Research Notes").await.len(), 1);

    let overview = store.notes_titled("Project Overview").await.remove(0);
    let content = store.content(&overview.note_id).await.unwrap();
    assert!(wikilink_jobs::parse_unprocessed(&content).is_empty());
}
