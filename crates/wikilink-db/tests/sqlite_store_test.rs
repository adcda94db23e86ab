use wikilink_db::test_fixtures::{TestDataBuilder, TestDatabase};
use wikilink_db::{CandidateQuery, Error, NoteStore, TitleQuery};

fn title_query(case_sensitive: bool) -> TitleQuery {
    TitleQuery {
        case_sensitive,
        exclude_system: true,
        exclude_ids: Vec::new(),
        limit: 5,
    }
}

#[tokio::test]
async fn test_get_note_and_content() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Research Notes", "See [[Timeline]]")
        .await;

    let note = db.store.get_note("n1").await.unwrap().expect("note exists");
    assert_eq!(note.title, "Research Notes");
    assert!(note.is_text());
    assert!(note.date_modified.is_some());

    let content = db.store.get_content(&note).await.unwrap();
    assert_eq!(content, "See [[Timeline]]");

    assert!(db.store.get_note("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_content_replaces_blob() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db).with_note("n1", "A", "old").await;

    let note = db.store.get_note("n1").await.unwrap().unwrap();
    db.store.set_content(&note, "new ~abc").await.unwrap();
    assert_eq!(db.store.get_content(&note).await.unwrap(), "new ~abc");

    // The seeded blob is left intact for any other note sharing it.
    let old: String = sqlx::query_scalar("SELECT content FROM blobs WHERE blobId = 'blob_n1'")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(old, "old");
}

#[tokio::test]
async fn test_set_content_on_missing_note_fails() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db).with_note("n1", "A", "old").await;
    let note = db.store.get_note("n1").await.unwrap().unwrap();
    db.store.delete_note("n1").await.unwrap();

    let result = db.store.set_content(&note, "new").await;
    assert!(matches!(result, Err(Error::NoteNotFound(_))));
}

#[tokio::test]
async fn test_exact_title_prefers_root_then_shortest() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Timeline", "")
        .await
        .with_note("n2", "TIMELINE", "")
        .await
        .with_note("_hidden", "Timeline", "")
        .await;

    let rows = db
        .store
        .query_notes_by_exact_title("timeline", &title_query(false))
        .await
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.note_id.as_str()).collect();
    assert_eq!(ids, vec!["n1", "n2"]);

    let rows = db
        .store
        .query_notes_by_exact_title("root", &title_query(false))
        .await
        .unwrap();
    assert!(rows[0].is_root());
}

#[tokio::test]
async fn test_exact_title_case_sensitive() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Timeline", "")
        .await
        .with_note("n2", "TIMELINE", "")
        .await;

    let rows = db
        .store
        .query_notes_by_exact_title("TIMELINE", &title_query(true))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].note_id, "n2");
}

#[tokio::test]
async fn test_substring_orders_by_title_length() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Project Timeline Overview", "")
        .await
        .with_note("n2", "Timeline", "")
        .await
        .with_note("n3", "Unrelated", "")
        .await;

    let rows = db
        .store
        .query_notes_by_title_substring("timeline", &title_query(false))
        .await
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.note_id.as_str()).collect();
    assert_eq!(ids, vec!["n2", "n1"]);
}

#[tokio::test]
async fn test_excluded_ids_are_skipped() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Timeline", "")
        .await
        .with_note("n2", "Timeline", "")
        .await;

    let query = TitleQuery {
        exclude_ids: vec!["n1".into()],
        ..title_query(false)
    };
    let rows = db
        .store
        .query_notes_by_exact_title("Timeline", &query)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].note_id, "n2");
}

#[tokio::test]
async fn test_create_text_note_places_branch() {
    let db = TestDatabase::new().await;
    let created = db
        .store
        .create_text_note("root", "Nonexistent Page", "# Nonexistent Page")
        .await
        .unwrap();

    assert_eq!(created.note.title, "Nonexistent Page");
    assert_eq!(created.branch_id, format!("root_{}", created.note.note_id));

    let parent: String = sqlx::query_scalar("SELECT parentNoteId FROM branches WHERE branchId = ?")
        .bind(&created.branch_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(parent, "root");

    let fetched = db
        .store
        .get_note(&created.note.note_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        db.store.get_content(&fetched).await.unwrap(),
        "# Nonexistent Page"
    );
}

#[tokio::test]
async fn test_create_under_missing_parent_fails() {
    let db = TestDatabase::new().await;
    let result = db.store.create_text_note("nowhere", "X", "").await;
    assert!(matches!(result, Err(Error::NoteNotFound(id)) if id == "nowhere"));
}

#[tokio::test]
async fn test_labels_are_found_and_overwritten() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Report", "")
        .await
        .with_label("n1", "wikilinkReport", "")
        .await;

    let note = db
        .store
        .find_note_with_label("wikilinkReport")
        .await
        .unwrap()
        .expect("labelled note");
    assert_eq!(note.note_id, "n1");

    db.store.set_label(&note, "template", "t1").await.unwrap();
    db.store.set_label(&note, "template", "t2").await.unwrap();
    let value: String = sqlx::query_scalar(
        "SELECT value FROM attributes WHERE noteId = 'n1' AND name = 'template' AND isDeleted = 0",
    )
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(value, "t2");

    assert!(db
        .store
        .find_notes_with_label("nothing")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_descendants_include_root_and_nested_children() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("p", "Project", "")
        .await
        .with_child("p", "c1", "Child", "")
        .await
        .with_child("c1", "g1", "Grandchild", "")
        .await
        .with_note("other", "Other", "")
        .await;

    let mut ids = db.store.query_descendant_note_ids("p").await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["c1", "g1", "p"]);
}

#[tokio::test]
async fn test_candidates_scoped_to_subtree() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("p", "Project", "[[A]]")
        .await
        .with_child("p", "c1", "Child", "[[B]]")
        .await
        .with_child("c1", "g1", "Grandchild", "[[C]]")
        .await
        .with_note("other", "Other", "[[D]]")
        .await;

    let query = CandidateQuery {
        scope_root: Some("c1".into()),
        exclude_system: true,
        exclude_ids: vec!["g1".into()],
        limit: 10,
        order_by_recency: false,
    };
    assert_eq!(
        db.store.query_candidate_note_ids(&query).await.unwrap(),
        vec!["c1"]
    );

    let whole = CandidateQuery {
        scope_root: Some("p".into()),
        exclude_ids: Vec::new(),
        ..query
    };
    let mut ids = db.store.query_candidate_note_ids(&whole).await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["c1", "g1", "p"]);
}

#[tokio::test]
async fn test_candidates_filter_type_scope_and_recency() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_typed_note("old", "Old", "text", "2024-01-01 00:00:00.000Z")
        .await
        .with_typed_note("new", "New", "text", "2024-06-01 00:00:00.000Z")
        .await
        .with_typed_note("code", "Script", "code", "2024-07-01 00:00:00.000Z")
        .await
        .with_typed_note("_sys", "System", "text", "2024-08-01 00:00:00.000Z")
        .await;

    let query = CandidateQuery {
        scope_root: None,
        exclude_system: true,
        exclude_ids: Vec::new(),
        limit: 10,
        order_by_recency: true,
    };
    let ids = db.store.query_candidate_note_ids(&query).await.unwrap();
    assert_eq!(ids, vec!["new", "old"]);

    let scoped = CandidateQuery {
        scope_root: Some("old".into()),
        ..query.clone()
    };
    assert_eq!(
        db.store.query_candidate_note_ids(&scoped).await.unwrap(),
        vec!["old"]
    );

    let empty_scope = CandidateQuery {
        scope_root: Some("missing".into()),
        ..query.clone()
    };
    assert!(db
        .store
        .query_candidate_note_ids(&empty_scope)
        .await
        .unwrap()
        .is_empty());

    let limited = CandidateQuery { limit: 1, ..query };
    assert_eq!(
        db.store.query_candidate_note_ids(&limited).await.unwrap(),
        vec!["new"]
    );
}

#[tokio::test]
async fn test_delete_note_is_soft() {
    let db = TestDatabase::new().await;
    TestDataBuilder::new(&db)
        .with_note("n1", "Demo", "")
        .await
        .with_label("n1", "demoWikilink", "true")
        .await;

    db.store.delete_note("n1").await.unwrap();
    assert!(db.store.get_note("n1").await.unwrap().is_none());
    assert!(db
        .store
        .find_notes_with_label("demoWikilink")
        .await
        .unwrap()
        .is_empty());

    let flagged: i64 = sqlx::query_scalar("SELECT isDeleted FROM notes WHERE noteId = 'n1'")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(flagged, 1);
}
