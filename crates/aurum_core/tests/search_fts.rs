use aurum_core::model::journal::{JournalDraft, JournalPatch};
use aurum_core::search::fts::search_journal;
use aurum_core::{open_db_in_memory, JournalService, Mood, SearchQuery, SqliteJournalRepository};
use rusqlite::Connection;
use std::collections::HashSet;
use uuid::Uuid;

fn service(conn: &Connection) -> JournalService<SqliteJournalRepository<'_>> {
    JournalService::new(SqliteJournalRepository::try_new(conn).unwrap())
}

fn write(conn: &Connection, title: &str, content: &str, created_at: i64) -> Uuid {
    service(conn)
        .create_entry(
            &JournalDraft {
                title: title.to_string(),
                content: content.to_string(),
                mood: Mood::Reflective,
                tags: Vec::new(),
                template_id: None,
            },
            created_at,
        )
        .unwrap()
        .id
}

#[test]
fn search_returns_created_entry_with_snippet() {
    let conn = open_db_in_memory().unwrap();
    let id = write(&conn, "Evening", "hello rust search", 1);

    let page = search_journal(&conn, &SearchQuery::new("rust")).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.hits[0].entry_id, id);
    assert!(page.hits[0].snippet.contains("[rust]"));
}

#[test]
fn search_reflects_updated_content() {
    let conn = open_db_in_memory().unwrap();
    let id = write(&conn, "Draft", "alpha text", 1);

    service(&conn)
        .update_entry(
            id,
            &JournalPatch {
                content: Some("beta text".to_string()),
                ..JournalPatch::default()
            },
            2,
        )
        .unwrap();

    assert!(search_journal(&conn, &SearchQuery::new("alpha"))
        .unwrap()
        .hits
        .is_empty());
    let hits = search_journal(&conn, &SearchQuery::new("beta")).unwrap().hits;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry_id, id);
}

#[test]
fn search_excludes_trashed_entries() {
    let conn = open_db_in_memory().unwrap();
    let id = write(&conn, "Errands", "buy milk tomorrow", 1);
    service(&conn).delete_entry(id, 2).unwrap();

    let page = search_journal(&conn, &SearchQuery::new("milk")).unwrap();
    assert!(page.hits.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn limit_caps_hits_but_not_total() {
    let conn = open_db_in_memory().unwrap();
    let ids = HashSet::from([
        write(&conn, "A", "token common a", 1),
        write(&conn, "B", "token common b", 2),
        write(&conn, "C", "token common c", 3),
    ]);

    let mut query = SearchQuery::new("token");
    query.limit = 2;
    let page = search_journal(&conn, &query).unwrap();

    assert_eq!(page.hits.len(), 2);
    assert_eq!(page.total, 3);
    assert!(page.hits.iter().all(|hit| ids.contains(&hit.entry_id)));
}

#[test]
fn limit_zero_still_counts() {
    let conn = open_db_in_memory().unwrap();
    write(&conn, "Limits", "query limit zero", 1);

    let mut query = SearchQuery::new("query");
    query.limit = 0;
    let page = search_journal(&conn, &query).unwrap();

    assert!(page.hits.is_empty());
    assert_eq!(page.total, 1);
}

#[test]
fn punctuation_and_quotes_do_not_break_parsing() {
    let conn = open_db_in_memory().unwrap();
    write(&conn, "Plain", "alpha beta", 1);

    for text in ["a:b", "\"unterminated", "NEAR(alpha"] {
        let page = search_journal(&conn, &SearchQuery::new(text)).unwrap();
        assert!(page.hits.is_empty(), "unexpected hit for `{text}`");
    }
}

#[test]
fn title_matches_count() {
    let conn = open_db_in_memory().unwrap();
    let id = write(&conn, "Gratitude list", "", 1);

    let page = search_journal(&conn, &SearchQuery::new("gratitude")).unwrap();
    assert_eq!(page.hits.len(), 1);
    assert_eq!(page.hits[0].entry_id, id);
}
