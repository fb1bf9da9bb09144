use aurum_core::model::journal::{JournalDraft, JournalPatch, TemplateDraft};
use aurum_core::service::journal_service::{JournalServiceError, MAX_PAGE_SIZE};
use aurum_core::time::{start_of_day, MS_PER_DAY, MS_PER_HOUR};
use aurum_core::{open_db_in_memory, JournalService, Mood, SqliteJournalRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

fn day(year: i32, month: u32, day: u32) -> i64 {
    start_of_day(NaiveDate::from_ymd_opt(year, month, day).unwrap()) + 9 * MS_PER_HOUR
}

fn service(conn: &Connection) -> JournalService<SqliteJournalRepository<'_>> {
    JournalService::new(SqliteJournalRepository::try_new(conn).unwrap())
}

fn draft(title: &str, content: &str, mood: Mood, tags: &[&str]) -> JournalDraft {
    JournalDraft {
        title: title.to_string(),
        content: content.to_string(),
        mood,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        template_id: None,
    }
}

#[test]
fn create_sanitizes_title_and_normalizes_tags() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let entry = service
        .create_entry(
            &draft("<b>Morning</b>   pages", "Slept well.", Mood::Optimistic, &["Sleep", " sleep ", "Habits"]),
            day(2024, 3, 15),
        )
        .unwrap();

    assert_eq!(entry.title, "Morning pages");
    assert_eq!(entry.tags, vec!["habits", "sleep"]);
    let loaded = service.get_entry(entry.id).unwrap();
    assert_eq!(loaded, entry);
}

#[test]
fn blank_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_entry(&draft("  <br/> ", "", Mood::Reflective, &[]), day(2024, 3, 15))
        .unwrap_err();
    assert!(matches!(err, JournalServiceError::Validation(_)));
}

#[test]
fn entry_with_unknown_template_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    let mut with_template = draft("Review", "", Mood::Reflective, &[]);
    with_template.template_id = Some(missing);
    let err = service
        .create_entry(&with_template, day(2024, 3, 15))
        .unwrap_err();
    assert!(matches!(err, JournalServiceError::TemplateNotFound(id) if id == missing));
}

#[test]
fn list_is_newest_first_and_clamps_page_size() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    for index in 0..3 {
        service
            .create_entry(
                &draft(&format!("Entry {index}"), "", Mood::Reflective, &[]),
                day(2024, 3, 10) + index * MS_PER_DAY,
            )
            .unwrap();
    }

    let page = service.list(0, Some(2)).unwrap();
    let titles: Vec<&str> = page.entries.iter().map(|entry| entry.title.as_str()).collect();
    assert_eq!(titles, vec!["Entry 2", "Entry 1"]);
    assert_eq!(page.total, 3);

    let rest = service.list(2, Some(2)).unwrap();
    assert_eq!(rest.entries.len(), 1);
    assert_eq!(rest.entries[0].title, "Entry 0");

    assert_eq!(service.list(0, Some(10_000)).unwrap().limit, MAX_PAGE_SIZE);
    assert_eq!(service.list(0, Some(0)).unwrap().limit, 1);
}

#[test]
fn trash_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let keep = service
        .create_entry(&draft("Keep", "", Mood::Inspired, &[]), day(2024, 3, 1))
        .unwrap();
    let drop = service
        .create_entry(&draft("Drop", "", Mood::Inspired, &[]), day(2024, 3, 2))
        .unwrap();

    let err = service.purge_entry(keep.id).unwrap_err();
    assert!(matches!(err, JournalServiceError::EntryNotFound(_)));

    service.delete_entry(keep.id, day(2024, 3, 3)).unwrap();
    service.delete_entry(drop.id, day(2024, 3, 3)).unwrap();
    assert_eq!(service.list(0, None).unwrap().total, 0);
    assert_eq!(service.list_trash(0, None).unwrap().total, 2);
    assert!(matches!(
        service.get_entry(keep.id).unwrap_err(),
        JournalServiceError::EntryNotFound(_)
    ));

    let restored = service.restore_entry(keep.id, day(2024, 3, 4)).unwrap();
    assert!(!restored.is_deleted);
    assert!(matches!(
        service.restore_entry(keep.id, day(2024, 3, 4)).unwrap_err(),
        JournalServiceError::EntryNotFound(_)
    ));

    assert_eq!(service.empty_trash().unwrap(), 1);
    assert_eq!(service.list_trash(0, None).unwrap().total, 0);
    assert_eq!(service.list(0, None).unwrap().total, 1);
}

#[test]
fn search_matches_all_words_and_skips_trash() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let hike = service
        .create_entry(
            &draft("Mountain hike", "Long climb with a great view", Mood::Inspired, &["outdoors"]),
            day(2024, 3, 1),
        )
        .unwrap();
    service
        .create_entry(
            &draft("Desk day", "Long meetings and no view", Mood::Challenging, &[]),
            day(2024, 3, 2),
        )
        .unwrap();
    let trashed = service
        .create_entry(
            &draft("Old climb", "Another climb with a view", Mood::Inspired, &[]),
            day(2024, 3, 3),
        )
        .unwrap();
    service.delete_entry(trashed.id, day(2024, 3, 4)).unwrap();

    let results = service.search("climb view", None).unwrap();
    assert_eq!(results.total, 1);
    assert_eq!(results.results[0].entry.id, hike.id);
    assert_eq!(results.query, "climb view");

    let by_tag = service.search("outdoors", None).unwrap();
    assert_eq!(by_tag.total, 1);

    let blank = service.search("   ", None).unwrap();
    assert!(blank.results.is_empty());
    assert_eq!(blank.total, 0);
}

#[test]
fn search_treats_operators_as_plain_text() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service
        .create_entry(&draft("Notes", "plain words only", Mood::Reflective, &[]), day(2024, 3, 1))
        .unwrap();

    let results = service.search("\"words\" OR NEAR(", None).unwrap();
    assert!(results.results.is_empty());
}

#[test]
fn on_this_day_returns_earlier_years_only() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let two_years_ago = service
        .create_entry(&draft("2022", "", Mood::Reflective, &[]), day(2022, 3, 15))
        .unwrap();
    let last_year = service
        .create_entry(&draft("2023", "", Mood::Reflective, &[]), day(2023, 3, 15))
        .unwrap();
    service
        .create_entry(&draft("Today", "", Mood::Reflective, &[]), day(2024, 3, 15))
        .unwrap();
    service
        .create_entry(&draft("Other day", "", Mood::Reflective, &[]), day(2023, 3, 16))
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let found = service.on_this_day(date).unwrap();

    let ids: Vec<Uuid> = found.entries.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![last_year.id, two_years_ago.id]);
    assert_eq!(found.date, date);
}

#[test]
fn insights_summarize_moods_streaks_and_tags() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service
        .create_entry(&draft("One", "one two three", Mood::Inspired, &["work"]), day(2024, 3, 13))
        .unwrap();
    service
        .create_entry(&draft("Two", "four five", Mood::Inspired, &["work", "family"]), day(2024, 3, 14))
        .unwrap();
    service
        .create_entry(&draft("Three", "six", Mood::Challenging, &["family", "work"]), day(2024, 3, 15))
        .unwrap();
    service
        .create_entry(&draft("Earlier", "", Mood::Optimistic, &[]), day(2024, 2, 1))
        .unwrap();

    let insights = service.insights(day(2024, 3, 15)).unwrap();

    assert_eq!(insights.total_entries, 4);
    assert_eq!(insights.entries_this_month, 3);
    assert_eq!(insights.most_common_mood, Some(Mood::Inspired));
    assert_eq!(insights.mood_distribution[&Mood::Reflective], 0);
    assert_eq!(insights.current_streak, 3);
    assert_eq!(insights.longest_streak, 3);
    assert_eq!(insights.total_words, 6);
    assert_eq!(insights.average_words, 1.5);
    assert_eq!(insights.top_tags[0].tag, "work");
    assert_eq!(insights.top_tags[0].count, 3);
}

#[test]
fn update_replaces_tags_and_keeps_other_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let entry = service
        .create_entry(&draft("Plan", "Body", Mood::Optimistic, &["a"]), day(2024, 3, 1))
        .unwrap();

    let updated = service
        .update_entry(
            entry.id,
            &JournalPatch {
                tags: Some(vec!["B".to_string()]),
                ..JournalPatch::default()
            },
            day(2024, 3, 2),
        )
        .unwrap();

    assert_eq!(updated.tags, vec!["b"]);
    assert_eq!(updated.title, "Plan");
    assert_eq!(updated.updated_at, day(2024, 3, 2));
    assert_eq!(service.get_entry(entry.id).unwrap().tags, vec!["b"]);
}

#[test]
fn builtin_templates_seed_once_and_resist_deletion() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert_eq!(service.seed_builtin_templates(day(2024, 3, 1)).unwrap(), 3);
    assert_eq!(service.seed_builtin_templates(day(2024, 3, 2)).unwrap(), 0);

    let templates = service.list_templates().unwrap();
    assert_eq!(templates.len(), 3);
    let builtin = templates.iter().find(|template| template.is_builtin).unwrap();
    let err = service.delete_template(builtin.id).unwrap_err();
    assert!(matches!(err, JournalServiceError::BuiltinTemplate(_)));

    let custom = service
        .create_template(
            &TemplateDraft {
                name: "Focus".to_string(),
                description: String::new(),
                prompts: vec!["What matters most?".to_string()],
            },
            day(2024, 3, 3),
        )
        .unwrap();
    assert!(!custom.is_builtin);
    assert_eq!(service.get_template(custom.id).unwrap().prompts, custom.prompts);

    let mut with_template = draft("Focused", "", Mood::Reflective, &[]);
    with_template.template_id = Some(custom.id);
    let entry = service.create_entry(&with_template, day(2024, 3, 3)).unwrap();
    assert_eq!(entry.template_id, Some(custom.id));

    service.delete_template(custom.id).unwrap();
    assert!(matches!(
        service.get_template(custom.id).unwrap_err(),
        JournalServiceError::TemplateNotFound(_)
    ));
}
