//! Journal entry/template repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist journal entries, their tag links and templates.
//! - Own the trash lifecycle (soft delete, restore, purge).
//!
//! # Invariants
//! - Entry tag links are replaced as a whole with the entry row.
//! - `tags_text` mirrors the linked tags so FTS triggers index them.
//! - Listing is deterministic: `created_at DESC, id ASC`.

use crate::model::journal::{JournalEntry, JournalEntryId, JournalTemplate, Mood, TemplateId};
use crate::repo::{
    bool_to_int, ensure_connection_ready, invalid_enum, parse_bool, parse_optional_uuid,
    parse_uuid, RepoError, RepoResult,
};
use crate::search::fts::{search_journal, SearchPage, SearchQuery, SearchResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    mood,
    template_id,
    is_deleted,
    created_at,
    updated_at
FROM journal_entries";

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    prompts,
    is_builtin,
    created_at,
    updated_at
FROM journal_templates";

/// One page of entries with the unpaginated total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<JournalEntry>,
    pub total: u64,
}

/// Repository interface for journal operations.
pub trait JournalRepository {
    fn insert_entry(&self, entry: &JournalEntry) -> RepoResult<()>;
    fn update_entry(&self, entry: &JournalEntry) -> RepoResult<()>;
    fn get_entry(&self, id: JournalEntryId, include_deleted: bool) -> RepoResult<Option<JournalEntry>>;
    fn list_entries(&self, skip: u32, limit: u32) -> RepoResult<EntryPage>;
    fn list_trash(&self, skip: u32, limit: u32) -> RepoResult<EntryPage>;
    /// Every active entry, oldest first.
    fn list_all_entries(&self) -> RepoResult<Vec<JournalEntry>>;
    /// Active entries whose UTC `MM-DD` equals `month_day`, created before `before`.
    fn list_entries_on_month_day(&self, month_day: &str, before: i64) -> RepoResult<Vec<JournalEntry>>;
    fn soft_delete_entry(&self, id: JournalEntryId, now: i64) -> RepoResult<()>;
    fn restore_entry(&self, id: JournalEntryId, now: i64) -> RepoResult<()>;
    /// Permanently removes a trashed entry.
    fn purge_entry(&self, id: JournalEntryId) -> RepoResult<()>;
    /// Permanently removes every trashed entry and returns the count.
    fn purge_trash(&self) -> RepoResult<usize>;
    /// Full-text search over active entries.
    fn search_entries(&self, query: &SearchQuery) -> SearchResult<SearchPage>;

    fn insert_template(&self, template: &JournalTemplate) -> RepoResult<()>;
    fn get_template(&self, id: TemplateId) -> RepoResult<Option<JournalTemplate>>;
    fn find_builtin_template(&self, name: &str) -> RepoResult<Option<JournalTemplate>>;
    fn list_templates(&self) -> RepoResult<Vec<JournalTemplate>>;
    fn delete_template(&self, id: TemplateId) -> RepoResult<()>;
}

/// SQLite-backed journal repository.
pub struct SqliteJournalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJournalRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_entries(&self, sql: &str, bind: impl rusqlite::Params) -> RepoResult<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entry = parse_entry_row(row)?;
            entry.tags = load_tags_for_entry(self.conn, entry.id)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn page(&self, deleted: bool, skip: u32, limit: u32) -> RepoResult<EntryPage> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM journal_entries WHERE is_deleted = ?1;",
            [bool_to_int(deleted)],
            |row| row.get(0),
        )?;
        let entries = self.query_entries(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE is_deleted = ?1
                 ORDER BY created_at DESC, id ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![bool_to_int(deleted), i64::from(limit), i64::from(skip)],
        )?;
        Ok(EntryPage {
            entries,
            total: total.max(0) as u64,
        })
    }

    fn set_deleted(&self, id: JournalEntryId, deleted: bool, now: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE journal_entries
             SET is_deleted = ?2,
                 updated_at = ?3
             WHERE id = ?1
               AND is_deleted = ?4;",
            params![
                id.to_string(),
                bool_to_int(deleted),
                now,
                bool_to_int(!deleted)
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "journal entry",
                id,
            });
        }
        Ok(())
    }
}

impl JournalRepository for SqliteJournalRepository<'_> {
    fn insert_entry(&self, entry: &JournalEntry) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO journal_entries (
                id,
                title,
                content,
                mood,
                tags_text,
                template_id,
                is_deleted,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                entry.id.to_string(),
                entry.title.as_str(),
                entry.content.as_str(),
                entry.mood.as_str(),
                entry.tags_text(),
                entry.template_id.map(|id| id.to_string()),
                bool_to_int(entry.is_deleted),
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        replace_entry_tags(&tx, entry.id, &entry.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn update_entry(&self, entry: &JournalEntry) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE journal_entries
             SET
                title = ?2,
                content = ?3,
                mood = ?4,
                tags_text = ?5,
                template_id = ?6,
                updated_at = ?7
             WHERE id = ?1
               AND is_deleted = 0;",
            params![
                entry.id.to_string(),
                entry.title.as_str(),
                entry.content.as_str(),
                entry.mood.as_str(),
                entry.tags_text(),
                entry.template_id.map(|id| id.to_string()),
                entry.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "journal entry",
                id: entry.id,
            });
        }
        replace_entry_tags(&tx, entry.id, &entry.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn get_entry(&self, id: JournalEntryId, include_deleted: bool) -> RepoResult<Option<JournalEntry>> {
        let entries = self.query_entries(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE id = ?1
                   AND (?2 = 1 OR is_deleted = 0);"
            ),
            params![id.to_string(), bool_to_int(include_deleted)],
        )?;
        Ok(entries.into_iter().next())
    }

    fn list_entries(&self, skip: u32, limit: u32) -> RepoResult<EntryPage> {
        self.page(false, skip, limit)
    }

    fn list_trash(&self, skip: u32, limit: u32) -> RepoResult<EntryPage> {
        self.page(true, skip, limit)
    }

    fn list_all_entries(&self) -> RepoResult<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE is_deleted = 0
                 ORDER BY created_at ASC, id ASC;"
            ),
            [],
        )
    }

    fn list_entries_on_month_day(&self, month_day: &str, before: i64) -> RepoResult<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE is_deleted = 0
                   AND strftime('%m-%d', created_at / 1000, 'unixepoch') = ?1
                   AND created_at < ?2
                 ORDER BY created_at DESC, id ASC;"
            ),
            params![month_day, before],
        )
    }

    fn soft_delete_entry(&self, id: JournalEntryId, now: i64) -> RepoResult<()> {
        self.set_deleted(id, true, now)
    }

    fn restore_entry(&self, id: JournalEntryId, now: i64) -> RepoResult<()> {
        self.set_deleted(id, false, now)
    }

    fn purge_entry(&self, id: JournalEntryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM journal_entries
             WHERE id = ?1
               AND is_deleted = 1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "trashed journal entry",
                id,
            });
        }
        Ok(())
    }

    fn purge_trash(&self) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM journal_entries WHERE is_deleted = 1;", [])?;
        Ok(removed)
    }

    fn search_entries(&self, query: &SearchQuery) -> SearchResult<SearchPage> {
        search_journal(self.conn, query)
    }

    fn insert_template(&self, template: &JournalTemplate) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO journal_templates (
                id,
                name,
                description,
                prompts,
                is_builtin,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                template.id.to_string(),
                template.name.as_str(),
                template.description.as_str(),
                template.prompts.join("\n"),
                bool_to_int(template.is_builtin),
                template.created_at,
                template.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_template(&self, id: TemplateId) -> RepoResult<Option<JournalTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
        let template = stmt
            .query_row([id.to_string()], |row| Ok(parse_template_row(row)))
            .optional()?;
        template.transpose()
    }

    fn find_builtin_template(&self, name: &str) -> RepoResult<Option<JournalTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL} WHERE is_builtin = 1 AND name = ?1;"
        ))?;
        let template = stmt
            .query_row([name], |row| Ok(parse_template_row(row)))
            .optional()?;
        template.transpose()
    }

    fn list_templates(&self) -> RepoResult<Vec<JournalTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL} ORDER BY is_builtin DESC, name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn delete_template(&self, id: TemplateId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM journal_templates WHERE id = ?1 AND is_builtin = 0;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "template",
                id,
            });
        }
        Ok(())
    }
}

fn replace_entry_tags(tx: &Transaction<'_>, entry_id: JournalEntryId, tags: &[String]) -> RepoResult<()> {
    let entry_text = entry_id.to_string();
    tx.execute(
        "DELETE FROM journal_entry_tags WHERE entry_id = ?1;",
        [entry_text.as_str()],
    )?;
    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO journal_tags (name) VALUES (?1);",
            [tag.as_str()],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO journal_entry_tags (entry_id, tag_id)
             SELECT ?1, id
             FROM journal_tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![entry_text.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

fn load_tags_for_entry(conn: &Connection, entry_id: JournalEntryId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM journal_entry_tags et
         INNER JOIN journal_tags t ON t.id = et.tag_id
         WHERE et.entry_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([entry_id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<JournalEntry> {
    let id_text: String = row.get("id")?;
    let mood_text: String = row.get("mood")?;
    Ok(JournalEntry {
        id: parse_uuid(&id_text, "journal_entries.id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        mood: Mood::parse(&mood_text).ok_or_else(|| invalid_enum(&mood_text, "journal_entries.mood"))?,
        tags: Vec::new(),
        template_id: parse_optional_uuid(row.get("template_id")?, "journal_entries.template_id")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "journal_entries.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<JournalTemplate> {
    let id_text: String = row.get("id")?;
    let prompts_text: String = row.get("prompts")?;
    Ok(JournalTemplate {
        id: parse_uuid(&id_text, "journal_templates.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        prompts: prompts_text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
        is_builtin: parse_bool(row.get("is_builtin")?, "journal_templates.is_builtin")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
