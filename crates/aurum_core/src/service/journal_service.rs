//! Journal use-case service.
//!
//! # Responsibility
//! - Entry CRUD with sanitized input and the trash lifecycle.
//! - Paging, full-text search, on-this-day lookup and insights.
//! - Built-in template seeding and template management.
//!
//! # Invariants
//! - Page size defaults to 20 and is clamped to `1..=100`.
//! - Built-in templates are seeded once by name and cannot be deleted.
//! - An entry may only reference an existing template.

use crate::analytics::journal_insights::{compute_insights, JournalInsights};
use crate::model::journal::{
    JournalDraft, JournalEntry, JournalEntryId, JournalPatch, JournalTemplate, TemplateDraft,
    TemplateId,
};
use crate::model::validate::ValidationError;
use crate::repo::journal_repo::JournalRepository;
use crate::repo::RepoError;
use crate::search::fts::{SearchError, SearchQuery};
use crate::time::start_of_day;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Built-in templates as `(name, description, prompts)`.
const BUILTIN_TEMPLATES: [(&str, &str, &[&str]); 3] = [
    (
        "Daily Reflection",
        "Look back on the day and what it taught you.",
        &[
            "What went well today?",
            "What was challenging, and how did you respond?",
            "What will you do differently tomorrow?",
        ],
    ),
    (
        "Gratitude",
        "Notice the good things, big and small.",
        &[
            "Three things I am grateful for today:",
            "Someone who made a difference to me recently:",
        ],
    ),
    (
        "Weekly Review",
        "Check in on your pillars and plan the week ahead.",
        &[
            "Which pillar received the most attention this week?",
            "Which pillar was neglected, and why?",
            "What is the one priority for next week?",
        ],
    ),
];

#[derive(Debug)]
pub enum JournalServiceError {
    Validation(ValidationError),
    EntryNotFound(JournalEntryId),
    TemplateNotFound(TemplateId),
    /// Built-in templates cannot be removed.
    BuiltinTemplate(TemplateId),
    Search(SearchError),
    Repo(RepoError),
}

impl Display for JournalServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::EntryNotFound(id) => write!(f, "journal entry not found: {id}"),
            Self::TemplateNotFound(id) => write!(f, "journal template not found: {id}"),
            Self::BuiltinTemplate(id) => write!(f, "built-in template cannot be deleted: {id}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for JournalServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for JournalServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SearchError> for JournalServiceError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

impl From<RepoError> for JournalServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "journal entry" | "trashed journal entry",
                id,
            } => Self::EntryNotFound(id),
            RepoError::NotFound {
                entity: "template",
                id,
            } => Self::TemplateNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type JournalServiceResult<T> = Result<T, JournalServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalPage {
    pub entries: Vec<JournalEntry>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalSearchHit {
    pub entry: JournalEntry,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalSearchResults {
    pub results: Vec<JournalSearchHit>,
    pub query: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnThisDay {
    pub entries: Vec<JournalEntry>,
    pub date: NaiveDate,
}

pub struct JournalService<R: JournalRepository> {
    repo: R,
}

impl<R: JournalRepository> JournalService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_entry(&self, draft: &JournalDraft, now: i64) -> JournalServiceResult<JournalEntry> {
        if let Some(template_id) = draft.template_id {
            self.require_template(template_id)?;
        }
        let entry = JournalEntry::from_draft(draft, now)?;
        self.repo.insert_entry(&entry)?;
        info!(
            "event=journal_create module=journal status=ok entry_id={} tags={}",
            entry.id,
            entry.tags.len()
        );
        Ok(entry)
    }

    pub fn update_entry(
        &self,
        id: JournalEntryId,
        patch: &JournalPatch,
        now: i64,
    ) -> JournalServiceResult<JournalEntry> {
        let mut entry = self.require_entry(id)?;
        entry.apply_patch(patch, now)?;
        self.repo.update_entry(&entry)?;
        Ok(entry)
    }

    pub fn get_entry(&self, id: JournalEntryId) -> JournalServiceResult<JournalEntry> {
        self.require_entry(id)
    }

    /// Newest-first page of active entries.
    pub fn list(&self, skip: u32, limit: Option<u32>) -> JournalServiceResult<JournalPage> {
        let limit = clamp_limit(limit);
        let page = self.repo.list_entries(skip, limit)?;
        Ok(JournalPage {
            entries: page.entries,
            total: page.total,
            skip,
            limit,
        })
    }

    pub fn list_trash(&self, skip: u32, limit: Option<u32>) -> JournalServiceResult<JournalPage> {
        let limit = clamp_limit(limit);
        let page = self.repo.list_trash(skip, limit)?;
        Ok(JournalPage {
            entries: page.entries,
            total: page.total,
            skip,
            limit,
        })
    }

    /// Moves an entry to the trash.
    pub fn delete_entry(&self, id: JournalEntryId, now: i64) -> JournalServiceResult<()> {
        self.repo.soft_delete_entry(id, now)?;
        info!("event=journal_trash module=journal status=ok entry_id={id}");
        Ok(())
    }

    pub fn restore_entry(&self, id: JournalEntryId, now: i64) -> JournalServiceResult<JournalEntry> {
        self.repo.restore_entry(id, now)?;
        self.require_entry(id)
    }

    /// Permanently removes one trashed entry.
    pub fn purge_entry(&self, id: JournalEntryId) -> JournalServiceResult<()> {
        self.repo.purge_entry(id)?;
        info!("event=journal_purge module=journal status=ok entry_id={id}");
        Ok(())
    }

    pub fn empty_trash(&self) -> JournalServiceResult<usize> {
        let purged = self.repo.purge_trash()?;
        info!("event=journal_purge module=journal status=ok purged={purged}");
        Ok(purged)
    }

    /// Keyword search. A blank query yields an empty result.
    pub fn search(&self, query: &str, limit: Option<u32>) -> JournalServiceResult<JournalSearchResults> {
        let query_text = query.trim().to_string();
        let mut search = SearchQuery::new(query_text.clone());
        search.limit = clamp_limit(limit);
        let page = self.repo.search_entries(&search)?;

        let mut results = Vec::with_capacity(page.hits.len());
        for hit in page.hits {
            if let Some(entry) = self.repo.get_entry(hit.entry_id, false)? {
                results.push(JournalSearchHit {
                    entry,
                    snippet: hit.snippet,
                });
            }
        }
        Ok(JournalSearchResults {
            results,
            query: query_text,
            total: page.total,
        })
    }

    /// Entries written on the same month and day in earlier years.
    pub fn on_this_day(&self, date: NaiveDate) -> JournalServiceResult<OnThisDay> {
        let month_day = date.format("%m-%d").to_string();
        let entries = self
            .repo
            .list_entries_on_month_day(&month_day, start_of_day(date))?;
        Ok(OnThisDay { entries, date })
    }

    pub fn insights(&self, now: i64) -> JournalServiceResult<JournalInsights> {
        let entries = self.repo.list_all_entries()?;
        Ok(compute_insights(&entries, now))
    }

    /// Inserts any missing built-in template. Returns how many were added.
    pub fn seed_builtin_templates(&self, now: i64) -> JournalServiceResult<usize> {
        let mut seeded = 0;
        for (name, description, prompts) in BUILTIN_TEMPLATES {
            if self.repo.find_builtin_template(name)?.is_some() {
                continue;
            }
            let draft = TemplateDraft {
                name: name.to_string(),
                description: description.to_string(),
                prompts: prompts.iter().map(|prompt| prompt.to_string()).collect(),
            };
            self.repo
                .insert_template(&JournalTemplate::from_draft(&draft, true, now)?)?;
            seeded += 1;
        }
        if seeded > 0 {
            info!("event=template_seed module=journal status=ok seeded={seeded}");
        }
        Ok(seeded)
    }

    pub fn create_template(&self, draft: &TemplateDraft, now: i64) -> JournalServiceResult<JournalTemplate> {
        let template = JournalTemplate::from_draft(draft, false, now)?;
        self.repo.insert_template(&template)?;
        Ok(template)
    }

    pub fn get_template(&self, id: TemplateId) -> JournalServiceResult<JournalTemplate> {
        self.require_template(id)
    }

    pub fn list_templates(&self) -> JournalServiceResult<Vec<JournalTemplate>> {
        Ok(self.repo.list_templates()?)
    }

    pub fn delete_template(&self, id: TemplateId) -> JournalServiceResult<()> {
        let template = self.require_template(id)?;
        if template.is_builtin {
            return Err(JournalServiceError::BuiltinTemplate(id));
        }
        self.repo.delete_template(id)?;
        Ok(())
    }

    fn require_entry(&self, id: JournalEntryId) -> JournalServiceResult<JournalEntry> {
        self.repo
            .get_entry(id, false)?
            .ok_or(JournalServiceError::EntryNotFound(id))
    }

    fn require_template(&self, id: TemplateId) -> JournalServiceResult<JournalTemplate> {
        self.repo
            .get_template(id)?
            .ok_or(JournalServiceError::TemplateNotFound(id))
    }
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_and_clamps() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
        assert_eq!(clamp_limit(Some(35)), 35);
    }

    #[test]
    fn builtin_templates_are_valid_drafts() {
        for (name, description, prompts) in BUILTIN_TEMPLATES {
            let draft = TemplateDraft {
                name: name.to_string(),
                description: description.to_string(),
                prompts: prompts.iter().map(|prompt| prompt.to_string()).collect(),
            };
            let template = JournalTemplate::from_draft(&draft, true, 0).unwrap();
            assert!(template.is_builtin);
            assert_eq!(template.prompts.len(), prompts.len());
        }
    }
}
