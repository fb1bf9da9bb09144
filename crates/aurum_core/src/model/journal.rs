//! Journal entry and template records.
//!
//! # Invariants
//! - Entry tags are lowercase, trimmed, deduplicated and sorted.
//! - Templates always carry at least one non-blank prompt.

use crate::model::validate::{
    check_length, normalize_description, normalize_name, normalize_tags, sanitize_text,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JournalEntryId = Uuid;
pub type TemplateId = Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Mood recorded with an entry. Declaration order is the tie-break order
/// for "most common mood".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Optimistic,
    Inspired,
    #[default]
    Reflective,
    Challenging,
}

impl Mood {
    pub const ALL: [Mood; 4] = [
        Mood::Optimistic,
        Mood::Inspired,
        Mood::Reflective,
        Mood::Challenging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Inspired => "inspired",
            Self::Reflective => "reflective",
            Self::Challenging => "challenging",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Some(Self::Optimistic),
            "inspired" => Some(Self::Inspired),
            "reflective" => Some(Self::Reflective),
            "challenging" => Some(Self::Challenging),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub title: String,
    /// Free text; line breaks are preserved.
    pub content: String,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub template_id: Option<TemplateId>,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub prompts: Vec<String>,
    pub is_builtin: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalDraft {
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub template_id: Option<TemplateId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub prompts: Vec<String>,
}

impl JournalEntry {
    pub fn from_draft(draft: &JournalDraft, now: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: normalize_title(&draft.title)?,
            content: normalize_content(&draft.content)?,
            mood: draft.mood,
            tags: normalize_tags(&draft.tags)?,
            template_id: draft.template_id,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: &JournalPatch, now: i64) -> Result<(), ValidationError> {
        if let Some(title) = patch.title.as_deref() {
            self.title = normalize_title(title)?;
        }
        if let Some(content) = patch.content.as_deref() {
            self.content = normalize_content(content)?;
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(tags) = patch.tags.as_ref() {
            self.tags = normalize_tags(tags)?;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Whitespace-delimited word count of the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Space-joined tags as indexed by full-text search.
    pub fn tags_text(&self) -> String {
        self.tags.join(" ")
    }
}

impl JournalTemplate {
    pub fn from_draft(draft: &TemplateDraft, is_builtin: bool, now: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_name("name", &draft.name)?,
            description: normalize_description(&draft.description)?,
            prompts: normalize_prompts(&draft.prompts)?,
            is_builtin,
            created_at: now,
            updated_at: now,
        })
    }
}

fn normalize_title(value: &str) -> Result<String, ValidationError> {
    let sanitized = sanitize_text(value);
    if sanitized.is_empty() {
        return Err(ValidationError::Blank { field: "title" });
    }
    check_length("title", &sanitized, MAX_TITLE_CHARS)?;
    Ok(sanitized)
}

fn normalize_content(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    check_length("content", trimmed, MAX_CONTENT_CHARS)?;
    Ok(trimmed.to_string())
}

fn normalize_prompts(prompts: &[String]) -> Result<Vec<String>, ValidationError> {
    let cleaned: Vec<String> = prompts
        .iter()
        .map(|prompt| sanitize_text(prompt))
        .filter(|prompt| !prompt.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::EmptyPrompts);
    }
    for prompt in &cleaned {
        check_length("prompt", prompt, crate::model::validate::MAX_DESCRIPTION_CHARS)?;
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_keeps_content_lines_and_normalizes_tags() {
        let draft = JournalDraft {
            title: " <h1>Morning</h1> pages ".to_string(),
            content: "line one\nline two\n".to_string(),
            tags: vec!["Gratitude".to_string(), "gratitude".to_string()],
            ..JournalDraft::default()
        };
        let entry = JournalEntry::from_draft(&draft, 5).unwrap();
        assert_eq!(entry.title, "Morning pages");
        assert_eq!(entry.content, "line one\nline two");
        assert_eq!(entry.tags, vec!["gratitude"]);
        assert_eq!(entry.mood, Mood::Reflective);
        assert_eq!(entry.word_count(), 4);
    }

    #[test]
    fn entry_title_limits_apply() {
        let draft = JournalDraft {
            title: "x".repeat(MAX_TITLE_CHARS + 1),
            ..JournalDraft::default()
        };
        assert!(matches!(
            JournalEntry::from_draft(&draft, 0),
            Err(ValidationError::TooLong { field: "title", .. })
        ));
    }

    #[test]
    fn template_requires_a_prompt() {
        let draft = TemplateDraft {
            name: "Evening".to_string(),
            prompts: vec!["   ".to_string()],
            ..TemplateDraft::default()
        };
        assert_eq!(
            JournalTemplate::from_draft(&draft, false, 0).unwrap_err(),
            ValidationError::EmptyPrompts
        );
    }

    #[test]
    fn mood_order_follows_declaration() {
        assert!(Mood::Optimistic < Mood::Challenging);
        assert_eq!(Mood::parse("Inspired"), Some(Mood::Inspired));
    }
}
