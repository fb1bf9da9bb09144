//! Input normalization and validation rules shared by all record types.
//!
//! # Invariants
//! - Sanitized text never contains HTML tags, line breaks or repeated spaces.
//! - Length limits are counted in `char`s after sanitizing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length of names (pillar, area, project, task, template).
pub const MAX_NAME_CHARS: usize = 100;
/// Maximum length of descriptions.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Maximum icon length (emoji sequences count as several chars).
pub const MAX_ICON_CHARS: usize = 10;
/// Color used when callers leave the color empty.
pub const DEFAULT_COLOR: &str = "#000000";

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));
static HHMM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid time regex"));

/// Validation failure for user-provided record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is blank after sanitizing.
    Blank { field: &'static str },
    /// Text exceeds its maximum length.
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// Color is not `#RRGGBB`.
    InvalidColor(String),
    /// Integer is outside its allowed range.
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },
    /// Pillar weight is outside `0.1..=2.0`.
    WeightOutOfRange(f64),
    /// Time of day is not `HH:MM`.
    InvalidTimeOfDay { field: &'static str, value: String },
    /// Project deadline is earlier than creation time.
    DeadlineInPast,
    /// Task due date is too far in the future.
    DueDateTooFar,
    /// Task lists itself as a dependency.
    SelfDependency,
    /// Tag input contains a blank value.
    BlankTag,
    /// Template has no prompts.
    EmptyPrompts,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} exceeds {max} characters (got {actual})")
            }
            Self::InvalidColor(value) => {
                write!(f, "invalid color `{value}`; expected #RRGGBB")
            }
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "{field} must be within {min}..={max} (got {actual})"),
            Self::WeightOutOfRange(value) => {
                write!(f, "pillar weight must be within 0.1..=2.0 (got {value})")
            }
            Self::InvalidTimeOfDay { field, value } => {
                write!(f, "{field} must be HH:MM (got `{value}`)")
            }
            Self::DeadlineInPast => write!(f, "deadline cannot be in the past"),
            Self::DueDateTooFar => write!(f, "due date too far in the future"),
            Self::SelfDependency => write!(f, "task cannot depend on itself"),
            Self::BlankTag => write!(f, "tags must not be blank"),
            Self::EmptyPrompts => write!(f, "template needs at least one prompt"),
        }
    }
}

impl Error for ValidationError {}

/// Strips HTML tags and collapses whitespace.
pub fn sanitize_text(value: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(value, "");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Normalizes a required display name.
pub fn normalize_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let sanitized = sanitize_text(value);
    if sanitized.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    check_length(field, &sanitized, MAX_NAME_CHARS)?;
    Ok(sanitized)
}

/// Normalizes an optional description; blank input becomes empty string.
pub fn normalize_description(value: &str) -> Result<String, ValidationError> {
    let sanitized = sanitize_text(value);
    check_length("description", &sanitized, MAX_DESCRIPTION_CHARS)?;
    Ok(sanitized)
}

/// Normalizes a hex color to uppercase. Blank input maps to [`DEFAULT_COLOR`].
pub fn normalize_color(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_COLOR.to_string());
    }
    if !HEX_COLOR_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidColor(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Normalizes an icon, falling back to `default` when blank.
pub fn normalize_icon(value: &str, default: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(default.to_string());
    }
    check_length("icon", trimmed, MAX_ICON_CHARS)?;
    Ok(trimmed.to_string())
}

pub fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

pub fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            actual: value,
        });
    }
    Ok(())
}

/// Parses `HH:MM` into minutes since midnight.
pub fn parse_time_of_day(field: &'static str, value: &str) -> Result<u32, ValidationError> {
    let trimmed = value.trim();
    let caps = HHMM_RE
        .captures(trimmed)
        .ok_or_else(|| ValidationError::InvalidTimeOfDay {
            field,
            value: trimmed.to_string(),
        })?;
    let hours: u32 = caps[1].parse().unwrap_or(0);
    let minutes: u32 = caps[2].parse().unwrap_or(0);
    Ok(hours * 60 + minutes)
}

/// Lowercases, trims, deduplicates and sorts tags. Blank tags are rejected.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        let normalized = tag.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::BlankTag);
        }
        unique.insert(normalized);
    }
    Ok(unique.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_tags_and_collapses_whitespace() {
        assert_eq!(
            sanitize_text("  <b>Health</b>\n\n and   <i>Fitness</i> "),
            "Health and Fitness"
        );
    }

    #[test]
    fn name_rejects_blank_and_markup_only_input() {
        assert_eq!(
            normalize_name("name", "<br/>  ").unwrap_err(),
            ValidationError::Blank { field: "name" }
        );
    }

    #[test]
    fn name_counts_chars_not_bytes() {
        let name = "é".repeat(MAX_NAME_CHARS);
        assert!(normalize_name("name", &name).is_ok());
        let too_long = "é".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            normalize_name("name", &too_long),
            Err(ValidationError::TooLong { actual: 101, .. })
        ));
    }

    #[test]
    fn color_defaults_and_uppercases() {
        assert_eq!(normalize_color("").unwrap(), DEFAULT_COLOR);
        assert_eq!(normalize_color("#f4b400").unwrap(), "#F4B400");
        assert!(normalize_color("f4b400").is_err());
        assert!(normalize_color("#F4B40").is_err());
    }

    #[test]
    fn time_of_day_parses_valid_values_only() {
        assert_eq!(parse_time_of_day("due_time", "00:00").unwrap(), 0);
        assert_eq!(parse_time_of_day("due_time", "23:59").unwrap(), 23 * 60 + 59);
        assert!(parse_time_of_day("due_time", "24:00").is_err());
        assert!(parse_time_of_day("due_time", "9:30").is_err());
    }

    #[test]
    fn tags_are_normalized_and_blank_rejected() {
        let tags = vec!["Work".to_string(), " work ".to_string(), "focus".to_string()];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["focus", "work"]);
        assert_eq!(
            normalize_tags(&["ok".to_string(), "  ".to_string()]).unwrap_err(),
            ValidationError::BlankTag
        );
    }
}
