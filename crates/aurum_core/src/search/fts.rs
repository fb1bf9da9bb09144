//! SQLite FTS5-based journal search.
//!
//! # Responsibility
//! - Provide keyword search over journal title, content and tags.
//! - Return typed hits with stable IDs plus the total match count.
//!
//! # Invariants
//! - Only non-deleted entries are returned.
//! - Result ordering is deterministic by rank, `created_at` and id.

use crate::db::DbError;
use crate::model::journal::JournalEntryId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// Query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for journal full-text queries.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text. Each whitespace-separated word must match.
    pub text: String,
    /// Maximum number of hits to return.
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
        }
    }
}

/// Single search hit returned by [`search_journal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub entry_id: JournalEntryId,
    pub snippet: String,
}

/// Ranked hits plus the number of matching entries before `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total: u64,
}

/// Searches journal entries via FTS5.
///
/// Returns an empty page for blank queries.
pub fn search_journal(conn: &Connection, query: &SearchQuery) -> SearchResult<SearchPage> {
    let Some(match_expr) = build_match_expression(&query.text) else {
        return Ok(SearchPage::default());
    };

    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM journal_fts
             JOIN journal_entries e ON e.rowid = journal_fts.rowid
             WHERE journal_fts MATCH ?1
               AND e.is_deleted = 0;",
            [match_expr.as_str()],
            |row| row.get(0),
        )
        .map_err(|err| map_query_error(err, &match_expr))?;

    if query.limit == 0 || total == 0 {
        return Ok(SearchPage {
            hits: Vec::new(),
            total: total.max(0) as u64,
        });
    }

    let sql = "SELECT
            e.id AS id,
            snippet(journal_fts, 1, '[', ']', ' ... ', 10) AS snippet
         FROM journal_fts
         JOIN journal_entries e ON e.rowid = journal_fts.rowid
         WHERE journal_fts MATCH ?
           AND e.is_deleted = 0
         ORDER BY bm25(journal_fts), e.created_at DESC, e.id ASC
         LIMIT ?";
    let bind_values: Vec<Value> = vec![
        Value::Text(match_expr.clone()),
        Value::Integer(i64::from(query.limit)),
    ];

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }

    Ok(SearchPage {
        hits,
        total: total.max(0) as u64,
    })
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let id_text: String = row.get("id")?;
    let entry_id = Uuid::parse_str(&id_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{id_text}`")))?;
    Ok(SearchHit {
        entry_id,
        snippet: row.get("snippet")?,
    })
}

/// Quotes every term so user punctuation never reaches the FTS5 parser.
pub fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::build_match_expression;

    #[test]
    fn blank_text_has_no_expression() {
        assert_eq!(build_match_expression("   \t"), None);
    }

    #[test]
    fn terms_are_quoted_and_joined() {
        assert_eq!(
            build_match_expression(r#"calm "mind""#).as_deref(),
            Some(r#""calm" AND """mind""""#)
        );
    }
}
