//! Full-text code search: BM25-ranked matches over `indexed_files_fts`,
//! with `<mark>`-wrapped snippets.

use crate::error::Result;
use crate::store::Store;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub file_id: String,
    pub repository_id: String,
    pub path: String,
    pub language: String,
    pub snippet: String,
    pub score: f64,
}

/// Escapes an arbitrary user query into a safe FTS5 MATCH expression: every
/// token becomes its own quoted phrase (disabling FTS5 operators like `NOT`,
/// `AND`, `*`, `-`) joined by `OR`, so results favor any-term matches the
/// way a code search bar is expected to behave.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// BM25-ranked search across a repository's indexed files. `limit` is
/// clamped to `[1, 100]` (default 20 when `None`).
pub fn search_code(
    store: &Store,
    repository_id: &str,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<SearchHit>> {
    let limit = limit.unwrap_or(20).clamp(1, 100);
    let match_expr = escape_fts_query(query);
    if match_expr.is_empty() {
        return Ok(Vec::new());
    }

    store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT f.id, f.repository_id, f.path, f.language,
                    snippet(indexed_files_fts, 0, '<mark>', '</mark>', '...', 32) AS snippet,
                    bm25(indexed_files_fts) AS score
             FROM indexed_files_fts
             JOIN indexed_files f ON f.rowid = indexed_files_fts.rowid
             WHERE indexed_files_fts MATCH ?1 AND f.repository_id = ?2
             ORDER BY score ASC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![match_expr, repository_id, limit], |row| {
                Ok(SearchHit {
                    file_id: row.get(0)?,
                    repository_id: row.get(1)?,
                    path: row.get(2)?,
                    language: row.get(3)?,
                    snippet: row.get(4)?,
                    score: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_operators_as_literal_phrases() {
        let escaped = escape_fts_query("foo AND NOT bar*");
        assert_eq!(escaped, "\"foo\" OR \"AND\" OR \"NOT\" OR \"bar*\"");
    }

    #[test]
    fn escapes_embedded_quotes() {
        let escaped = escape_fts_query("a\"b");
        assert_eq!(escaped, "\"a\"\"b\"");
    }
}
