//! Memory Layer: an append-only log of `Decision` / `Failure` / `Pattern` /
//! `Insight` records, searchable via FTS. Records are never mutated or
//! deleted; a correction is recorded as a new record whose `supersedes`
//! links back to the one it replaces.

use crate::error::{KotaError, Result};
use crate::models::{MemoryKind, MemoryRecord};
use crate::store::Store;
use chrono::Utc;
use uuid::Uuid;

pub fn record(
    store: &Store,
    kind: MemoryKind,
    repository: Option<&str>,
    text: &str,
    related_files: &[String],
    supersedes: Option<&str>,
) -> Result<MemoryRecord> {
    if text.trim().is_empty() {
        return Err(KotaError::InvalidArgument("memory text must not be empty".into()));
    }

    let record = MemoryRecord {
        id: Uuid::new_v4().to_string(),
        kind,
        repository: repository.map(str::to_string),
        text: text.to_string(),
        related_files: related_files.to_vec(),
        supersedes: supersedes.map(str::to_string),
        created_at: Utc::now(),
    };

    store.transaction(|conn| {
        conn.execute(
            "INSERT INTO memory_records (id, kind, repository, text, related_files_json, supersedes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.id,
                record.kind.as_str(),
                record.repository,
                record.text,
                serde_json::to_string(&record.related_files).unwrap_or_else(|_| "[]".to_string()),
                record.supersedes,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })?;

    Ok(record)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let kind_str: String = row.get(1)?;
    let related_json: String = row.get(4)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        kind: MemoryKind::from_str(&kind_str).unwrap_or(MemoryKind::Insight),
        repository: row.get(2)?,
        text: row.get(3)?,
        related_files: serde_json::from_str(&related_json).unwrap_or_default(),
        supersedes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Full-text search over memory records, newest match first within a kind
/// tie, optionally scoped to a repository.
pub fn search_memory(
    store: &Store,
    query: &str,
    kind: Option<MemoryKind>,
    repository: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<MemoryRecord>> {
    let limit = limit.unwrap_or(20).clamp(1, 100);
    let match_expr: String = query
        .split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ");
    if match_expr.is_empty() {
        return Ok(Vec::new());
    }

    store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT m.id, m.kind, m.repository, m.text, m.related_files_json, m.supersedes, m.created_at
             FROM memory_records_fts
             JOIN memory_records m ON m.rowid = memory_records_fts.rowid
             WHERE memory_records_fts MATCH ?1
               AND (?2 IS NULL OR m.kind = ?2)
               AND (?3 IS NULL OR m.repository = ?3)
             ORDER BY m.created_at DESC
             LIMIT ?4",
        )?;
        let rows = stmt
            .query_map(
                rusqlite::params![match_expr, kind.map(|k| k.as_str()), repository, limit],
                row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// The current chain tip for a superseded record, following `supersedes`
/// links forward to whichever record has none pointing at it.
pub fn latest_in_chain(store: &Store, record_id: &str) -> Result<Option<MemoryRecord>> {
    store.read(|conn| {
        let mut current_id = record_id.to_string();
        loop {
            let next: Option<String> = conn
                .query_row(
                    "SELECT id FROM memory_records WHERE supersedes = ?1",
                    [&current_id],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| {
                    if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                        Ok(None)
                    } else {
                        Err(e.into())
                    }
                })?;
            match next {
                Some(id) => current_id = id,
                None => break,
            }
        }

        conn.query_row(
            "SELECT id, kind, repository, text, related_files_json, supersedes, created_at
             FROM memory_records WHERE id = ?1",
            [&current_id],
            row_to_record,
        )
        .map(Some)
        .or_else(|e| {
            if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                Ok(None)
            } else {
                Err(e.into())
            }
        })
    })
}
