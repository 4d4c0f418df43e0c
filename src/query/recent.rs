//! Recent-files listing: the `indexed_at` tail of a repository.

use crate::error::Result;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFile {
    pub file_id: String,
    pub path: String,
    pub language: String,
    pub indexed_at: DateTime<Utc>,
}

pub fn list_recent_files(
    store: &Store,
    repository_id: &str,
    limit: Option<u32>,
) -> Result<Vec<RecentFile>> {
    let limit = limit.unwrap_or(20).clamp(1, 100);
    store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, path, language, indexed_at FROM indexed_files
             WHERE repository_id = ?1
             ORDER BY indexed_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![repository_id, limit], |row| {
                Ok(RecentFile {
                    file_id: row.get(0)?,
                    path: row.get(1)?,
                    language: row.get(2)?,
                    indexed_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
