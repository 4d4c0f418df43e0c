//! Migration runner: applies `schema::MIGRATIONS` in order, recording a
//! SHA-256 hash per script in `schema_migrations`.

use crate::error::{KotaError, Result};
use crate::store::schema::MIGRATIONS;
use chrono::Utc;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

fn hash_script(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hex::encode(hasher.finalize())
}

/// Apply every pending migration inside its own transaction. A failure
/// halts further migrations and aborts startup.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // The migrations table itself must exist before we can query it.
    conn.execute_batch(MIGRATIONS[0].1)
        .map_err(|e| KotaError::SchemaError(e.to_string()))?;

    for (name, sql) in MIGRATIONS {
        let hash = hash_script(sql);
        let recorded: Option<String> = conn
            .query_row(
                "SELECT sha256_hash FROM schema_migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .ok();

        match recorded {
            Some(recorded_hash) if recorded_hash == hash => {
                continue; // already applied, identical script
            }
            Some(recorded_hash) => {
                warn!(
                    migration = name,
                    recorded = %recorded_hash,
                    current = %hash,
                    "schema_drift: migration script changed since it was applied"
                );
                // Non-fatal: continue, the script is idempotent so
                // re-running it is safe.
            }
            None => {}
        }

        conn.execute_batch(sql)
            .map_err(|e| KotaError::SchemaError(format!("{name}: {e}")))?;

        conn.execute(
            "INSERT INTO schema_migrations (name, applied_at, sha256_hash) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET applied_at = excluded.applied_at, sha256_hash = excluded.sha256_hash",
            rusqlite::params![name, Utc::now().to_rfc3339(), hash],
        )
        .map_err(|e| KotaError::SchemaError(e.to_string()))?;

        info!(migration = name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let before: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        run_migrations(&conn).unwrap();
        let after: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='indexed_files'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
