//! Export/import: a per-table JSONL dump/restore, used to move a
//! repository's index between machines without a running server.

use crate::error::{KotaError, Result};
use crate::scanner::hash_content;
use crate::store::Store;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

const TABLES: &[&str] = &[
    "repositories",
    "index_jobs",
    "indexed_files",
    "symbols",
    "refs",
    "dependency_edges",
    "memory_records",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Insert-or-ignore: existing rows win.
    Merge,
    /// Truncate each table before inserting the dump's rows.
    Replace,
}

fn table_rows_as_json(store: &Store, table: &str) -> Result<Vec<Value>> {
    store.read(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {table}"))?;
        let column_count = stmt.column_count();
        let column_names: Vec<String> = (0..column_count)
            .map(|i| stmt.column_name(i).unwrap_or("").to_string())
            .collect();
        let rows = stmt
            .query_map([], |row| {
                let mut obj = serde_json::Map::new();
                for (idx, name) in column_names.iter().enumerate() {
                    let value: Value = match row.get_ref(idx)? {
                        rusqlite::types::ValueRef::Null => Value::Null,
                        rusqlite::types::ValueRef::Integer(i) => Value::from(i),
                        rusqlite::types::ValueRef::Real(f) => {
                            serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                        }
                        rusqlite::types::ValueRef::Text(t) => {
                            Value::String(String::from_utf8_lossy(t).to_string())
                        }
                        rusqlite::types::ValueRef::Blob(_) => Value::Null,
                    };
                    obj.insert(name.clone(), value);
                }
                Ok(Value::Object(obj))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Writes one `<table>.jsonl` file per table under `dest_dir`. A table whose
/// content hash matches the last export (tracked via a `.manifest.json`
/// sidecar) is skipped unless `force`.
pub fn export_to_dir(store: &Store, dest_dir: &Path, force: bool) -> Result<Vec<String>> {
    std::fs::create_dir_all(dest_dir)?;
    let manifest_path = dest_dir.join(".manifest.json");
    let mut manifest: HashMap<String, String> = std::fs::read_to_string(&manifest_path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    let mut written = Vec::new();
    for &table in TABLES {
        let rows = table_rows_as_json(store, table)?;
        let mut buf = Vec::new();
        for row in &rows {
            buf.extend_from_slice(serde_json::to_string(row).unwrap_or_default().as_bytes());
            buf.push(b'\n');
        }
        let content_hash = hash_content(&buf);

        if !force && manifest.get(table) == Some(&content_hash) {
            continue;
        }

        let file_path = dest_dir.join(format!("{table}.jsonl"));
        let mut file = std::fs::File::create(&file_path)?;
        file.write_all(&buf)?;
        manifest.insert(table.to_string(), content_hash);
        written.push(table.to_string());
    }

    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(written)
}

/// Per-table row import result: rows applied and rows that failed, with
/// the error recorded per row rather than aborting the whole table.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub applied: usize,
    pub row_errors: Vec<String>,
}

pub fn import_from_dir(
    store: &Store,
    src_dir: &Path,
    mode: ImportMode,
) -> Result<HashMap<String, ImportReport>> {
    let mut reports = HashMap::new();

    for &table in TABLES {
        let file_path = src_dir.join(format!("{table}.jsonl"));
        let Ok(content) = std::fs::read_to_string(&file_path) else {
            continue;
        };

        let mut report = ImportReport::default();
        store.transaction(|conn| {
            if mode == ImportMode::Replace {
                conn.execute(&format!("DELETE FROM {table}"), [])?;
            }
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let row: Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(e) => {
                        report.row_errors.push(e.to_string());
                        continue;
                    }
                };
                match insert_row(conn, table, &row) {
                    Ok(()) => report.applied += 1,
                    Err(e) => report.row_errors.push(e.to_string()),
                }
            }
            Ok(())
        })?;
        reports.insert(table.to_string(), report);
    }

    Ok(reports)
}

fn insert_row(conn: &rusqlite::Connection, table: &str, row: &Value) -> Result<()> {
    let Value::Object(map) = row else {
        return Err(KotaError::InvalidArgument("row is not a JSON object".into()));
    };
    let columns: Vec<&String> = map.keys().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT OR IGNORE INTO {table} ({}) VALUES ({})",
        columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
        placeholders.join(", ")
    );
    let params: Vec<Box<dyn rusqlite::ToSql>> = columns
        .iter()
        .map(|c| -> Box<dyn rusqlite::ToSql> {
            match &map[*c] {
                Value::Null => Box::new(None::<String>),
                Value::Bool(b) => Box::new(*b as i64),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Box::new(i)
                    } else {
                        Box::new(n.as_f64().unwrap_or(0.0))
                    }
                }
                Value::String(s) => Box::new(s.clone()),
                other => Box::new(other.to_string()),
            }
        })
        .collect();
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice())?;
    Ok(())
}
