//! Per-`IndexJob` pipeline: Acquirer → Scanner → Parser → Extractors →
//! Store, run as an idempotent, incremental operation.

use crate::acquirer::{self, AcquiredTree};
use crate::config::Config;
use crate::error::{KotaError, Result};
use crate::extractors::{extract_references, extract_symbols, resolve_dependencies};
use crate::indexer::retry::with_retry_blocking;
use crate::models::{IndexJob, JobStats, JobStatus, ReferenceType};
use crate::parsing::{CodeParser, SupportedLanguage};
use crate::scanner::{self, ScannedFile};
use crate::store::Store;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct IndexJobRequest {
    pub full_name: String,
    pub git_ref: String,
    pub local_path: Option<std::path::PathBuf>,
}

struct FileWork {
    path: String,
    content_hash: String,
    language: SupportedLanguage,
    size_bytes: u64,
    content_snippet: String,
    diagnostics_json: String,
    symbols: Vec<crate::extractors::symbols::ExtractedSymbol>,
    references: Vec<crate::extractors::references::ExtractedReference>,
}

fn get_or_create_repository(store: &Store, full_name: &str, default_ref: &str) -> Result<String> {
    let existing: Option<String> = store.read(|conn| {
        conn.query_row(
            "SELECT id FROM repositories WHERE full_name = ?1",
            [full_name],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| {
            if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                Ok(None)
            } else {
                Err(e.into())
            }
        })
    })?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    store.transaction(|conn| {
        conn.execute(
            "INSERT INTO repositories (id, full_name, local_path, default_ref, last_indexed_at)
             VALUES (?1, ?2, NULL, ?3, NULL)
             ON CONFLICT(full_name) DO NOTHING",
            rusqlite::params![id, full_name, default_ref],
        )?;
        Ok(())
    })?;

    store.read(|conn| {
        conn.query_row(
            "SELECT id FROM repositories WHERE full_name = ?1",
            [full_name],
            |row| row.get(0),
        )
        .map_err(Into::into)
    })
}

fn insert_job(store: &Store, repository_id: &str, git_ref: &str) -> Result<String> {
    let job_id = Uuid::new_v4().to_string();
    store.transaction(|conn| {
        conn.execute(
            "INSERT INTO index_jobs (id, repository_id, git_ref, status, started_at, stats_json)
             VALUES (?1, ?2, ?3, 'pending', NULL, '{}')",
            rusqlite::params![job_id, repository_id, git_ref],
        )?;
        Ok(())
    })?;
    Ok(job_id)
}

fn set_job_status(store: &Store, job_id: &str, status: JobStatus, error: Option<&str>) -> Result<()> {
    store.transaction(|conn| {
        if status == JobStatus::Processing {
            conn.execute(
                "UPDATE index_jobs SET status = ?1, started_at = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), Utc::now().to_rfc3339(), job_id],
            )?;
        } else {
            conn.execute(
                "UPDATE index_jobs SET status = ?1, finished_at = ?2, error = ?3 WHERE id = ?4",
                rusqlite::params![
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                    error,
                    job_id
                ],
            )?;
        }
        Ok(())
    })
}

fn finish_job(store: &Store, job_id: &str, status: JobStatus, stats: &JobStats, error: Option<&str>) -> Result<()> {
    let stats_json = serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string());
    store.transaction(|conn| {
        conn.execute(
            "UPDATE index_jobs SET status = ?1, finished_at = ?2, error = ?3, stats_json = ?4 WHERE id = ?5",
            rusqlite::params![status.as_str(), Utc::now().to_rfc3339(), error, stats_json, job_id],
        )?;
        Ok(())
    })
}

/// Look up a job's current state, for polling by clients that enqueued an
/// asynchronous run.
pub fn get_job(store: &Store, job_id: &str) -> Result<Option<IndexJob>> {
    store.read(|conn| {
        conn.query_row(
            "SELECT id, repository_id, git_ref, status, started_at, finished_at, error, stats_json
             FROM index_jobs WHERE id = ?1",
            [job_id],
            |row| {
                let status_str: String = row.get(3)?;
                let started_at: Option<String> = row.get(4)?;
                let finished_at: Option<String> = row.get(5)?;
                let stats_json: String = row.get(7)?;
                Ok(IndexJob {
                    id: row.get(0)?,
                    repository_id: row.get(1)?,
                    git_ref: row.get(2)?,
                    status: JobStatus::from_str(&status_str).unwrap_or(JobStatus::Pending),
                    started_at: started_at.and_then(|s| {
                        chrono::DateTime::parse_from_rfc3339(&s)
                            .ok()
                            .map(|d| d.with_timezone(&Utc))
                    }),
                    finished_at: finished_at.and_then(|s| {
                        chrono::DateTime::parse_from_rfc3339(&s)
                            .ok()
                            .map(|d| d.with_timezone(&Utc))
                    }),
                    error: row.get(6)?,
                    stats: serde_json::from_str(&stats_json).unwrap_or_default(),
                })
            },
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

/// Create a `pending` job row without running the pipeline, the fast half
/// of submission, so a caller (the HTTP `/index` handler) can hand back a
/// job id immediately and let a worker run the slow half.
pub fn create_job(store: &Store, req: &IndexJobRequest) -> Result<(String, String)> {
    let repository_id = get_or_create_repository(store, &req.full_name, &req.git_ref)?;
    let job_id = insert_job(store, &repository_id, &req.git_ref)?;
    Ok((job_id, repository_id))
}

/// Run a complete index job synchronously: `pending` through a terminal
/// state, with a guaranteed scratch-tree cleanup on every exit path.
pub fn run_index_job(store: &Store, config: &Config, req: IndexJobRequest) -> Result<IndexJob> {
    let (job_id, repository_id) = create_job(store, &req)?;
    execute_job(store, config, &job_id, &repository_id, req)
}

/// Run the pipeline for a job row already created by [`create_job`].
pub fn execute_job(
    store: &Store,
    config: &Config,
    job_id: &str,
    repository_id: &str,
    req: IndexJobRequest,
) -> Result<IndexJob> {
    set_job_status(store, job_id, JobStatus::Processing, None)?;
    info!(%job_id, repository = %req.full_name, "index job processing");

    let mut acquired: Option<AcquiredTree> = None;
    let outcome = (|| -> Result<(JobStatus, JobStats)> {
        let tree = with_retry_blocking(config.max_retry_attempts, Duration::from_secs(config.retry_base_delay_secs), || {
            acquirer::acquire(
                config,
                &req.full_name,
                &req.git_ref,
                req.local_path.as_deref(),
                job_id,
            )
        })?;
        let root = tree.path.clone();
        acquired = Some(tree);

        run_pipeline(store, config, repository_id, &root)
    })();

    if let Some(tree) = acquired.take() {
        tree.cleanup();
    }

    match outcome {
        Ok((status, stats)) => {
            finish_job(store, job_id, status, &stats, None)?;
            store.transaction(|conn| {
                conn.execute(
                    "UPDATE repositories SET last_indexed_at = ?1 WHERE id = ?2",
                    rusqlite::params![Utc::now().to_rfc3339(), repository_id],
                )?;
                Ok(())
            })?;
            info!(%job_id, status = status.as_str(), "index job finished");
            Ok(IndexJob {
                id: job_id.to_string(),
                repository_id: repository_id.to_string(),
                git_ref: req.git_ref,
                status,
                started_at: Some(Utc::now()),
                finished_at: Some(Utc::now()),
                error: None,
                stats,
            })
        }
        Err(e) => {
            error!(%job_id, error = %e, "index job failed");
            finish_job(store, job_id, JobStatus::Failed, &JobStats::default(), Some(&e.to_string()))?;
            Ok(IndexJob {
                id: job_id.to_string(),
                repository_id: repository_id.to_string(),
                git_ref: req.git_ref,
                status: JobStatus::Failed,
                started_at: Some(Utc::now()),
                finished_at: Some(Utc::now()),
                error: Some(e.to_string()),
                stats: JobStats::default(),
            })
        }
    }
}

fn run_pipeline(
    store: &Store,
    config: &Config,
    repository_id: &str,
    root: &std::path::Path,
) -> Result<(JobStatus, JobStats)> {
    let current = scanner::scan(root, config)?;
    let current_by_path: HashMap<String, &ScannedFile> =
        current.iter().map(|f| (f.relative_path.clone(), f)).collect();

    let prior: Vec<(String, String, String)> = store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, path, content_hash FROM indexed_files WHERE repository_id = ?1",
        )?;
        let rows = stmt
            .query_map([repository_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    let prior_by_path: HashMap<String, (String, String)> = prior
        .into_iter()
        .map(|(id, path, hash)| (path, (id, hash)))
        .collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();
    for file in &current {
        match prior_by_path.get(&file.relative_path) {
            None => added.push(file),
            Some((_, hash)) if hash != &file.content_hash => changed.push(file),
            Some(_) => unchanged.push(file),
        }
    }
    let removed_paths: Vec<&String> = prior_by_path
        .keys()
        .filter(|p| !current_by_path.contains_key(*p))
        .collect();

    if added.is_empty() && changed.is_empty() && removed_paths.is_empty() {
        return Ok((
            JobStatus::Skipped,
            JobStats {
                files_scanned: current.len() as u64,
                files_indexed: 0,
                symbols: 0,
                references: 0,
                dependencies: 0,
            },
        ));
    }

    let mut parser = CodeParser::new().map_err(|e| KotaError::Internal(e.to_string()))?;
    let mut work = Vec::new();
    for file in added.iter().chain(changed.iter()) {
        let abs_path = root.join(&file.relative_path);
        let source = match std::fs::read_to_string(&abs_path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %file.relative_path, error = %e, "failed to read file, skipping");
                continue;
            }
        };
        let language = SupportedLanguage::from_extension(&file.relative_path)
            .unwrap_or(SupportedLanguage::JavaScript);

        let parsed = parser.parse(&file.relative_path, &source, language);
        let diagnostics_json = serde_json::to_string(
            &parsed
                .diagnostics
                .iter()
                .map(|d| serde_json::json!({"line": d.line, "message": d.message}))
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        let symbols = extract_symbols(&source);
        let references = extract_references(&source);
        let snippet: String = source.chars().take(2000).collect();

        work.push(FileWork {
            path: file.relative_path.clone(),
            content_hash: file.content_hash.clone(),
            language,
            size_bytes: file.size_bytes,
            content_snippet: snippet,
            diagnostics_json,
            symbols,
            references,
        });
    }

    // path -> file_id across the whole current set, reusing prior ids for
    // unchanged/changed files so row identity survives re-indexing.
    let mut path_to_file_id: HashMap<String, String> = HashMap::new();
    for file in &unchanged {
        if let Some((id, _)) = prior_by_path.get(&file.relative_path) {
            path_to_file_id.insert(file.relative_path.clone(), id.clone());
        }
    }
    for w in &work {
        let id = prior_by_path
            .get(&w.path)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        path_to_file_id.insert(w.path.clone(), id);
    }

    let unchanged_file_ids: Vec<String> = unchanged
        .iter()
        .filter_map(|f| path_to_file_id.get(&f.relative_path).cloned())
        .collect();
    let existing_refs: Vec<(String, String, String, String)> = if unchanged_file_ids.is_empty() {
        Vec::new()
    } else {
        store.read(|conn| {
            let placeholders = unchanged_file_ids
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(",");
            let sql = format!(
                "SELECT refs.from_file_id, indexed_files.path, refs.to_path, refs.reference_type
                 FROM refs JOIN indexed_files ON refs.from_file_id = indexed_files.id
                 WHERE refs.from_file_id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::ToSql> = unchanged_file_ids
                .iter()
                .map(|s| s as &dyn rusqlite::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?
    };

    let new_refs: Vec<(String, String, ReferenceType)> = work
        .iter()
        .flat_map(|w| {
            w.references
                .iter()
                .map(move |r| (w.path.clone(), r.to_path.clone(), r.reference_type))
        })
        .collect();

    let edges = resolve_dependencies(&new_refs, &existing_refs, &path_to_file_id, &config.path_aliases);

    let stats = JobStats {
        files_scanned: current.len() as u64,
        files_indexed: work.len() as u64,
        symbols: work.iter().map(|w| w.symbols.len() as u64).sum(),
        references: work.iter().map(|w| w.references.len() as u64).sum::<u64>()
            + existing_refs.len() as u64,
        dependencies: edges.len() as u64,
    };

    store.transaction(|conn| {
        for path in &removed_paths {
            if let Some((id, _)) = prior_by_path.get(*path) {
                conn.execute("DELETE FROM indexed_files WHERE id = ?1", [id])?;
            }
        }

        for w in &work {
            let file_id = path_to_file_id.get(&w.path).expect("assigned above");
            conn.execute(
                "INSERT INTO indexed_files
                   (id, repository_id, path, content_hash, language, size_bytes, content_snippet, indexed_at, diagnostics_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(repository_id, path) DO UPDATE SET
                   content_hash = excluded.content_hash,
                   language = excluded.language,
                   size_bytes = excluded.size_bytes,
                   content_snippet = excluded.content_snippet,
                   indexed_at = excluded.indexed_at,
                   diagnostics_json = excluded.diagnostics_json",
                rusqlite::params![
                    file_id,
                    repository_id,
                    w.path,
                    w.content_hash,
                    w.language.as_str(),
                    w.size_bytes,
                    w.content_snippet,
                    Utc::now().to_rfc3339(),
                    w.diagnostics_json,
                ],
            )?;

            conn.execute("DELETE FROM symbols WHERE file_id = ?1", [file_id])?;
            for s in &w.symbols {
                conn.execute(
                    "INSERT INTO symbols (id, file_id, name, kind, line, jsdoc) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        file_id,
                        s.name,
                        s.kind.as_str(),
                        s.line,
                        s.jsdoc
                    ],
                )?;
            }

            conn.execute("DELETE FROM refs WHERE from_file_id = ?1", [file_id])?;
            for r in &w.references {
                conn.execute(
                    "INSERT INTO refs (id, from_file_id, to_path, symbols_json, reference_type, is_type_only) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        file_id,
                        r.to_path,
                        serde_json::to_string(&r.symbols).unwrap_or_else(|_| "[]".to_string()),
                        r.reference_type.as_str(),
                        r.is_type_only as i64,
                    ],
                )?;
            }
        }

        conn.execute("DELETE FROM dependency_edges WHERE repository_id = ?1", [repository_id])?;
        for edge in &edges {
            conn.execute(
                "INSERT OR IGNORE INTO dependency_edges (repository_id, source_file_id, target_file_id, reference_type) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![repository_id, edge.source_file_id, edge.target_file_id, edge.reference_type.as_str()],
            )?;
        }

        Ok(())
    })?;

    Ok((JobStatus::Completed, stats))
}
