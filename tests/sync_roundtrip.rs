//! Export then import(replace) reproduces the pre-export database exactly,
//! including FTS search results for a fixed query.

use kotadb::config::Config;
use kotadb::indexer::{run_index_job, IndexJobRequest};
use kotadb::query::search_code;
use kotadb::store::{Store, StoreOptions};
use kotadb::sync::{export_to_dir, import_from_dir, ImportMode};
use std::fs;
use tempfile::tempdir;

fn row_count(store: &Store, table: &str) -> i64 {
    store
        .read(|conn| conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0)).map_err(Into::into))
        .unwrap()
}

#[test]
fn export_then_replace_import_reproduces_the_database() {
    let db_dir = tempdir().unwrap();
    let store = Store::open(db_dir.path().join("kotadb.db"), StoreOptions::default()).unwrap();
    let config = Config::default();

    let repo = tempdir().unwrap();
    fs::write(repo.path().join("handler.ts"), "export function handleRequest() { return 1; }\n").unwrap();
    fs::write(repo.path().join("util.ts"), "import { handleRequest } from \"./handler\";\nexport function wrap() { return handleRequest(); }\n").unwrap();

    let job = run_index_job(
        &store,
        &config,
        IndexJobRequest {
            full_name: "acme/sync".to_string(),
            git_ref: "main".to_string(),
            local_path: Some(repo.path().to_path_buf()),
        },
    )
    .unwrap();
    assert_eq!(job.stats.files_indexed, 2);

    let before_hits = search_code(&store, &job.repository_id, "handleRequest", None).unwrap();
    assert!(!before_hits.is_empty());

    let export_dir = tempdir().unwrap();
    export_to_dir(&store, export_dir.path(), true).unwrap();

    let before_files = row_count(&store, "indexed_files");
    let before_symbols = row_count(&store, "symbols");
    let before_refs = row_count(&store, "refs");

    store.writer().execute_batch("DELETE FROM refs; DELETE FROM symbols; DELETE FROM indexed_files; DELETE FROM index_jobs; DELETE FROM repositories;").unwrap();
    assert_eq!(row_count(&store, "indexed_files"), 0);

    let report = import_from_dir(&store, export_dir.path(), ImportMode::Replace).unwrap();
    assert!(report.values().all(|r| r.row_errors.is_empty()));

    assert_eq!(row_count(&store, "indexed_files"), before_files);
    assert_eq!(row_count(&store, "symbols"), before_symbols);
    assert_eq!(row_count(&store, "refs"), before_refs);

    let after_hits = search_code(&store, &job.repository_id, "handleRequest", None).unwrap();
    assert_eq!(after_hits.len(), before_hits.len());
    assert_eq!(after_hits[0].file_id, before_hits[0].file_id);
}
