//! End-to-end scenarios over the full acquire -> scan -> parse -> store
//! pipeline, run against local fixture trees (no network).

use kotadb::config::Config;
use kotadb::indexer::{run_index_job, IndexJobRequest};
use kotadb::models::JobStatus;
use kotadb::query::{search_dependencies, Direction};
use kotadb::store::{Store, StoreOptions};
use std::fs;
use tempfile::tempdir;

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("kotadb.db"), StoreOptions::default()).unwrap();
    (dir, store)
}

fn request(repo: &tempfile::TempDir, full_name: &str) -> IndexJobRequest {
    IndexJobRequest {
        full_name: full_name.to_string(),
        git_ref: "main".to_string(),
        local_path: Some(repo.path().to_path_buf()),
    }
}

fn count(store: &Store, sql: &str, repository_id: &str) -> i64 {
    store
        .read(|conn| conn.query_row(sql, [repository_id], |row| row.get(0)).map_err(Into::into))
        .unwrap()
}

/// Indexing a changed-nothing repository a second time touches zero rows
/// and reports the job as a no-op.
#[test]
fn incremental_noop_reindex() {
    let (_db_dir, store) = open_store();
    let config = Config::default();

    let repo = tempdir().unwrap();
    fs::write(repo.path().join("a.ts"), "import { b } from \"./b\";\nexport function a() {}\n").unwrap();
    fs::write(repo.path().join("b.ts"), "export function b() {}\n").unwrap();
    fs::write(repo.path().join("c.ts"), "export function c() {}\n").unwrap();

    let job = run_index_job(&store, &config, request(&repo, "acme/widgets")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.stats.files_indexed, 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM indexed_files WHERE repository_id = ?1", &job.repository_id), 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM refs f JOIN indexed_files i ON f.from_file_id = i.id WHERE i.repository_id = ?1", &job.repository_id), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM dependency_edges WHERE repository_id = ?1", &job.repository_id), 1);

    let second = run_index_job(&store, &config, request(&repo, "acme/widgets")).unwrap();
    assert!(matches!(second.status, JobStatus::Skipped | JobStatus::Completed));
    assert_eq!(second.stats.files_indexed, 0);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM indexed_files WHERE repository_id = ?1", &job.repository_id), 3);
}

/// Cyclic dependency traversal terminates, bounds path length, and never
/// repeats a node on a single path.
#[test]
fn cyclic_traversal_is_bounded() {
    let (_db_dir, store) = open_store();
    let config = Config::default();

    let repo = tempdir().unwrap();
    fs::write(repo.path().join("r.ts"), "import { s } from \"./s\";\n").unwrap();
    fs::write(repo.path().join("s.ts"), "import { t } from \"./t\";\n").unwrap();
    fs::write(repo.path().join("t.ts"), "import { r } from \"./r\";\n").unwrap();

    let job = run_index_job(&store, &config, request(&repo, "acme/cycle")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let r_id: String = store
        .read(|conn| {
            conn.query_row(
                "SELECT id FROM indexed_files WHERE repository_id = ?1 AND path = 'r.ts'",
                [&job.repository_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .unwrap();

    let hits = search_dependencies(&store, &job.repository_id, &r_id, Direction::Dependencies, 5, true, &[]).unwrap();
    assert!(!hits.is_empty());
    for hit in &hits {
        assert!(hit.depth <= 5);
    }
    // r -> s -> t -> r would repeat r; the third hop must not reintroduce r.
    assert!(hits.iter().all(|h| h.path != "r.ts"));

    let s_hit = hits.iter().find(|h| h.path == "s.ts").unwrap();
    assert_eq!(s_hit.via_path, vec!["r.ts".to_string(), "s.ts".to_string()]);
    let t_hit = hits.iter().find(|h| h.path == "t.ts").unwrap();
    assert_eq!(
        t_hit.via_path,
        vec!["r.ts".to_string(), "s.ts".to_string(), "t.ts".to_string()]
    );
}

/// `include_tests = false` must not prune the walk itself: a production
/// file reachable only through a test file still has to be discovered, and
/// the hop through the test file still counts toward depth.
#[test]
fn excluded_test_nodes_are_still_walked_through() {
    let (_db_dir, store) = open_store();
    let config = Config::default();

    let repo = tempdir().unwrap();
    fs::write(repo.path().join("entry.ts"), "import { helper } from \"./entry.test\";\n").unwrap();
    fs::write(
        repo.path().join("entry.test.ts"),
        "import { helper } from \"./helper\";\n",
    )
    .unwrap();
    fs::write(repo.path().join("helper.ts"), "export function helper() {}\n").unwrap();

    let job = run_index_job(&store, &config, request(&repo, "acme/through-test")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let entry_id: String = store
        .read(|conn| {
            conn.query_row(
                "SELECT id FROM indexed_files WHERE repository_id = ?1 AND path = 'entry.ts'",
                [&job.repository_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .unwrap();

    let hits = search_dependencies(
        &store,
        &job.repository_id,
        &entry_id,
        Direction::Dependencies,
        5,
        false,
        &[],
    )
    .unwrap();

    assert!(hits.iter().all(|h| h.path != "entry.test.ts"));
    let helper_hit = hits.iter().find(|h| h.path == "helper.ts").unwrap();
    assert_eq!(helper_hit.depth, 2);
}

/// A syntactically invalid file doesn't abort the job; the valid file is
/// fully indexed and the invalid one is recorded with a diagnostic.
#[test]
fn parse_error_tolerance() {
    let (_db_dir, store) = open_store();
    let config = Config::default();

    let repo = tempdir().unwrap();
    fs::write(repo.path().join("good.ts"), "export function good() { return 1; }\n").unwrap();
    fs::write(repo.path().join("broken.ts"), "export function broken( {{{ not valid\n").unwrap();

    let job = run_index_job(&store, &config, request(&repo, "acme/brittle")).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.stats.files_indexed, 2);

    let good_symbols: i64 = store
        .read(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM symbols s JOIN indexed_files i ON s.file_id = i.id
                 WHERE i.repository_id = ?1 AND i.path = 'good.ts'",
                [&job.repository_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .unwrap();
    assert!(good_symbols > 0);

    let (broken_symbols, diagnostics_json): (i64, String) = store
        .read(|conn| {
            conn.query_row(
                "SELECT (SELECT COUNT(*) FROM symbols WHERE file_id = i.id), i.diagnostics_json
                 FROM indexed_files i WHERE i.repository_id = ?1 AND i.path = 'broken.ts'",
                [&job.repository_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(Into::into)
        })
        .unwrap();
    assert_eq!(broken_symbols, 0);
    assert_ne!(diagnostics_json, "[]");
}
