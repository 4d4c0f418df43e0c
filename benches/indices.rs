use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kotadb::query::search_code;
use kotadb::store::{Store, StoreOptions};
use tempfile::tempdir;
use uuid::Uuid;

fn seed_repository(store: &Store, file_count: usize) -> String {
    let repo_id = Uuid::new_v4().to_string();
    store
        .writer()
        .execute(
            "INSERT INTO repositories (id, full_name, default_ref) VALUES (?1, ?2, 'main')",
            rusqlite::params![repo_id, format!("bench/{repo_id}")],
        )
        .unwrap();

    for i in 0..file_count {
        let file_id = Uuid::new_v4().to_string();
        let content = format!(
            "pub fn handler_{i}(request: Request) -> Response {{\n    process(request)\n}}"
        );
        store
            .writer()
            .execute(
                "INSERT INTO indexed_files
                    (id, repository_id, path, content_hash, language, size_bytes, content_snippet, indexed_at)
                 VALUES (?1, ?2, ?3, 'deadbeef', 'rust', ?4, ?5, datetime('now'))",
                rusqlite::params![file_id, repo_id, format!("src/handler_{i}.rs"), content.len(), content],
            )
            .unwrap();
    }
    repo_id
}

/// Full-text search throughput across growing repository sizes.
fn bench_search_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_code");

    for size in [100, 1_000, 10_000].iter() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("bench.db"), StoreOptions::default()).unwrap();
        let repo_id = seed_repository(&store, *size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(search_code(&store, &repo_id, "handler", Some(20)).unwrap()));
        });
    }

    group.finish();
}

/// Write-path throughput for indexed file insertion.
fn bench_insert_indexed_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_indexed_files");

    group.bench_function("insert_1000_files", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let store =
                    Store::open(dir.path().join("bench.db"), StoreOptions::default()).unwrap();
                let repo_id = Uuid::new_v4().to_string();
                store
                    .writer()
                    .execute(
                        "INSERT INTO repositories (id, full_name, default_ref) VALUES (?1, ?2, 'main')",
                        rusqlite::params![repo_id, format!("bench/{repo_id}")],
                    )
                    .unwrap();
                (dir, store, repo_id)
            },
            |(_dir, store, repo_id)| {
                for i in 0..1000 {
                    store
                        .writer()
                        .execute(
                            "INSERT INTO indexed_files
                                (id, repository_id, path, content_hash, language, size_bytes, content_snippet, indexed_at)
                             VALUES (?1, ?2, ?3, 'deadbeef', 'rust', 0, '', datetime('now'))",
                            rusqlite::params![Uuid::new_v4().to_string(), repo_id, format!("src/f_{i}.rs")],
                        )
                        .unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_search_code, bench_insert_indexed_files);
criterion_main!(benches);
