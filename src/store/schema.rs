//! Migration catalog. Each script is idempotent (`IF NOT EXISTS`) so
//! re-applying it is a no-op.

/// `(name, sql)` pairs applied in order. Names double as the primary key in
/// `schema_migrations`; never reorder or rename an existing entry, only
/// append.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_schema_migrations", SCHEMA_MIGRATIONS_SQL),
    ("0002_repositories", REPOSITORIES_SQL),
    ("0003_index_jobs", INDEX_JOBS_SQL),
    ("0004_indexed_files", INDEXED_FILES_SQL),
    ("0005_symbols", SYMBOLS_SQL),
    ("0006_references", REFERENCES_SQL),
    ("0007_dependency_edges", DEPENDENCY_EDGES_SQL),
    ("0008_rate_counters", RATE_COUNTERS_SQL),
    ("0009_api_keys", API_KEYS_SQL),
    ("0010_memory_records", MEMORY_RECORDS_SQL),
    ("0011_indexed_files_fts", INDEXED_FILES_FTS_SQL),
    ("0012_memory_records_fts", MEMORY_RECORDS_FTS_SQL),
];

const SCHEMA_MIGRATIONS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    name TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL,
    sha256_hash TEXT NOT NULL
);
"#;

const REPOSITORIES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE,
    local_path TEXT,
    default_ref TEXT NOT NULL,
    last_indexed_at TEXT
);
"#;

const INDEX_JOBS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS index_jobs (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id),
    git_ref TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    error TEXT,
    stats_json TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_index_jobs_repo ON index_jobs(repository_id);
"#;

const INDEXED_FILES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS indexed_files (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id),
    path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    language TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    content_snippet TEXT NOT NULL DEFAULT '',
    indexed_at TEXT NOT NULL,
    diagnostics_json TEXT NOT NULL DEFAULT '[]',
    UNIQUE(repository_id, path)
);
CREATE INDEX IF NOT EXISTS idx_indexed_files_repo ON indexed_files(repository_id);
CREATE INDEX IF NOT EXISTS idx_indexed_files_indexed_at ON indexed_files(indexed_at);
"#;

const SYMBOLS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL REFERENCES indexed_files(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    line INTEGER NOT NULL,
    jsdoc TEXT
);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
"#;

const REFERENCES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS refs (
    id TEXT PRIMARY KEY,
    from_file_id TEXT NOT NULL REFERENCES indexed_files(id) ON DELETE CASCADE,
    to_path TEXT NOT NULL,
    symbols_json TEXT NOT NULL DEFAULT '[]',
    reference_type TEXT NOT NULL,
    is_type_only INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_refs_from_file ON refs(from_file_id);
"#;

const DEPENDENCY_EDGES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dependency_edges (
    repository_id TEXT NOT NULL REFERENCES repositories(id),
    source_file_id TEXT NOT NULL REFERENCES indexed_files(id) ON DELETE CASCADE,
    target_file_id TEXT NOT NULL REFERENCES indexed_files(id) ON DELETE CASCADE,
    reference_type TEXT NOT NULL,
    PRIMARY KEY (source_file_id, target_file_id, reference_type)
);
CREATE INDEX IF NOT EXISTS idx_dep_edges_repo ON dependency_edges(repository_id);
CREATE INDEX IF NOT EXISTS idx_dep_edges_target ON dependency_edges(target_file_id);
"#;

const RATE_COUNTERS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS rate_counters (
    key_id TEXT NOT NULL,
    window_start TEXT NOT NULL,
    request_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (key_id, window_start)
);
"#;

const API_KEYS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS api_keys (
    key_id TEXT PRIMARY KEY,
    tier TEXT NOT NULL,
    secret_hash TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    revoked_at TEXT
);
"#;

const MEMORY_RECORDS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS memory_records (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    repository TEXT,
    text TEXT NOT NULL,
    related_files_json TEXT NOT NULL DEFAULT '[]',
    supersedes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_kind ON memory_records(kind);
"#;

const INDEXED_FILES_FTS_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS indexed_files_fts USING fts5(
    content_snippet,
    content='indexed_files',
    content_rowid='rowid'
);
CREATE TRIGGER IF NOT EXISTS indexed_files_ai AFTER INSERT ON indexed_files BEGIN
    INSERT INTO indexed_files_fts(rowid, content_snippet) VALUES (new.rowid, new.content_snippet);
END;
CREATE TRIGGER IF NOT EXISTS indexed_files_ad AFTER DELETE ON indexed_files BEGIN
    INSERT INTO indexed_files_fts(indexed_files_fts, rowid, content_snippet) VALUES ('delete', old.rowid, old.content_snippet);
END;
CREATE TRIGGER IF NOT EXISTS indexed_files_au AFTER UPDATE ON indexed_files BEGIN
    INSERT INTO indexed_files_fts(indexed_files_fts, rowid, content_snippet) VALUES ('delete', old.rowid, old.content_snippet);
    INSERT INTO indexed_files_fts(rowid, content_snippet) VALUES (new.rowid, new.content_snippet);
END;
"#;

const MEMORY_RECORDS_FTS_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS memory_records_fts USING fts5(
    text,
    content='memory_records',
    content_rowid='rowid'
);
CREATE TRIGGER IF NOT EXISTS memory_records_ai AFTER INSERT ON memory_records BEGIN
    INSERT INTO memory_records_fts(rowid, text) VALUES (new.rowid, new.text);
END;
CREATE TRIGGER IF NOT EXISTS memory_records_ad AFTER DELETE ON memory_records BEGIN
    INSERT INTO memory_records_fts(memory_records_fts, rowid, text) VALUES ('delete', old.rowid, old.text);
END;
CREATE TRIGGER IF NOT EXISTS memory_records_au AFTER UPDATE ON memory_records BEGIN
    INSERT INTO memory_records_fts(memory_records_fts, rowid, text) VALUES ('delete', old.rowid, old.text);
    INSERT INTO memory_records_fts(rowid, text) VALUES (new.rowid, new.text);
END;
"#;
