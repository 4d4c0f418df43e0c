//! Tool catalog and dispatch. Each tool takes a JSON object
//! of arguments and returns a JSON value; argument shape errors surface as
//! `KotaError::InvalidArgument` so the RPC layer reports them uniformly.

use crate::error::{KotaError, Result};
use crate::indexer::IndexJobRequest;
use crate::memory;
use crate::models::{MemoryKind, ReferenceType};
use crate::query::{self, ChangeImpactRequest, Direction};
use crate::state::AppState;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn tool_catalog() -> Value {
    json!([
        {
            "name": "search_code",
            "description": "Full-text search over a repository's indexed source files.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository_id": { "type": "string" },
                    "term": { "type": "string" },
                    "limit": { "type": "integer" }
                },
                "required": ["repository_id", "term"]
            }
        },
        {
            "name": "list_recent_files",
            "description": "List a repository's most recently indexed files.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository_id": { "type": "string" },
                    "limit": { "type": "integer" }
                },
                "required": ["repository_id"]
            }
        },
        {
            "name": "search_dependencies",
            "description": "Bounded-depth traversal of a file's dependency graph.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository_id": { "type": "string" },
                    "file_path": { "type": "string" },
                    "direction": { "type": "string", "enum": ["Dependents", "Dependencies", "Both"] },
                    "max_depth": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "include_tests": { "type": "boolean" }
                },
                "required": ["repository_id", "file_path"]
            }
        },
        {
            "name": "analyze_change_impact",
            "description": "Impacted files, test recommendations, and a risk score for a proposed change set.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository_id": { "type": "string" },
                    "change_type": { "type": "string" },
                    "description": { "type": "string" },
                    "files_to_modify": { "type": "array", "items": { "type": "string" } },
                    "files_to_create": { "type": "array", "items": { "type": "string" } },
                    "files_to_delete": { "type": "array", "items": { "type": "string" } },
                    "breaking_changes": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["repository_id", "change_type", "description"]
            }
        },
        {
            "name": "index_repository",
            "description": "Acquire and index a repository, synchronously.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "full_name": { "type": "string" },
                    "git_ref": { "type": "string" },
                    "local_path": { "type": "string" }
                },
                "required": ["full_name", "git_ref"]
            }
        },
        {
            "name": "record_memory",
            "description": "Append a decision/failure/pattern/insight record.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "kind": { "type": "string", "enum": ["Decision", "Failure", "Pattern", "Insight"] },
                    "repository": { "type": "string" },
                    "text": { "type": "string" },
                    "related_files": { "type": "array", "items": { "type": "string" } },
                    "supersedes": { "type": "string" }
                },
                "required": ["kind", "text"]
            }
        },
        {
            "name": "search_memory",
            "description": "Full-text search over recorded memory.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "kind": { "type": "string" },
                    "repository": { "type": "string" },
                    "limit": { "type": "integer" }
                },
                "required": ["query"]
            }
        },
    ])
}

fn parse<T: for<'de> Deserialize<'de>>(arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| KotaError::InvalidArgument(format!("bad arguments: {e}")))
}

pub fn dispatch_tool(state: &AppState, name: &str, arguments: &Value) -> Result<Value> {
    match name {
        "search_code" => {
            #[derive(Deserialize)]
            struct Args {
                repository_id: String,
                term: String,
                limit: Option<u32>,
            }
            let args: Args = parse(arguments)?;
            let hits = query::search_code(&state.store, &args.repository_id, &args.term, args.limit)?;
            Ok(json!({ "hits": hits }))
        }
        "list_recent_files" => {
            #[derive(Deserialize)]
            struct Args {
                repository_id: String,
                limit: Option<u32>,
            }
            let args: Args = parse(arguments)?;
            let files = query::list_recent_files(&state.store, &args.repository_id, args.limit)?;
            Ok(json!({ "files": files }))
        }
        "search_dependencies" => {
            #[derive(Deserialize)]
            struct Args {
                repository_id: String,
                file_path: String,
                #[serde(default = "default_direction")]
                direction: Direction,
                #[serde(default = "default_max_depth")]
                max_depth: u32,
                #[serde(default)]
                include_tests: bool,
                #[serde(default)]
                reference_types: Vec<ReferenceType>,
            }
            fn default_direction() -> Direction {
                Direction::Dependencies
            }
            fn default_max_depth() -> u32 {
                3
            }
            let args: Args = parse(arguments)?;
            let file_id = query::file_id_for_path(&state.store, &args.repository_id, &args.file_path)?
                .ok_or_else(|| KotaError::NotFound(format!("file not indexed: {}", args.file_path)))?;
            let max_depth = args.max_depth.clamp(1, 5);
            let hits = query::search_dependencies(
                &state.store,
                &args.repository_id,
                &file_id,
                args.direction,
                max_depth,
                args.include_tests,
                &args.reference_types,
            )?;
            Ok(json!({ "hits": hits }))
        }
        "analyze_change_impact" => {
            #[derive(Deserialize)]
            struct Args {
                repository_id: String,
                #[serde(flatten)]
                request: ChangeImpactRequest,
            }
            let args: Args = parse(arguments)?;
            let impact = query::analyze_change_impact(&state.store, &args.repository_id, &args.request)?;
            Ok(serde_json::to_value(impact)?)
        }
        "index_repository" => {
            #[derive(Deserialize)]
            struct Args {
                full_name: String,
                git_ref: String,
                local_path: Option<String>,
            }
            let args: Args = parse(arguments)?;
            let job = state.indexer.run_once(IndexJobRequest {
                full_name: args.full_name,
                git_ref: args.git_ref,
                local_path: args.local_path.map(std::path::PathBuf::from),
            })?;
            Ok(serde_json::to_value(job)?)
        }
        "record_memory" => {
            #[derive(Deserialize)]
            struct Args {
                kind: MemoryKind,
                repository: Option<String>,
                text: String,
                #[serde(default)]
                related_files: Vec<String>,
                supersedes: Option<String>,
            }
            let args: Args = parse(arguments)?;
            let record = memory::record(
                &state.store,
                args.kind,
                args.repository.as_deref(),
                &args.text,
                &args.related_files,
                args.supersedes.as_deref(),
            )?;
            Ok(serde_json::to_value(record)?)
        }
        "search_memory" => {
            #[derive(Deserialize)]
            struct Args {
                query: String,
                kind: Option<MemoryKind>,
                repository: Option<String>,
                limit: Option<u32>,
            }
            let args: Args = parse(arguments)?;
            let records = memory::search_memory(
                &state.store,
                &args.query,
                args.kind,
                args.repository.as_deref(),
                args.limit,
            )?;
            Ok(json!({ "records": records }))
        }
        other => Err(KotaError::NotFound(format!("unknown tool: {other}"))),
    }
}
