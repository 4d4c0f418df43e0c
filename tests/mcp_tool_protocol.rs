//! Tool-level failures surface as JSON-RPC `-32603`, not as an `isError`
//! content envelope, and a successful call's result is always a
//! parseable-JSON text content block.

use kotadb::config::Config;
use kotadb::indexer::IndexJobRequest;
use kotadb::mcp::{dispatch_tool, MCPServer};
use kotadb::state::AppState;
use kotadb::store::{Store, StoreOptions};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn new_state() -> (tempfile::TempDir, AppState) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("kotadb.db"), StoreOptions::default()).unwrap());
    let state = AppState::new(store, Arc::new(Config::default()));
    (dir, state)
}

#[test]
fn missing_required_argument_is_an_internal_rpc_error() {
    let (_dir, state) = new_state();
    let handler = MCPServer::new(state).into_io_handler();
    let request = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"search_code","arguments":{"repository_id":"x"}}}"#;

    let response = handler.handle_request_sync(request).expect("a response");
    let body: Value = serde_json::from_str(&response).unwrap();

    assert_eq!(body["error"]["code"], -32603);
    assert!(body["error"]["message"].as_str().unwrap().contains("term"));
}

#[test]
fn successful_call_wraps_json_in_a_text_content_block() {
    let (_dir, state) = new_state();
    let handler = MCPServer::new(state).into_io_handler();
    let request = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#;

    let response = handler.handle_request_sync(request).expect("a response");
    let body: Value = serde_json::from_str(&response).unwrap();
    assert!(body["result"]["tools"].as_array().unwrap().iter().any(|t| t["name"] == "search_code"));
}

#[test]
fn unknown_tool_is_also_an_internal_rpc_error() {
    let (_dir, state) = new_state();
    let handler = MCPServer::new(state).into_io_handler();
    let request = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#;

    let response = handler.handle_request_sync(request).expect("a response");
    let body: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(body["error"]["code"], -32603);
}

#[test]
fn search_dependencies_keys_on_file_path_and_clamps_max_depth() {
    let (_dir, state) = new_state();
    let repo = tempdir().unwrap();
    fs::write(repo.path().join("a.ts"), "import { b } from \"./b\";\n").unwrap();
    fs::write(repo.path().join("b.ts"), "export function b() {}\n").unwrap();

    let job = state
        .indexer
        .run_once(IndexJobRequest {
            full_name: "acme/tools".to_string(),
            git_ref: "main".to_string(),
            local_path: Some(repo.path().to_path_buf()),
        })
        .unwrap();

    let result = dispatch_tool(
        &state,
        "search_dependencies",
        &json!({
            "repository_id": job.repository_id,
            "file_path": "a.ts",
            "max_depth": 99,
        }),
    )
    .unwrap();

    let hits = result["hits"].as_array().unwrap();
    assert!(hits.iter().any(|h| h["path"] == "b.ts"));

    let missing = dispatch_tool(
        &state,
        "search_dependencies",
        &json!({ "repository_id": job.repository_id, "file_path": "nope.ts" }),
    );
    assert!(missing.is_err());
}

#[test]
fn analyze_change_impact_folds_breaking_changes_into_risk() {
    let (_dir, state) = new_state();
    let repo = tempdir().unwrap();
    fs::write(repo.path().join("a.ts"), "import { b } from \"./b\";\n").unwrap();
    fs::write(repo.path().join("b.ts"), "export function b() {}\n").unwrap();
    fs::write(
        repo.path().join("b.test.ts"),
        "import { b } from \"./b\";\n",
    )
    .unwrap();

    let job = state
        .indexer
        .run_once(IndexJobRequest {
            full_name: "acme/impact".to_string(),
            git_ref: "main".to_string(),
            local_path: Some(repo.path().to_path_buf()),
        })
        .unwrap();

    let result = dispatch_tool(
        &state,
        "analyze_change_impact",
        &json!({
            "repository_id": job.repository_id,
            "change_type": "refactor",
            "description": "rename b's export",
            "files_to_modify": ["b.ts"],
            "breaking_changes": ["b()'s signature changes"],
        }),
    )
    .unwrap();

    assert_eq!(result["risk"], "Medium");
    let impacted = result["impacted_files"].as_array().unwrap();
    assert!(impacted.iter().any(|p| p == "a.ts"));
    let recommendations = result["test_recommendations"].as_array().unwrap();
    assert!(recommendations.iter().any(|p| p == "b.test.ts"));
    assert!(result["rationale"].as_array().unwrap().iter().any(|r| {
        r.as_str().unwrap().contains("breaking change")
    }));
}
