//! A small hand-written OpenAPI document, no schema-derive machinery,
//! just the paths this server actually serves.

use serde_json::{json, Value};

pub fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "KotaDB",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Local-first code intelligence engine: indexing, search, and dependency analysis over source repositories."
        },
        "paths": {
            "/health": {
                "get": { "summary": "Liveness and version", "responses": { "200": { "description": "OK" } } }
            },
            "/search": {
                "get": {
                    "summary": "Full-text code search",
                    "parameters": [
                        { "name": "term", "in": "query", "required": true, "schema": { "type": "string" } },
                        { "name": "repository", "in": "query", "required": true, "schema": { "type": "string" } },
                        { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer" } }
                    ],
                    "responses": { "200": { "description": "OK" } }
                }
            },
            "/files/recent": {
                "get": {
                    "summary": "Most recently indexed files",
                    "parameters": [
                        { "name": "repository", "in": "query", "required": true, "schema": { "type": "string" } },
                        { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer" } }
                    ],
                    "responses": { "200": { "description": "OK" } }
                }
            },
            "/index": {
                "post": { "summary": "Enqueue an index job", "responses": { "202": { "description": "Accepted" } } }
            },
            "/jobs/{id}": {
                "get": {
                    "summary": "Job status and stats",
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": { "200": { "description": "OK" }, "404": { "description": "Not found" } }
                }
            },
            "/validate-output": {
                "post": { "summary": "Validate JSON against a supplied JSON Schema", "responses": { "200": { "description": "OK" } } }
            },
            "/mcp": {
                "post": { "summary": "JSON-RPC tool protocol endpoint", "responses": { "200": { "description": "OK" } } }
            }
        }
    })
}
