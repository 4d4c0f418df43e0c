//! Model Context Protocol tool server: a JSON-RPC surface exposing the
//! query engine, indexer, and memory layer as tools, callable over stdio
//! or HTTP.

mod tools;

pub use tools::{dispatch_tool, tool_catalog};

use crate::state::AppState;
use jsonrpc_core::{Error as RpcError, ErrorCode, IoHandler, Params, Result as RpcResult, Value};
use jsonrpc_derive::rpc;
use serde_json::json;
use std::sync::Arc;

/// All tool-level failures map to `-32603`, unlike the protocol-level
/// `invalid_params`/`method_not_found` codes jsonrpc-core assigns
/// automatically.
fn tool_error(message: &str) -> RpcError {
    RpcError {
        code: ErrorCode::InternalError,
        message: message.to_string(),
        data: None,
    }
}

#[rpc(server)]
pub trait MCPRpc {
    #[rpc(name = "initialize")]
    fn initialize(&self, params: Params) -> RpcResult<Value>;

    #[rpc(name = "tools/list")]
    fn list_tools(&self) -> RpcResult<Value>;

    #[rpc(name = "tools/call")]
    fn call_tool(&self, params: Params) -> RpcResult<Value>;
}

pub struct MCPServer {
    state: AppState,
}

impl MCPServer {
    pub fn new(state: AppState) -> Self {
        MCPServer { state }
    }

    /// Build the `IoHandler` this server answers requests with. Shared by
    /// the stdio loop and the `/mcp` HTTP handler.
    pub fn into_io_handler(self) -> IoHandler {
        let mut io = IoHandler::new();
        io.extend_with(self.to_delegate());
        io
    }
}

impl MCPRpc for MCPServer {
    fn initialize(&self, _params: Params) -> RpcResult<Value> {
        Ok(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": { "name": "kotadb", "version": env!("CARGO_PKG_VERSION") },
            "capabilities": { "tools": {} },
        }))
    }

    fn list_tools(&self) -> RpcResult<Value> {
        Ok(json!({ "tools": tool_catalog() }))
    }

    fn call_tool(&self, params: Params) -> RpcResult<Value> {
        let params: Value = params.parse().map_err(|_| RpcError::invalid_params("expected an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tool_error("missing 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        // Every tool-level failure (missing params, bad types, unknown tool,
        // execution error) surfaces as -32603, not as an `isError` envelope.
        let result = dispatch_tool(&self.state, name, &arguments).map_err(|e| tool_error(&e.to_string()))?;
        Ok(json!({
            "content": [{ "type": "text", "text": result.to_string() }],
        }))
    }
}

/// Serve the MCP protocol over stdio: one JSON-RPC request per line on
/// stdin, one response per line on stdout.
pub fn serve_stdio(state: AppState) -> anyhow::Result<()> {
    let handler = Arc::new(MCPServer::new(state).into_io_handler());
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    use std::io::{BufRead, Write};

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handler.handle_request_sync(&line) {
            writeln!(stdout, "{response}")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
