//! Standalone MCP tool-protocol server: serves the same tool catalog as
//! `kotadb serve --stdio`, as a dedicated binary for MCP client configs
//! that expect a single-purpose executable.

use kotadb::config::Config;
use kotadb::observability;
use kotadb::state::AppState;
use kotadb::store::{Store, StoreOptions};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

fn main() -> ExitCode {
    let config = Config::default();

    if let Err(e) = observability::init_logging(&config.log_level) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::from(3);
    }

    if let Some(parent) = config.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(error = %e, "failed to create database directory");
            return ExitCode::from(2);
        }
    }

    let store = match Store::open(&config.db_path, StoreOptions::default()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "failed to open store");
            return ExitCode::from(3);
        }
    };

    let state = AppState::new(store, Arc::new(config));

    if let Err(e) = kotadb::mcp::serve_stdio(state) {
        error!(error = %e, "mcp server failed");
        return ExitCode::from(3);
    }
    ExitCode::SUCCESS
}
