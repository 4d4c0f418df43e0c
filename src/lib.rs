// KotaDB - local-first code intelligence engine

pub mod error;
pub mod models;
pub mod config;
pub mod observability;

pub mod store;
pub mod acquirer;
pub mod scanner;
pub mod parsing;
pub mod extractors;
pub mod indexer;
pub mod query;
pub mod memory;
pub mod auth;
pub mod rate_limit;
pub mod sync;
pub mod state;

pub mod http;
pub mod cli;

#[cfg(feature = "mcp-server")]
pub mod mcp;

pub use error::{KotaError, Result};
pub use state::AppState;
