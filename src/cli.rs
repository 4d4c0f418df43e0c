//! Command-line surface: `serve`, `index`, and `--stdio`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kotadb",
    author,
    version,
    about = "KotaDB - local-first code intelligence engine",
    long_about = None
)]
pub struct Cli {
    /// Database file path (overrides $DB_PATH).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Log level: debug, info, warn, error (overrides $LOG_LEVEL).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP request surface.
    Serve {
        /// Port to listen on (overrides $PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides $HOST).
        #[arg(long)]
        host: Option<String>,

        /// Run the tool protocol over stdin/stdout instead of HTTP.
        #[arg(long)]
        stdio: bool,
    },

    /// Acquire and index a repository synchronously.
    Index {
        /// Repository identifier, e.g. `owner/name`.
        #[arg(long)]
        repository: String,

        /// Git ref to check out.
        #[arg(long, default_value = "main")]
        git_ref: String,

        /// Index a local directory instead of cloning.
        #[arg(long)]
        local_path: Option<PathBuf>,
    },
}
