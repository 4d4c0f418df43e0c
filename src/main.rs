// KotaDB CLI: local-first code intelligence engine

use clap::Parser;
use kotadb::cli::{Cli, Commands};
use kotadb::config::Config;
use kotadb::indexer::IndexJobRequest;
use kotadb::models::JobStatus;
use kotadb::observability;
use kotadb::state::AppState;
use kotadb::store::{Store, StoreOptions};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);

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

    let config = Arc::new(config);
    let state = AppState::new(store, config.clone());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(3);
        }
    };

    match cli.command {
        Commands::Serve { port, host, stdio } => {
            if stdio {
                #[cfg(feature = "mcp-server")]
                {
                    if let Err(e) = kotadb::mcp::serve_stdio(state) {
                        error!(error = %e, "stdio server failed");
                        return ExitCode::from(3);
                    }
                    return ExitCode::SUCCESS;
                }
                #[cfg(not(feature = "mcp-server"))]
                {
                    eprintln!("--stdio requires the mcp-server feature");
                    return ExitCode::from(1);
                }
            }

            let mut serve_config = (*config).clone();
            if let Some(port) = port {
                serve_config.port = port;
            }
            if let Some(host) = host {
                serve_config.host = host;
            }

            runtime.block_on(async move {
                let _worker_handles = state.indexer.spawn_workers();
                let addr = format!("{}:{}", serve_config.host, serve_config.port);
                let router = kotadb::http::build_router(state);
                let listener = match tokio::net::TcpListener::bind(&addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        error!(error = %e, %addr, "failed to bind");
                        return ExitCode::from(2);
                    }
                };
                info!(%addr, "kotadb listening");
                if let Err(e) = axum::serve(listener, router).await {
                    error!(error = %e, "server error");
                    return ExitCode::from(3);
                }
                ExitCode::SUCCESS
            })
        }

        Commands::Index {
            repository,
            git_ref,
            local_path,
        } => {
            let job = state.indexer.run_once(IndexJobRequest {
                full_name: repository,
                git_ref,
                local_path,
            });
            match job {
                Ok(job) => {
                    println!("{}", serde_json::to_string_pretty(&job).unwrap_or_default());
                    match job.status {
                        JobStatus::Failed => ExitCode::from(3),
                        _ => ExitCode::SUCCESS,
                    }
                }
                Err(e) => {
                    error!(error = %e, "index job failed");
                    ExitCode::from(3)
                }
            }
        }
    }
}
