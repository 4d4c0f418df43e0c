//! Typed configuration. This is the single place request dispatch options
//! are enumerated; no untyped maps cross module boundaries from here
//! outward.

use crate::models::Tier;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub hourly: u64,
    pub daily: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub log_level: String,
    pub scratch_dir: PathBuf,
    pub worker_count: usize,
    pub busy_timeout_ms: u32,
    pub clone_base_url: String,
    pub path_aliases: HashMap<String, String>,
    pub included_extensions: Vec<String>,
    pub ignored_dirs: Vec<String>,
    pub rate_limit_tiers: HashMap<Tier, RateLimitPolicy>,
    pub dns_rebinding_allowed_origins: Option<Vec<String>>,
    pub request_timeout_secs: u64,
    pub max_retry_attempts: u32,
    pub retry_base_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let default_db = PathBuf::from(home).join(".kotadb").join("kotadb.db");

        let mut rate_limit_tiers = HashMap::new();
        rate_limit_tiers.insert(
            Tier::Free,
            RateLimitPolicy {
                hourly: 1_000,
                daily: 10_000,
            },
        );
        rate_limit_tiers.insert(
            Tier::Solo,
            RateLimitPolicy {
                hourly: 10_000,
                daily: 100_000,
            },
        );
        rate_limit_tiers.insert(
            Tier::Team,
            RateLimitPolicy {
                hourly: 100_000,
                daily: 1_000_000,
            },
        );

        Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            db_path: std::env::var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(default_db),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            scratch_dir: std::env::temp_dir().join("kotadb-scratch"),
            worker_count: 3,
            busy_timeout_ms: 30_000,
            clone_base_url: "https://github.com/".to_string(),
            path_aliases: HashMap::new(),
            included_extensions: vec![
                ".ts".into(),
                ".tsx".into(),
                ".js".into(),
                ".jsx".into(),
                ".cjs".into(),
                ".mjs".into(),
                ".json".into(),
            ],
            ignored_dirs: vec![
                ".git".into(),
                "node_modules".into(),
                "dist".into(),
                "build".into(),
                "out".into(),
                "coverage".into(),
            ],
            rate_limit_tiers,
            dns_rebinding_allowed_origins: None,
            request_timeout_secs: 30,
            max_retry_attempts: 3,
            retry_base_delay_secs: 60,
        }
    }
}

impl Config {
    pub fn rate_limit_for(&self, tier: Tier) -> RateLimitPolicy {
        self.rate_limit_tiers
            .get(&tier)
            .copied()
            .unwrap_or(RateLimitPolicy {
                hourly: 1_000,
                daily: 10_000,
            })
    }
}
