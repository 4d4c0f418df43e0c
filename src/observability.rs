//! Structured logging bootstrap. Stays intentionally small: one place to
//! flip verbosity, one place logs land (stderr, JSON), so stdout remains
//! machine-parseable for `--stdio` tool-protocol framing.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize logging using the configured level string (`debug|info|warn|error`).
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter_level = match level {
        "debug" => "kotadb=debug,info",
        "warn" => "kotadb=warn,error",
        "error" => "error",
        _ => "kotadb=info,warn",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => Ok(()),
        Err(_) => Ok(()), // already initialized (common in test binaries)
    }
}

/// A correlation id attached to a request span so log lines for one
/// request can be grep'd together across the auth/rate-limit/dispatch path.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
