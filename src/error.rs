//! Error taxonomy shared across the engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KotaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication denied")]
    AuthDenied,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store busy")]
    StoreBusy,

    #[error("store write error: {0}")]
    StoreWriteError(#[source] rusqlite::Error),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("schema drift detected: {0}")]
    SchemaDrift(String),

    #[error("parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("clone failed: {0}")]
    CloneFailed(String),

    #[error("authentication denied during acquisition")]
    AcquireAuthDenied,

    #[error("transient network error: {0}")]
    NetworkTransient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, KotaError>;

impl KotaError {
    /// SNAKE_CASE wire code used in HTTP error bodies and as the `message`
    /// payload backing every `-32603` JSON-RPC tool failure.
    pub fn code(&self) -> &'static str {
        match self {
            KotaError::InvalidArgument(_) => "invalid_argument",
            KotaError::AuthDenied | KotaError::AcquireAuthDenied => "auth_denied",
            KotaError::RateLimited { .. } => "rate_limited",
            KotaError::NotFound(_) => "not_found",
            KotaError::StoreBusy => "store_busy",
            KotaError::StoreWriteError(_) => "store_write_error",
            KotaError::SchemaError(_) => "schema_error",
            KotaError::SchemaDrift(_) => "schema_drift",
            KotaError::ParseError { .. } => "parse_error",
            KotaError::RefNotFound(_) => "ref_not_found",
            KotaError::CloneFailed(_) => "clone_failed",
            KotaError::NetworkTransient(_) => "network_transient",
            KotaError::Internal(_) => "internal_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            KotaError::InvalidArgument(_) => 400,
            KotaError::AuthDenied | KotaError::AcquireAuthDenied => 401,
            KotaError::RateLimited { .. } => 429,
            KotaError::NotFound(_) => 404,
            KotaError::StoreBusy => 503,
            KotaError::SchemaError(_) => 500,
            _ => 500,
        }
    }

    /// Transient failures are retried by the Indexer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            KotaError::StoreBusy | KotaError::NetworkTransient(_)
        )
    }
}

impl From<rusqlite::Error> for KotaError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                KotaError::StoreBusy
            }
            other => KotaError::StoreWriteError(other),
        }
    }
}

impl From<std::io::Error> for KotaError {
    fn from(e: std::io::Error) -> Self {
        KotaError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for KotaError {
    fn from(e: serde_json::Error) -> Self {
        KotaError::Internal(e.to_string())
    }
}

#[cfg(feature = "git-integration")]
impl From<git2::Error> for KotaError {
    fn from(e: git2::Error) -> Self {
        use git2::ErrorClass;
        match e.class() {
            ErrorClass::Net => KotaError::NetworkTransient(e.message().to_string()),
            ErrorClass::Reference => KotaError::RefNotFound(e.message().to_string()),
            _ => KotaError::CloneFailed(e.message().to_string()),
        }
    }
}
