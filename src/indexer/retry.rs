//! Retry policy: transient failures (network, `store_busy`, I/O
//! interruption) retry with exponential backoff up to a configured maximum.

use crate::error::{KotaError, Result};
use std::time::Duration;
use tracing::warn;

/// The indexer's pipeline runs synchronously inside a `spawn_blocking` task,
/// so this is the only retry entry point it needs.
pub fn with_retry_blocking<T>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                warn!(attempt, ?delay, error = %e, "transient failure, retrying");
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retry_blocking(3, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(KotaError::StoreBusy)
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn does_not_retry_permanent_failures() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_retry_blocking(3, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(KotaError::RefNotFound("main".into()))
        });
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
