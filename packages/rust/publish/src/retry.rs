//! Bounded retry with exponential backoff for transient platform failures.

use std::future::Future;
use std::time::Duration;

use coalwire_shared::{CoalwireError, Result};
use tracing::warn;

/// Default attempt bound for platform delivery.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Run `op` up to `max_attempts` times, sleeping 1s, 2s, 4s... between
/// attempts. The last error is returned when every attempt fails.
pub async fn with_backoff<T, F, Fut>(max_attempts: u32, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..max_attempts {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1 << (attempt - 1))).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(what, attempt = attempt + 1, max = max_attempts, error = %e, "attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| CoalwireError::Publish(format!("{what}: retries exhausted"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(CoalwireError::Network("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff(2, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CoalwireError::Network("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
