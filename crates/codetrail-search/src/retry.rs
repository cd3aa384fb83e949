//! Exponential backoff retry for rate-limited remote calls, shared by the
//! embedding and explainer adapters: minimum 5s, maximum 20s, up to 3
//! attempts before the error is surfaced.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, SearchError};

const MIN_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(20);
const MAX_ATTEMPTS: u32 = 3;

/// Runs `attempt` up to [`MAX_ATTEMPTS`] times. A [`SearchError::TransientRemote`]
/// triggers a backoff sleep before retrying; any other error or exhausting
/// the attempt budget surfaces immediately.
pub async fn with_retry<T, F, Fut>(mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = MIN_BACKOFF;
    for try_number in 1..=MAX_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(SearchError::TransientRemote(msg)) if try_number < MAX_ATTEMPTS => {
                warn!(attempt = try_number, backoff_secs = backoff.as_secs(), "retrying after transient error: {msg}");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop either returns Ok or Err before exhausting MAX_ATTEMPTS")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_ok() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SearchError::Validation("bad input".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
