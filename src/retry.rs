//! Bounded retry with a constant delay
//!
//! Transient failures (transport errors, non-success statuses, broken
//! decompression streams) are retried up to a fixed attempt budget with a
//! short constant pause between attempts. The cancellation token is polled
//! before every attempt; a cancelled run abandons the item immediately.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between attempts. Deliberately constant, not exponential.
pub(crate) const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Run `op` up to `attempts` times, sleeping `delay` between failures.
///
/// `on_retry(attempt, error)` fires after each failed attempt that still has
/// budget left, before the pause. Cancellation observed before an attempt
/// yields [`Error::Cancelled`]; a budget of zero behaves like an item
/// abandoned before its first attempt.
pub(crate) async fn with_attempts<T, F, Fut, R>(
    attempts: u32,
    delay: Duration,
    cancel: &CancellationToken,
    mut op: F,
    mut on_retry: R,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, &Error),
{
    let mut last_err = None;

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt < attempts {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying"
                    );
                    on_retry(attempt, &e);
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(Error::Cancelled))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))
    }

    #[tokio::test]
    async fn success_uses_one_attempt() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = with_attempts(
            3,
            Duration::from_millis(1),
            &cancel,
            || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_budget_exhausted() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let retries_seen = Arc::new(AtomicU32::new(0));
        let retries_clone = retries_seen.clone();

        let result: Result<()> = with_attempts(
            3,
            Duration::from_millis(1),
            &cancel,
            || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            },
            |_, _| {
                retries_clone.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3, "budget is total attempts");
        assert_eq!(
            retries_seen.load(Ordering::SeqCst),
            2,
            "on_retry fires between attempts, not after the last"
        );
    }

    #[tokio::test]
    async fn third_attempt_can_succeed() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = with_attempts(
            3,
            Duration::from_millis(1),
            &cancel,
            || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok("published")
                    }
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result.unwrap(), "published");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_before_any_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<()> = with_attempts(
            3,
            Duration::from_millis(1),
            &cancel,
            || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_, _| {},
        )
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "op must never run");
    }

    #[tokio::test]
    async fn cancellation_between_attempts_stops_the_loop() {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<()> = with_attempts(
            5,
            Duration::from_millis(1),
            &cancel,
            || {
                let calls = calls_clone.clone();
                let cancel = cancel_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                    Err(transient())
                }
            },
            |_, _| {},
        )
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
