//! Bounded linear-backoff retry for store operations.
//!
//! Retry `n` waits `n * retry_base_delay` before running; after
//! `max_retries` retries the operation is abandoned. With the defaults a
//! failing operation runs at t = 0 s, 1 s, 3 s and 6 s and is then dropped.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::error::{BackendError, SyncError};

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded(T),
    /// Every attempt failed; carries the last error.
    Exhausted(SyncError),
    /// The cancellation token fired first.
    Cancelled,
}

/// Delay before retry number `attempt` (1-based).
pub fn retry_delay(attempt: u32, config: &SyncConfig) -> Duration {
    config.retry_base_delay * attempt
}

/// Bound a store call by `after`, mapping expiry to [`SyncError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(SyncError::from),
        Err(_) => Err(SyncError::Timeout { operation, after }),
    }
}

/// Run `op` until it succeeds, retries are exhausted or `cancel` fires.
pub async fn retry_with_backoff<T, F, Fut>(
    operation: &'static str,
    config: &SyncConfig,
    cancel: &CancellationToken,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut attempt = 0u32;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
            result = op() => result,
        };

        let err = match result {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "Operation recovered");
                }
                return RetryOutcome::Succeeded(value);
            }
            Err(e) => e,
        };

        if attempt >= config.max_retries {
            tracing::warn!(
                operation,
                attempts = attempt + 1,
                error = %err,
                "Giving up after exhausting retries",
            );
            return RetryOutcome::Exhausted(err);
        }

        attempt += 1;
        let delay = retry_delay(attempt, config);
        tracing::warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, retrying",
        );

        tokio::select! {
            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
