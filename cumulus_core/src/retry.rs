//! Bounded retry with exponential backoff.
//!
//! Wraps the cloud-side reads during reconciliation. Incremental sync does
//! not use it; there the loop's own cadence is the retry.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempts per wrapped operation.
pub const MAX_ATTEMPTS: u32 = 5;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping 1, 2, 4, 8 seconds between
/// failed attempts. The final failure is surfaced wrapped with the attempt
/// count. No jitter; the sleep honours `cancel`.
pub async fn with_retries<T, F, Fut>(cancel: &CancellationToken, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = INITIAL_BACKOFF;
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(Error::RetriesExhausted {
                        attempts: MAX_ATTEMPTS,
                        source: Box::new(err),
                    });
                }
                tracing::warn!(attempt, error = %err, "retrying failed request");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff *= 2;
            }
        }
    }
    unreachable!("retry loop returns from within")
}
