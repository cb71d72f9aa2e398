//! Timeout and cancellation helpers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{DrummerError, Result};

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(DrummerError::Timeout(duration.as_millis() as u64)),
    }
}

/// Wrap a future with a timeout and cooperative cancellation.
pub async fn with_timeout_and_cancel<T>(
    duration: Duration,
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DrummerError::Canceled),
        result = with_timeout(duration, future) => result,
    }
}
