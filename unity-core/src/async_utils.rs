//! Async utilities

use crate::error::{ErrorContext, UnityError, UnityResult};
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Run a fallible operation under a deadline.
///
/// Expiry drops the inner future, aborting any in-flight request, and yields
/// [`UnityError::Timeout`].
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> UnityResult<T>
where
    F: std::future::Future<Output = UnityResult<T>>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms = timeout_ms,
                "Operation deadline exceeded"
            );
            Err(UnityError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &timeout_ms.to_string())
                    .with_suggestion("Increase the operation timeout")
                    .with_suggestion("Check network connectivity to the array"),
            })
        }
    }
}

/// [`with_timeout`] when a deadline is configured, the bare future otherwise
pub async fn with_optional_timeout<F, T>(
    future: F,
    timeout_ms: Option<u64>,
    operation_name: &str,
) -> UnityResult<T>
where
    F: std::future::Future<Output = UnityResult<T>>,
{
    match timeout_ms {
        Some(ms) => with_timeout(future, ms, operation_name).await,
        None => future.await,
    }
}
