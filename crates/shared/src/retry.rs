//! Bounded retry with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::EtlResult;

/// Runs `op` up to `config.max_attempts` times, backing off between
/// attempts, as long as the failure is retryable.
///
/// Non-retryable errors and exhaustion return the last error unchanged.
///
/// # Errors
///
/// Returns the last error from `op`.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, op_name: &str, mut op: F) -> EtlResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EtlResult<T>>,
{
    let mut delay = Duration::from_millis(config.base_delay_ms);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                warn!(
                    operation = op_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
