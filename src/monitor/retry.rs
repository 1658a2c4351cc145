use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

const MAX_RETRIES: u32 = 5;
const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry an RPC operation with exponential backoff until it succeeds,
/// gives up, or `shutdown` fires.
///
/// Returns `Ok(None)` when cancelled, either mid-attempt or while backing off.
pub async fn retry_rpc<F, Fut, T, E>(shutdown: &CancellationToken, mut op: F) -> Result<Option<T>, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = INITIAL_DELAY;
    let mut failures = 0;

    loop {
        let error = tokio::select! {
            result = op() => match result {
                Ok(value) => return Ok(Some(value)),
                Err(e) => e,
            },
            _ = shutdown.cancelled() => return Ok(None),
        };

        failures += 1;
        if failures > MAX_RETRIES {
            return Err(Error::Rpc(format!(
                "gave up after {} attempts: {}",
                failures, error
            )));
        }

        tracing::warn!(
            attempt = failures,
            max_retries = MAX_RETRIES,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "RPC call failed, backing off"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => return Ok(None),
        }
        delay = (delay * 2).min(MAX_DELAY);
    }
}
