//! Bounded retry for registry HTTP calls.
//!
//! Only transport-level failures (connection refused, timeout) are
//! retried; once the registry answers, the response is returned as-is
//! and status handling is the caller's job.

use std::time::Duration;

/// First delay; doubles on every subsequent attempt.
const BASE_DELAY_MS: u64 = 200;

/// Send a request, retrying transport errors up to `retries` times with
/// a doubling backoff (200ms, 400ms, 800ms, ...).
pub(crate) async fn send_with_retry<F, Fut>(
    retries: u32,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) if attempt < retries => {
                let delay = Duration::from_millis(BASE_DELAY_MS << attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    retries,
                    "registry unreachable, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
