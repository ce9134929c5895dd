//! Retry with exponential back-off and jitter for the geography client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx). Everything else is returned
//! immediately: a malformed payload will not fix itself on the next attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::GeoError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx.
///
/// **Not retriable:** 4xx responses, invalid base URL, non-JSON bodies,
/// JSON of the wrong shape.
pub(crate) fn is_retriable(err: &GeoError) -> bool {
    match err {
        GeoError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        GeoError::InvalidBaseUrl { .. }
        | GeoError::Deserialize { .. }
        | GeoError::UnexpectedShape { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based), before jitter.
fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    let exp = attempt.saturating_sub(1).min(10);
    backoff_base_ms.saturating_mul(1u64 << exp).min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// With `backoff_base_ms = 1_000` the sleeps are 1 s, 2 s, 4 s, ... each
/// scaled by a random factor in `[0.75, 1.25)`, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, GeoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeoError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = backoff_delay_ms(backoff_base_ms, attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "geography service transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn deserialize_err() -> GeoError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        GeoError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    async fn connect_err() -> GeoError {
        let err = reqwest::Client::new()
            .get("http://0.0.0.0:1")
            .send()
            .await
            .unwrap_err();
        GeoError::Http(err)
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[test]
    fn unexpected_shape_is_not_retriable() {
        assert!(!is_retriable(&GeoError::UnexpectedShape {
            context: "p/".to_owned(),
            found: "object",
        }));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(1_000, 1), 1_000);
        assert_eq!(backoff_delay_ms(1_000, 2), 2_000);
        assert_eq!(backoff_delay_ms(1_000, 3), 4_000);
        assert_eq!(backoff_delay_ms(1_000, 30), MAX_DELAY_MS);
        assert_eq!(backoff_delay_ms(0, 5), 0);
    }

    #[tokio::test]
    async fn connect_error_is_retriable() {
        assert!(is_retriable(&connect_err().await));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, GeoError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_deserialize_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(deserialize_err())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "Deserialize must not be retried");
        assert!(matches!(result, Err(GeoError::Deserialize { .. })));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(connect_err().await)
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99, "should succeed after retries");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(connect_err().await)
            }
        })
        .await;
        assert!(matches!(result, Err(GeoError::Http(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 attempt + 2 retries");
    }
}
