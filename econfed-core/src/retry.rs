//! Retry with exponential backoff and rate-limit awareness.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use econfed_types::{FedError, Provider, RetryConfig};

/// How an HTTP status maps onto the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Ok,
    /// 429: retryable with backoff, honouring Retry-After.
    RateLimited,
    /// 5xx: retryable.
    ServerError,
    /// 400/403/404/422: terminal, converts to `DataNotAvailable`.
    NoData,
    /// Any other non-success status: terminal.
    OtherClientError,
}

/// Classify an HTTP status code for retry purposes.
#[must_use]
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Ok,
        429 => StatusClass::RateLimited,
        500..=599 => StatusClass::ServerError,
        400 | 403 | 404 | 422 => StatusClass::NoData,
        _ => StatusClass::OtherClientError,
    }
}

/// Convert an HTTP response into a `FedError` according to the shared
/// classification, reading `Retry-After` when rate limited. Returns `Ok`
/// with the response for 2xx.
pub fn check_response(
    provider: Provider,
    resp: reqwest::Response,
) -> Result<reqwest::Response, FedError> {
    let status = resp.status().as_u16();
    match classify_status(status) {
        StatusClass::Ok => Ok(resp),
        StatusClass::RateLimited => {
            let retry_after_ms = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(0, |secs| secs * 1000);
            Err(FedError::RateLimited { retry_after_ms })
        }
        StatusClass::ServerError => Err(FedError::Transport(format!(
            "{provider} returned server error {status}"
        ))),
        StatusClass::NoData => Err(FedError::not_available(
            provider,
            format!("API returned {status} for this request"),
        )),
        StatusClass::OtherClientError => Err(FedError::provider(
            provider,
            format!("unexpected status {status}"),
        )),
    }
}

/// Run `op` with the configured retry policy.
///
/// Retries on [`FedError::Transport`] and [`FedError::RateLimited`];
/// everything else propagates immediately. Rate-limit waits honour the
/// upstream `Retry-After` with the configured floor, then double; plain
/// transport failures back off exponentially with uniform jitter. After the
/// final attempt a rate-limit error is promoted to `DataNotAvailable` so
/// the fallback chain engages.
pub async fn retry_with_backoff<T, F, Fut>(
    provider: Provider,
    cfg: &RetryConfig,
    max_attempts: u32,
    mut op: F,
) -> Result<T, FedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FedError>>,
{
    // Total calls: the initial attempt plus up to five configured retries.
    let attempts = max_attempts.clamp(1, 6);
    let mut delay = cfg.initial_delay;
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(FedError::RateLimited { retry_after_ms }) => {
                if attempt == attempts {
                    tracing::warn!(
                        target: "econfed::retry",
                        %provider,
                        attempts,
                        "rate limit budget exhausted"
                    );
                    return Err(FedError::not_available(
                        provider,
                        format!("rate limit exceeded after {attempts} attempts"),
                    ));
                }
                // Honour Retry-After when present; otherwise apply the floor.
                let wait = if retry_after_ms > 0 {
                    Duration::from_millis(retry_after_ms).max(cfg.rate_limit_floor)
                } else {
                    delay.max(cfg.rate_limit_floor)
                };
                tracing::warn!(
                    target: "econfed::retry",
                    %provider,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "429 received, backing off"
                );
                tokio::time::sleep(wait).await;
                delay = mul_duration(wait, cfg.backoff_factor);
                last_err = Some(FedError::RateLimited { retry_after_ms });
            }
            Err(e @ FedError::Transport(_)) => {
                if attempt == attempts {
                    return Err(e);
                }
                let wait = delay + jitter(cfg.jitter);
                tracing::warn!(
                    target: "econfed::retry",
                    %provider,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(wait).await;
                delay = mul_duration(delay, cfg.backoff_factor);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| FedError::Other("retry loop exhausted".into())))
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(0..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

fn mul_duration(d: Duration, factor: f64) -> Duration {
    Duration::from_secs_f64(d.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_cfg() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
            jitter: Duration::ZERO,
            rate_limit_floor: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn three_failures_then_success_succeeds_with_four_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let res = retry_with_backoff(Provider::Fred, &fast_cfg(), 4, move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(FedError::Transport("500".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_transport_error() {
        let res: Result<(), _> = retry_with_backoff(Provider::Fred, &fast_cfg(), 3, || async {
            Err(FedError::Transport("500".into()))
        })
        .await;
        assert!(matches!(res, Err(FedError::Transport(_))));
    }

    #[tokio::test]
    async fn terminal_errors_do_not_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let res: Result<(), _> = retry_with_backoff(Provider::Imf, &fast_cfg(), 3, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(FedError::not_available(Provider::Imf, "404"))
            }
        })
        .await;
        assert!(matches!(res, Err(FedError::DataNotAvailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limit_honours_retry_after() {
        let start = std::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let res = retry_with_backoff(Provider::Oecd, &fast_cfg(), 2, move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FedError::RateLimited {
                        retry_after_ms: 50,
                    })
                } else {
                    Ok(1)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn exhausted_rate_limit_promotes_to_not_available() {
        let res: Result<(), _> = retry_with_backoff(Provider::Oecd, &fast_cfg(), 2, || async {
            Err(FedError::RateLimited { retry_after_ms: 0 })
        })
        .await;
        assert!(matches!(res, Err(FedError::DataNotAvailable { .. })));
    }

    #[test]
    fn status_classification_matches_policy() {
        assert_eq!(classify_status(200), StatusClass::Ok);
        assert_eq!(classify_status(429), StatusClass::RateLimited);
        assert_eq!(classify_status(503), StatusClass::ServerError);
        for s in [400, 403, 404, 422] {
            assert_eq!(classify_status(s), StatusClass::NoData);
        }
        assert_eq!(classify_status(418), StatusClass::OtherClientError);
    }
}
