use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::shared::auth::AuthData;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_JITTER_MS: u64 = 500;

/// Failure classification for outbound vendor calls, set at the call site
/// from the transport error or HTTP status rather than inferred from
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorErrorKind {
    Timeout,
    ConnectionFailure,
    ServerError(u16),
    ClientError(u16),
}

impl VendorErrorKind {
    /// Timeouts, connection failures and 5xx responses are worth retrying;
    /// 4xx responses are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, VendorErrorKind::ClientError(_))
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct VendorError {
    pub kind: VendorErrorKind,
    pub message: String,
}

impl VendorError {
    pub fn new(kind: VendorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_transport(err: reqwest::Error, method: &Method, url: &str) -> Self {
        let kind = if err.is_timeout() {
            VendorErrorKind::Timeout
        } else {
            VendorErrorKind::ConnectionFailure
        };
        Self::new(kind, format!("{method} {url} failed: {err}"))
    }

    fn from_status(status: StatusCode, method: &Method, url: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("");
        let message = format!("HTTP {} {} for {} {}", status.as_u16(), reason, method, url);
        if status.is_server_error() {
            Self::new(
                VendorErrorKind::ServerError(status.as_u16()),
                format!("server error: {message}"),
            )
        } else {
            Self::new(
                VendorErrorKind::ClientError(status.as_u16()),
                format!("client error: {message}"),
            )
        }
    }
}

/// Pooled HTTP client for the vendor API with the gateway's retry policy.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new() -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(20)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build vendor http client");
        Self { client }
    }

    /// Form-encoded POST with retry.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        auth: &AuthData,
    ) -> Result<String, VendorError> {
        execute_with_retry(MAX_ATTEMPTS, || {
            self.perform(Method::POST, url, Some(form), auth)
        })
        .await
    }

    /// GET with retry.
    pub async fn get(&self, url: &str, auth: &AuthData) -> Result<String, VendorError> {
        execute_with_retry(MAX_ATTEMPTS, || self.perform(Method::GET, url, None, auth)).await
    }

    async fn perform(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(String, String)]>,
        auth: &AuthData,
    ) -> Result<String, VendorError> {
        debug!("Vendor request: {} {}", method, url);

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(AUTHORIZATION, auth.authorization_header())
            .header(ACCEPT, "application/json");
        if let Some(form) = form {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .form(form);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VendorError::from_transport(e, &method, url))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(VendorError::from_status(status, &method, url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VendorError::from_transport(e, &method, url))?;

        debug!("Vendor response: {} {} -> {}", method, url, status);
        // The vendor occasionally answers 200 with no body; normalize so
        // callers always get a JSON document.
        if body.is_empty() {
            Ok("{}".to_string())
        } else {
            Ok(body)
        }
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation` up to `max_attempts` times, sleeping
/// `1000ms * 2^(attempt-1)` plus up to 500ms of jitter between attempts.
/// Non-retryable errors propagate immediately; the last retryable error is
/// wrapped with the attempt count.
pub async fn execute_with_retry<F, Fut>(max_attempts: u32, operation: F) -> Result<String, VendorError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, VendorError>>,
{
    let mut last_error: Option<VendorError> = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("Request succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt == max_attempts {
                    error!(
                        "Request failed after {} attempts. Final error: {}",
                        max_attempts, err
                    );
                    last_error = Some(err);
                    break;
                }

                if !err.kind.is_retryable() {
                    warn!("Non-retryable error encountered: {}", err);
                    return Err(err);
                }

                let base_delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_MS);
                let delay = Duration::from_millis(base_delay + jitter);
                warn!(
                    "Request attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt,
                    max_attempts,
                    err,
                    delay.as_millis()
                );
                last_error = Some(err);
                tokio::time::sleep(delay).await;
            }
        }
    }

    let last = last_error.expect("retry loop exited without an error");
    Err(VendorError::new(
        last.kind,
        format!("request failed after {max_attempts} attempts: {last}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn retryable(message: &str) -> VendorError {
        VendorError::new(VendorErrorKind::ServerError(502), message.to_string())
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!VendorErrorKind::ClientError(404).is_retryable());
        assert!(VendorErrorKind::ServerError(503).is_retryable());
        assert!(VendorErrorKind::Timeout.is_retryable());
        assert!(VendorErrorKind::ConnectionFailure.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_retryable_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(3, move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(retryable("bad gateway"))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_minimums_grow_exponentially() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let start = tokio::time::Instant::now();
        let result = execute_with_retry(3, move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(retryable("bad gateway"))
                } else {
                    Ok("ok".to_string())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        // Two sleeps: at least 1000ms then at least 2000ms before jitter.
        assert!(start.elapsed() >= Duration::from_millis(3_000));
        assert!(start.elapsed() < Duration::from_millis(4_001));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_stops_after_one_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(3, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(VendorError::new(
                    VendorErrorKind::ClientError(400),
                    "bad request",
                ))
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, VendorErrorKind::ClientError(400));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_wrap_the_last_error() {
        let result = execute_with_retry(3, || async { Err::<String, _>(retryable("boom")) }).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, VendorErrorKind::ServerError(502));
        assert!(err.message.contains("after 3 attempts"));
        assert!(err.message.contains("boom"));
    }
}
