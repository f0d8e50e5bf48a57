//! Retry with exponential backoff for HTTP calls.

use std::future::Future;

use meridian_core::{AppError, HttpConfig};
use reqwest::StatusCode;
use tracing::warn;

/// Failure of a single request attempt.
#[derive(Debug)]
pub(crate) struct AttemptError {
    pub(crate) error: AppError,
    pub(crate) retryable: bool,
}

impl AttemptError {
    /// Classifies a reqwest failure; timeouts and connection errors are worth retrying.
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        let retryable = err.is_timeout() || err.is_connect();
        Self {
            error: AppError::transport(context, err),
            retryable,
        }
    }

    /// Classifies an unsuccessful HTTP status; server errors and 429 are retried.
    pub(crate) fn from_status(context: &str, status: StatusCode, body: &str) -> Self {
        let detail = match body.trim() {
            "" => format!("HTTP {status}"),
            body => format!("HTTP {status}: {}", truncate(body, 200)),
        };
        Self {
            error: AppError::transport(context, detail),
            retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Runs `op` until it succeeds, fails permanently, or `config.max_retries`
/// retries have been spent.
pub(crate) async fn with_retries<T, F, Fut>(
    config: &HttpConfig,
    context: &str,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.retryable && attempt < config.max_retries => {
                let delay = config.retry_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    "{} failed, retrying in {:?}: {}",
                    context,
                    delay,
                    failure.error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure.error),
        }
    }
}
