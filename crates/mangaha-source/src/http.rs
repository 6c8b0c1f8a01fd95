use std::time::Duration;

use bytes::Bytes;
use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = concat!("mangaha/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{url} still returned {status} after {attempts} attempts")]
    Network {
        url: String,
        status: u16,
        attempts: u32,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Retry budget for idempotent requests.
///
/// A request is attempted once, then retried up to `retries` times while the
/// server answers with one of `statuses`. Retry `n` waits `backoff * 2^(n-1)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
    pub statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(300),
            statuses: vec![500, 502, 504],
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self {
            retries,
            backoff,
            ..Default::default()
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff * 2_u32.saturating_pow(retry.saturating_sub(1))
    }

    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status.as_u16())
    }
}

/// Pooled http client. Clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(retry: RetryPolicy) -> Result<Self, FetchError> {
        let inner = reqwest::ClientBuilder::new()
            .user_agent(DEFAULT_USER_AGENT)
            .brotli(true)
            .deflate(true)
            .gzip(true)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self::with_client(inner, retry))
    }

    pub fn with_client(inner: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { inner, retry }
    }

    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Bytes, FetchError> {
        self.fetch_with_content_type(url, params, timeout)
            .await
            .map(|(bytes, _)| bytes)
    }

    /// GET `url`, returning the body and the `Content-Type` header if any.
    pub async fn fetch_with_content_type(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<(Bytes, Option<String>), FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut retry = 0;
        loop {
            debug!("GET {parsed} (attempt {})", retry + 1);
            let res = self
                .inner
                .get(parsed.clone())
                .query(params)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| map_reqwest_error(url, e))?;

            let status = res.status();
            if status.is_success() {
                let content_type = res
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.to_string());
                let bytes = res.bytes().await.map_err(|e| map_reqwest_error(url, e))?;

                return Ok((bytes, content_type));
            }

            if !self.retry.should_retry(status) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            if retry >= self.retry.retries {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    status: status.as_u16(),
                    attempts: retry + 1,
                });
            }

            retry += 1;
            let delay = self.retry.delay(retry);
            warn!("{url} returned {status}, retrying in {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay(1), Duration::from_millis(300));
        assert_eq!(policy.delay(2), Duration::from_millis(600));
        assert_eq!(policy.delay(3), Duration::from_millis(1200));
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(policy.should_retry(StatusCode::BAD_GATEWAY));
        assert!(policy.should_retry(StatusCode::GATEWAY_TIMEOUT));
        assert!(!policy.should_retry(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.should_retry(StatusCode::NOT_FOUND));
    }
}
