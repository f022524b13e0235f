//! Outbound HTTP with bounded retries.
//!
//! Every call makes at most `max_attempts` attempts. A 401 ends the call
//! immediately; 429, other non-2xx statuses and transport errors each use up
//! one attempt and are retried after `base_delay * 2^attempt`.

use crate::config::FetchConfig;
use crate::metrics_defs::{UPSTREAM_ATTEMPTS, UPSTREAM_RETRIES_EXHAUSTED};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::counter;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("upstream rejected the credentials (401)")]
    Unauthorized,

    #[error("upstream rate limited the request (429)")]
    RateLimited,

    #[error("upstream responded with {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized)
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::Status(_) | FetchError::Transport(_)
        )
    }

    fn kind(&self) -> &'static str {
        match self {
            FetchError::Unauthorized => "unauthorized",
            FetchError::RateLimited => "rate_limited",
            FetchError::Status(_) => "status",
            FetchError::Transport(_) => "transport",
            FetchError::Decode(_) => "decode",
            FetchError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the retry that follows the zero-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

#[derive(Clone)]
pub struct ResilientFetch {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ResilientFetch {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(ResilientFetch {
            client,
            policy: RetryPolicy::from(config),
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<T, FetchError> {
        let body = self
            .execute(url, || self.client.get(url.clone()).headers(headers.clone()))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST a urlencoded form to `url` and return the body as text.
    pub async fn post_form_text(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let body = self
            .execute(url, || self.client.post(url.clone()).form(form))
            .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn execute<F>(&self, url: &Url, build: F) -> Result<Bytes, FetchError>
    where
        F: Fn() -> RequestBuilder,
    {
        let host = url.host_str().unwrap_or(url.as_str());
        let mut attempt = 0;

        loop {
            let error = match self.attempt(build()).await {
                Ok(body) => {
                    counter!(UPSTREAM_ATTEMPTS, "outcome" => "success").increment(1);
                    return Ok(body);
                }
                Err(e) => e,
            };
            counter!(UPSTREAM_ATTEMPTS, "outcome" => error.kind()).increment(1);
            attempt += 1;

            if !error.is_retryable() {
                tracing::error!(upstream = host, attempt, error = %error, "Upstream call failed, not retrying");
                return Err(error);
            }

            if attempt >= self.policy.max_attempts {
                tracing::error!(upstream = host, attempt, error = %error, "Upstream retries exhausted");
                counter!(UPSTREAM_RETRIES_EXHAUSTED).increment(1);
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.backoff(attempt - 1);
            tracing::warn!(
                upstream = host,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Upstream call failed, retrying"
            );
            sleep(delay).await;
        }
    }

    async fn attempt(&self, request: RequestBuilder) -> Result<Bytes, FetchError> {
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            status => Err(FetchError::Status(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockUpstream;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize)]
    struct Total {
        total: u64,
    }

    fn fast_fetch(max_attempts: u32) -> ResilientFetch {
        ResilientFetch::new(&FetchConfig {
            max_attempts,
            base_delay_ms: 1,
            timeout_ms: 2_000,
            danger_accept_invalid_certs: false,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_success() {
        let upstream = MockUpstream::start(|_req| (200, r#"{"total": 42}"#.to_string())).await;

        let total: Total = fast_fetch(3)
            .get_json(&upstream.url("/v1/search/blog.json"), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(total.total, 42);
        assert_eq!(upstream.hits(), 1);
    }

    #[tokio::test]
    async fn test_server_error_respects_retry_ceiling() {
        let upstream = MockUpstream::start(|_req| (500, String::new())).await;

        let result = fast_fetch(3)
            .get_json::<Total>(&upstream.url("/"), &HeaderMap::new())
            .await;

        assert!(matches!(
            result,
            Err(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(upstream.hits(), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let upstream = MockUpstream::start(|_req| (401, String::new())).await;

        let result = fast_fetch(3)
            .get_json::<Total>(&upstream.url("/"), &HeaderMap::new())
            .await;

        assert!(matches!(result, Err(FetchError::Unauthorized)));
        assert_eq!(upstream.hits(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_consumes_attempts() {
        let upstream = MockUpstream::start(|_req| (429, String::new())).await;

        let result = fast_fetch(2)
            .get_json::<Total>(&upstream.url("/"), &HeaderMap::new())
            .await;

        match result {
            Err(FetchError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, FetchError::RateLimited));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(upstream.hits(), 2);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let upstream = MockUpstream::start(move |_req| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                (503, String::new())
            } else {
                (200, r#"{"total": 7}"#.to_string())
            }
        })
        .await;

        let total: Total = fast_fetch(3)
            .get_json(&upstream.url("/"), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(total.total, 7);
        assert_eq!(upstream.hits(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let upstream = MockUpstream::start(|_req| (200, "<html>".to_string())).await;

        let result = fast_fetch(3)
            .get_json::<Total>(&upstream.url("/"), &HeaderMap::new())
            .await;

        assert!(matches!(result, Err(FetchError::Decode(_))));
        assert_eq!(upstream.hits(), 1);
    }

    #[tokio::test]
    async fn test_post_form() {
        let upstream = MockUpstream::start(|req| (200, format!("echo:{}", req.body))).await;

        let text = fast_fetch(1)
            .post_form_text(&upstream.url("/keyword.php"), &[("keyword", "노트북")])
            .await
            .unwrap();

        assert_eq!(text, "echo:keyword=%EB%85%B8%ED%8A%B8%EB%B6%81");
    }
}
