//! HTTP transport and the retrying decorator.
//!
//! The client talks to the node and gateway only through [`HttpTransport`],
//! so tests and embedders can swap in their own implementation.

use crate::error::{Error, Result, is_retryable_status};
use async_trait::async_trait;
use irys_core::RetryConfig;
use std::sync::RwLock;
use std::time::Duration;

/// Executes a single HTTP request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response>;

    /// Release pooled connections. Calling it more than once is harmless.
    fn close(&self);
}

/// Plain reqwest transport with a shared connection pool.
pub struct ReqwestTransport {
    http: RwLock<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::from_client(http))
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self {
            http: RwLock::new(Some(http)),
        }
    }

    fn client(&self) -> Option<reqwest::Client> {
        self.http
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let http = self.client().ok_or(Error::Closed)?;
        let endpoint = request.url().to_string();
        http.execute(request)
            .await
            .map_err(|e| Error::network(endpoint, e))
    }

    fn close(&self) {
        // Dropping the last client handle closes its idle connections.
        self.http
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

/// Exponential backoff: `wait_min`, doubling per attempt, capped at `wait_max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.wait_min.saturating_mul(factor).min(self.wait_max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            wait_min: config.wait_min(),
            wait_max: config.wait_max(),
        }
    }
}

/// Retries transient failures of an inner transport.
///
/// Connection and timeout errors, 429 and 5xx (except 501) are retried.
/// Requests whose body cannot be cloned (streams) are sent exactly once.
pub struct RetryTransport<T> {
    inner: T,
    policy: BackoffPolicy,
}

impl<T: HttpTransport> RetryTransport<T> {
    pub fn new(inner: T, policy: BackoffPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryTransport<T> {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let mut request = request;
        let mut attempt = 0u32;
        loop {
            let next = if attempt < self.policy.max_retries {
                request.try_clone()
            } else {
                None
            };
            let endpoint = request.url().to_string();
            let method = request.method().clone();
            let result = self.inner.execute(request).await;

            let Some(next) = next else {
                return result;
            };
            let reason = match &result {
                Ok(response) if is_retryable_status(response.status().as_u16()) => {
                    Some(format!("status {}", response.status()))
                }
                Err(err) if err.is_transient() => Some(err.to_string()),
                _ => None,
            };
            let Some(reason) = reason else {
                return result;
            };

            let delay = self.policy.delay(attempt);
            tracing::warn!(
                %method,
                endpoint = %endpoint,
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Request failed, retrying"
            );
            if let Ok(response) = result {
                // Drain so the connection returns to the pool.
                let _ = response.bytes().await;
            }
            tokio::time::sleep(delay).await;
            request = next;
            attempt += 1;
        }
    }

    fn close(&self) {
        self.inner.close();
    }
}
