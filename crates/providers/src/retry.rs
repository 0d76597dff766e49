//! Retry with exponential backoff for transient provider failures.
//!
//! Wraps the admission-controlled provider, so a call sleeping between
//! attempts does not hold an in-flight slot.

use async_trait::async_trait;
use kyoryoku_core::error::ProviderError;
use kyoryoku_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &kyoryoku_config::RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            multiplier: config.multiplier,
        }
    }

    /// Backoff before retry number `attempt` (1-based), capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Delay before the next attempt, honoring a provider's retry-after hint.
    fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let backoff = self.backoff_for(attempt);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }
}

/// A provider that retries retryable failures of its inner provider.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(provider = %self.inner.name(), attempt, "Retry: call succeeded");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt, &e);
                    warn!(
                        provider = %self.inner.name(),
                        error = %e,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retry: transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FlakyProvider, test_request};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let inner = Arc::new(FlakyProvider::new(
            2,
            ProviderError::Network("conn reset".into()),
        ));
        let retry = RetryProvider::new(inner.clone(), fast_policy(3));

        let result = retry.complete(test_request()).await;
        assert!(result.is_ok());
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(FlakyProvider::new(
            10,
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into(),
            },
        ));
        let retry = RetryProvider::new(inner.clone(), fast_policy(2));

        let result = retry.complete(test_request()).await;
        assert!(matches!(result, Err(ProviderError::ApiError { status_code: 503, .. })));
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_failures() {
        let inner = Arc::new(FlakyProvider::new(
            10,
            ProviderError::AuthenticationFailed("bad key".into()),
        ));
        let retry = RetryProvider::new(inner.clone(), fast_policy(3));

        assert!(retry.complete(test_request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn zero_retries_fails_fast() {
        let inner = Arc::new(FlakyProvider::new(1, ProviderError::Timeout("slow".into())));
        let retry = RetryProvider::new(inner.clone(), RetryPolicy::default());

        assert!(retry.complete(test_request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }
}
