//! Admission control: a ceiling on in-flight model calls.
//!
//! Every stage of every concurrent run goes through the same provider, so
//! this wrapper is where global back-pressure lives. Callers beyond
//! `max_in_flight` wait for a slot; callers beyond `max_waiting` are
//! rejected immediately with [`ProviderError::Overloaded`].

use async_trait::async_trait;
use kyoryoku_core::error::ProviderError;
use kyoryoku_core::provider::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// A provider wrapper bounding concurrent calls to the inner provider.
pub struct AdmissionControl {
    inner: Arc<dyn Provider>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    max_waiting: usize,
    waiting: AtomicUsize,
}

/// Decrements the waiting count even when the waiting future is dropped.
struct WaitingSlot<'a>(&'a AtomicUsize);

impl Drop for WaitingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionControl {
    pub fn new(inner: Arc<dyn Provider>, max_in_flight: usize, max_waiting: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            max_waiting,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Callers currently queued for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for AdmissionControl {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
                let _slot = WaitingSlot(&self.waiting);
                if queued >= self.max_waiting {
                    warn!(
                        max_in_flight = self.max_in_flight,
                        max_waiting = self.max_waiting,
                        "Admission: rejecting call, queue full"
                    );
                    return Err(ProviderError::Overloaded(format!(
                        "{} calls in flight and {} waiting",
                        self.max_in_flight, self.max_waiting
                    )));
                }
                debug!(waiting = queued + 1, "Admission: waiting for a slot");
                self.permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ProviderError::Overloaded(e.to_string()))?
            }
        };

        let result = self.inner.complete(request).await;
        drop(permit);
        result
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BlockingProvider, test_request};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_ceiling() {
        let inner = Arc::new(BlockingProvider::new(Duration::from_millis(30)));
        let admission = Arc::new(AdmissionControl::new(inner.clone(), 2, 100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let admission = admission.clone();
                tokio::spawn(async move { admission.complete(test_request()).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(inner.calls(), 8);
        assert!(inner.peak_concurrency() <= 2);
        assert_eq!(admission.in_flight(), 0);
        assert_eq!(admission.waiting(), 0);
    }

    #[tokio::test]
    async fn rejects_when_queue_full() {
        let inner = Arc::new(BlockingProvider::new(Duration::from_millis(200)));
        let admission = Arc::new(AdmissionControl::new(inner.clone(), 1, 1));

        let first = {
            let admission = admission.clone();
            tokio::spawn(async move { admission.complete(test_request()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let admission = admission.clone();
            tokio::spawn(async move { admission.complete(test_request()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let third = admission.complete(test_request()).await;
        assert!(matches!(third, Err(ProviderError::Overloaded(_))));

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn zero_ceiling_is_raised_to_one() {
        let inner = Arc::new(BlockingProvider::new(Duration::from_millis(1)));
        let admission = AdmissionControl::new(inner, 0, 0);
        assert!(admission.complete(test_request()).await.is_ok());
    }
}
