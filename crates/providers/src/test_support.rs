//! Mock providers shared by the wrapper tests.

use async_trait::async_trait;
use kyoryoku_core::error::ProviderError;
use kyoryoku_core::message::Message;
use kyoryoku_core::provider::*;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn test_request() -> ProviderRequest {
    ProviderRequest::instructed("test", "system", "hello", 64, 0.3)
}

fn ok_response() -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant("success"),
        usage: None,
        model: "test-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// Sleeps for a fixed delay and records peak concurrency.
pub(crate) struct BlockingProvider {
    delay: Duration,
    state: Mutex<(usize, usize, usize)>, // (calls, current, peak)
}

impl BlockingProvider {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new((0, 0, 0)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.state.lock().unwrap().0
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.state.lock().unwrap().2
    }
}

#[async_trait]
impl Provider for BlockingProvider {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        {
            let mut state = self.state.lock().unwrap();
            state.0 += 1;
            state.1 += 1;
            state.2 = state.2.max(state.1);
        }
        tokio::time::sleep(self.delay).await;
        self.state.lock().unwrap().1 -= 1;
        Ok(ok_response())
    }
}

/// Fails the first `failures` calls with `error`, then succeeds.
pub(crate) struct FlakyProvider {
    failures: usize,
    error: ProviderError,
    call_count: Mutex<usize>,
}

impl FlakyProvider {
    pub(crate) fn new(failures: usize, error: ProviderError) -> Self {
        Self {
            failures,
            error,
            call_count: Mutex::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        if call <= self.failures {
            Err(self.error.clone())
        } else {
            Ok(ok_response())
        }
    }
}
