//! Shared test helpers for orchestrator tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use kyoryoku_core::error::ProviderError;
use kyoryoku_core::message::Message;
use kyoryoku_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use kyoryoku_core::RoleCatalog;

use crate::invoker::{InvokerSettings, StageInvoker};

/// A mock provider that answers by matching the task line of the request.
///
/// Each rule owns a queue of replies; the last reply repeats once the queue
/// is drained. Requests matching no rule fall back to `default`.
pub struct ScriptedProvider {
    rules: Mutex<Vec<Rule>>,
    default: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

struct Rule {
    needle: String,
    replies: Vec<String>,
    calls: usize,
}

impl ScriptedProvider {
    /// Answer every request with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests whose user payload contains `needle` get `replies` in order.
    pub fn on(self, needle: &str, replies: &[&str]) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            replies: replies.iter().map(|r| r.to_string()).collect(),
            calls: 0,
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// How many requests matched the rule for `needle`.
    pub fn calls_for(&self, needle: &str) -> usize {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.needle == needle)
            .map(|r| r.calls)
            .unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let payload = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let task_line = payload.lines().next().unwrap_or_default().to_string();
        self.requests.lock().unwrap().push(request);

        let mut rules = self.rules.lock().unwrap();
        let reply = match rules.iter_mut().find(|r| task_line.contains(&r.needle)) {
            Some(rule) => {
                let index = rule.calls.min(rule.replies.len().saturating_sub(1));
                rule.calls += 1;
                Ok(rule.replies.get(index).cloned().unwrap_or_default())
            }
            None => self.default.clone(),
        };
        reply.map(|text| make_text_response(&text))
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Timeout("unreachable".into()))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// A JSON reply with the given content and confidence.
pub fn reply(content: &str, confidence: f64) -> String {
    serde_json::json!({
        "content": content,
        "confidence": confidence,
        "reasoning": "scripted",
    })
    .to_string()
}

pub fn invoker_with(provider: Arc<dyn Provider>) -> StageInvoker {
    StageInvoker::new(
        provider,
        Arc::new(RoleCatalog::builtin()),
        InvokerSettings::default(),
    )
}
