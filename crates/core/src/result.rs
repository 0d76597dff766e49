//! The uniform record every pipeline stage produces.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Result of one stage invocation.
///
/// Invariants: `confidence` is always within `[0.0, 1.0]`, and `content` and
/// `reasoning` are always plain strings even when the model answered with
/// nested structures. Values are immutable once built; the builder methods
/// consume and return `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    content: String,
    #[serde(deserialize_with = "deserialize_confidence")]
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    escalation_needed: bool,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Content returned to callers when the model call itself failed.
pub const TRANSPORT_FAILURE_CONTENT: &str = "I encountered an error processing your request.";

impl AgentResult {
    /// Build a result; `confidence` is clamped into `[0, 1]`.
    pub fn new(content: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            suggestions: Vec::new(),
            escalation_needed: false,
            metadata: Map::new(),
        }
    }

    /// The synthetic result for a failed or timed-out model call.
    pub fn transport_failure(error: &ProviderError) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".into(), Value::String(error.to_string()));
        Self::new(TRANSPORT_FAILURE_CONTENT, 0.0, "Technical error occurred")
            .with_escalation(true)
            .with_metadata(metadata)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_escalation(mut self, escalation_needed: bool) -> Self {
        self.escalation_needed = escalation_needed;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn escalation_needed(&self) -> bool {
        self.escalation_needed
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Whether this result is the synthetic transport-failure record.
    pub fn is_transport_failure(&self) -> bool {
        self.confidence == 0.0 && self.escalation_needed && self.metadata.contains_key("error")
    }

    /// JSON rendering used when folding this result into a later stage's context.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "content": self.content,
            "confidence": self.confidence,
            "reasoning": self.reasoning,
            "suggestions": self.suggestions,
            "escalation_needed": self.escalation_needed,
            "metadata": self.metadata,
        })
    }
}

/// Clamp into `[0, 1]`. NaN collapses to 0.0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_confidence(raw))
}
