//! Per-run context accumulator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::result::AgentResult;

/// String-keyed context threaded through one orchestrator run.
///
/// Starts from the caller's context and grows only by folding in the results
/// of stages that already ran. Owned by the orchestrator driving the run and
/// never shared across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineContext(Map<String, Value>);

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a caller-supplied map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Seed from an arbitrary JSON value. Non-object values are kept under `"input"`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                let mut map = Map::new();
                map.insert("input".into(), other);
                Self(map)
            }
        }
    }

    /// Set a plain entry, e.g. `content_type` or `iteration`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Fold a stage result in under `key`, replacing any earlier value.
    pub fn fold(&mut self, key: impl Into<String>, result: &AgentResult) {
        self.0.insert(key.into(), result.to_value());
    }

    /// A copy of this context with `result` folded in under `key`.
    pub fn folded(&self, key: impl Into<String>, result: &AgentResult) -> Self {
        let mut next = self.clone();
        next.fold(key, result);
        next
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Indented JSON rendering for prompt payloads.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".into())
    }
}

impl From<Map<String, Value>> for PipelineContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
