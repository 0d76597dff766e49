//! Response interpretation: raw model text in, [`AgentResult`] out.
//!
//! Model output is unreliable. It may be clean JSON, JSON wrapped in prose or
//! code fences, JSON with the wrong field types, broken JSON, or plain prose.
//! [`classify`] sorts the text into one of three tiers and
//! [`Interpretation::into_result`] normalizes each tier into a well-formed
//! result. Nothing here can fail.
//!
//! | tier | confidence | escalation | reasoning |
//! |---|---|---|---|
//! | [`Interpretation::Clean`] | from payload, default 0.5 | from payload, default false | from payload |
//! | [`Interpretation::Malformed`] | 0.5 | true | "could not parse structured response" |
//! | [`Interpretation::Unstructured`] | 0.7 | false | "parsed from natural language" |

use kyoryoku_core::AgentResult;
use serde_json::{Map, Value};
use tracing::debug;

/// Confidence assigned to prose answers with no structured span.
pub const UNSTRUCTURED_CONFIDENCE: f64 = 0.7;
/// Confidence assigned when a structured span was found but did not parse,
/// and the default when a payload omits or garbles its confidence.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

pub const UNSTRUCTURED_REASONING: &str = "parsed from natural language";
pub const MALFORMED_REASONING: &str = "could not parse structured response";

/// The three ways a model answer can be read.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// A `{...}` span parsed as a JSON object and was normalized.
    Clean(AgentResult),
    /// A `{...}` span was present but was not a JSON object.
    Malformed { raw: String, error: String },
    /// No `{...}` span at all.
    Unstructured { raw: String },
}

impl Interpretation {
    /// Collapse the tier into the uniform result record.
    pub fn into_result(self) -> AgentResult {
        match self {
            Interpretation::Clean(result) => result,
            Interpretation::Malformed { raw, error } => {
                let mut metadata = Map::new();
                metadata.insert("parse_error".into(), Value::String(error));
                AgentResult::new(raw, FALLBACK_CONFIDENCE, MALFORMED_REASONING)
                    .with_escalation(true)
                    .with_metadata(metadata)
            }
            Interpretation::Unstructured { raw } => {
                AgentResult::new(raw, UNSTRUCTURED_CONFIDENCE, UNSTRUCTURED_REASONING)
            }
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            Interpretation::Clean(_) => "clean",
            Interpretation::Malformed { .. } => "malformed",
            Interpretation::Unstructured { .. } => "unstructured",
        }
    }
}

/// Interpret raw model output. Pure: equal inputs give equal results.
pub fn interpret(raw: &str) -> AgentResult {
    let interpretation = classify(raw);
    debug!(tier = interpretation.tier(), "Interpreted model response");
    interpretation.into_result()
}

/// Sort raw text into a tier.
///
/// The candidate span runs from the first `{` to the last `}`.
pub fn classify(raw: &str) -> Interpretation {
    let Some(span) = structured_span(raw) else {
        return Interpretation::Unstructured {
            raw: raw.to_string(),
        };
    };

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(fields)) => Interpretation::Clean(normalize(fields)),
        Ok(other) => Interpretation::Malformed {
            raw: raw.to_string(),
            error: format!("expected a JSON object, found {}", kind(&other)),
        },
        Err(e) => Interpretation::Malformed {
            raw: raw.to_string(),
            error: e.to_string(),
        },
    }
}

fn structured_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn normalize(mut fields: Map<String, Value>) -> AgentResult {
    let mut notes = Vec::new();

    let content = fields.remove("content").map(flatten).unwrap_or_default();
    let reasoning = match fields.remove("reasoning") {
        Some(Value::Array(items)) => items.into_iter().map(flatten).collect::<Vec<_>>().join(". "),
        Some(other) => flatten(other),
        None => String::new(),
    };
    let suggestions = fields
        .remove("suggestions")
        .map(coerce_suggestions)
        .unwrap_or_default();
    let confidence = match fields.remove("confidence") {
        None | Some(Value::Null) => FALLBACK_CONFIDENCE,
        Some(value) => coerce_confidence(&value).unwrap_or_else(|| {
            notes.push(format!("confidence {value} is not numeric"));
            FALLBACK_CONFIDENCE
        }),
    };
    let escalation_needed = fields
        .remove("escalation_needed")
        .is_some_and(|v| coerce_bool(&v));
    let mut metadata = match fields.remove("metadata") {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("value".into(), other);
            wrapped
        }
    };
    if !notes.is_empty() {
        metadata.insert("coercion_error".into(), Value::String(notes.join("; ")));
    }

    AgentResult::new(content, confidence, reasoning)
        .with_suggestions(suggestions)
        .with_escalation(escalation_needed)
        .with_metadata(metadata)
}

/// Render any JSON value as a plain string.
///
/// Strings are taken verbatim, structures are pretty-printed.
fn flatten(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

fn coerce_suggestions(value: Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| format!("{k}: {}", flatten(v)))
            .collect(),
        Value::Array(items) => items.into_iter().map(flatten).collect(),
        Value::Null => Vec::new(),
        other => vec![flatten(other)],
    }
}

/// A finite number, if the value can be read as one.
fn coerce_confidence(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Booleans may arrive as strings or numbers.
fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_is_unstructured() {
        let result = interpret("Route this to billing, it looks urgent.");
        assert_eq!(result.confidence(), 0.7);
        assert!(!result.escalation_needed());
        assert_eq!(result.reasoning(), UNSTRUCTURED_REASONING);
        assert_eq!(result.content(), "Route this to billing, it looks urgent.");
        assert!(result.metadata().is_empty());
    }

    #[test]
    fn reversed_braces_are_unstructured() {
        let result = interpret("close } before open {");
        assert_eq!(result.confidence(), 0.7);
        assert!(matches!(
            classify("close } before open {"),
            Interpretation::Unstructured { .. }
        ));
    }

    #[test]
    fn broken_span_is_malformed() {
        let raw = "noise {not-json} noise";
        let result = interpret(raw);
        assert_eq!(result.confidence(), 0.5);
        assert!(result.escalation_needed());
        assert_eq!(result.reasoning(), MALFORMED_REASONING);
        assert_eq!(result.content(), raw);
        assert!(result.metadata().contains_key("parse_error"));
    }

    #[test]
    fn clean_payload_normalizes_suggestion_map() {
        let result = interpret(r#"{"content": "ok", "confidence": 0.95, "suggestions": {"a": "b"}}"#);
        assert_eq!(result.content(), "ok");
        assert_eq!(result.confidence(), 0.95);
        assert_eq!(result.suggestions(), ["a: b".to_string()]);
        assert!(!result.escalation_needed());
    }

    #[test]
    fn suggestion_map_keeps_model_order() {
        let result = interpret(r#"{"suggestions": {"zeta": "first", "alpha": "second"}}"#);
        assert_eq!(
            result.suggestions(),
            ["zeta: first".to_string(), "alpha: second".to_string()]
        );
    }

    #[test]
    fn structured_content_keeps_key_order() {
        let result = interpret(r#"{"content": {"title": "Refunds", "body": "Issued within 5 days"}}"#);
        let title = result.content().find("\"title\"").unwrap();
        let body = result.content().find("\"body\"").unwrap();
        assert!(title < body, "keys reordered: {}", result.content());
    }

    #[test]
    fn json_inside_code_fence() {
        let raw = "Here you go:\n```json\n{\"content\": \"refund issued\", \"confidence\": 0.8}\n```";
        let result = interpret(raw);
        assert_eq!(result.content(), "refund issued");
        assert_eq!(result.confidence(), 0.8);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let result = interpret("{}");
        assert_eq!(result.content(), "");
        assert_eq!(result.confidence(), 0.5);
        assert_eq!(result.reasoning(), "");
        assert!(result.suggestions().is_empty());
        assert!(!result.escalation_needed());
        assert!(result.metadata().is_empty());
    }

    #[test]
    fn structured_content_is_serialized() {
        let result = interpret(r#"{"content": {"category": "billing", "urgency": "high"}}"#);
        let reparsed: Value = serde_json::from_str(result.content()).unwrap();
        assert_eq!(reparsed["category"], "billing");
    }

    #[test]
    fn reasoning_list_is_joined() {
        let result = interpret(r#"{"reasoning": ["Billing keyword present", "Customer is angry"]}"#);
        assert_eq!(result.reasoning(), "Billing keyword present. Customer is angry");
    }

    #[test]
    fn scalar_suggestion_is_wrapped() {
        let result = interpret(r#"{"suggestions": "Offer a refund"}"#);
        assert_eq!(result.suggestions(), ["Offer a refund".to_string()]);

        let result = interpret(r#"{"suggestions": [1, "two", {"x": 3}]}"#);
        assert_eq!(result.suggestions().len(), 3);
        assert_eq!(result.suggestions()[0], "1");
        assert_eq!(result.suggestions()[1], "two");
    }

    #[test]
    fn confidence_coercion() {
        assert_eq!(interpret(r#"{"confidence": "0.85"}"#).confidence(), 0.85);
        assert_eq!(interpret(r#"{"confidence": 7}"#).confidence(), 1.0);
        assert_eq!(interpret(r#"{"confidence": -2}"#).confidence(), 0.0);
        assert_eq!(interpret(r#"{"confidence": null}"#).confidence(), 0.5);

        let garbled = interpret(r#"{"confidence": "very high"}"#);
        assert_eq!(garbled.confidence(), 0.5);
        assert!(garbled.metadata().contains_key("coercion_error"));
    }

    #[test]
    fn escalation_coercion() {
        assert!(interpret(r#"{"escalation_needed": "true"}"#).escalation_needed());
        assert!(interpret(r#"{"escalation_needed": "Yes"}"#).escalation_needed());
        assert!(interpret(r#"{"escalation_needed": 1}"#).escalation_needed());
        assert!(!interpret(r#"{"escalation_needed": "false"}"#).escalation_needed());
        assert!(!interpret(r#"{"escalation_needed": 0}"#).escalation_needed());
        assert!(!interpret(r#"{"escalation_needed": null}"#).escalation_needed());
    }

    #[test]
    fn metadata_passes_through() {
        let result = interpret(r#"{"metadata": {"category": "billing"}}"#);
        assert_eq!(result.metadata()["category"], "billing");

        let result = interpret(r#"{"metadata": "loose"}"#);
        assert_eq!(result.metadata()["value"], "loose");
    }

    #[test]
    fn non_object_span_is_malformed() {
        let raw = "{\"a\": 1} and then {\"b\": 2}";
        match classify(raw) {
            Interpretation::Malformed { error, .. } => assert!(!error.is_empty()),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn interpretation_is_idempotent() {
        for raw in [
            "plain words",
            "noise {not-json} noise",
            r#"{"content": "ok", "confidence": 0.4, "suggestions": ["x"], "escalation_needed": true}"#,
            r#"{"confidence": "bogus", "metadata": [1, 2]}"#,
        ] {
            assert_eq!(interpret(raw), interpret(raw));
        }
    }

    #[test]
    fn confidence_always_in_range() {
        for raw in [
            r#"{"confidence": 1e300}"#,
            r#"{"confidence": -1e300}"#,
            r#"{"confidence": "NaN"}"#,
            r#"{"confidence": "inf"}"#,
            r#"{"confidence": [0.3]}"#,
            "{",
            "}",
            "",
        ] {
            let c = interpret(raw).confidence();
            assert!((0.0..=1.0).contains(&c), "{raw} gave {c}");
        }
    }
}
