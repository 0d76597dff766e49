//! LLM provider implementations for Kyoryoku.
//!
//! All providers implement the `kyoryoku_core::Provider` trait.
//! The router builds the configured vendor provider and wraps it in
//! admission control and retry.

pub mod admission;
pub mod anthropic;
pub mod openai_compat;
pub mod retry;
pub mod router;

#[cfg(test)]
mod test_support;

pub use admission::AdmissionControl;
pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryProvider};
pub use router::{build_base, build_from_config, wrap};

/// Seconds from a `retry-after` header, defaulting to 5.
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(5)
}
