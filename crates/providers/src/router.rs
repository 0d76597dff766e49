//! Provider router: builds the configured provider stack.
//!
//! The stack handed to the orchestrators is
//! `RetryProvider(AdmissionControl(base))`, where `base` talks to the
//! configured vendor.

use crate::admission::AdmissionControl;
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryProvider};
use kyoryoku_config::AppConfig;
use kyoryoku_core::error::ProviderError;
use kyoryoku_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

/// Build the bare vendor provider for `config.default_provider`.
pub fn build_base(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);
    let api_url = provider_config.and_then(|p| p.api_url.clone());
    let api_key = config.api_key_for(name);

    let provider: Arc<dyn Provider> = match name {
        "anthropic" => {
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured("no API key for anthropic".into())
            })?;
            let mut p = AnthropicProvider::new(api_key)?;
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "ollama" | "vllm" | "llamacpp" | "llama.cpp" => {
            let base_url = api_url.unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiCompatProvider::new(
                name,
                base_url,
                api_key.unwrap_or_else(|| name.to_string()),
            )?)
        }
        _ => {
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured(format!("no API key for {name}"))
            })?;
            let base_url = match api_url {
                Some(url) => url,
                None => known_base_url(name).ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "unknown provider '{name}': set providers.{name}.api_url"
                    ))
                })?,
            };
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)?)
        }
    };

    Ok(provider)
}

/// Build the full stack: retry around admission control around the vendor.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base = build_base(config)?;
    Ok(wrap(base, config))
}

/// Wrap any provider in the configured admission and retry layers.
pub fn wrap(base: Arc<dyn Provider>, config: &AppConfig) -> Arc<dyn Provider> {
    info!(
        provider = %base.name(),
        max_in_flight = config.concurrency.max_in_flight,
        max_waiting = config.concurrency.max_waiting,
        max_retries = config.retry.max_retries,
        "Building provider stack"
    );
    let admitted: Arc<dyn Provider> = Arc::new(AdmissionControl::new(
        base,
        config.concurrency.max_in_flight,
        config.concurrency.max_waiting,
    ));
    Arc::new(RetryProvider::new(
        admitted,
        RetryPolicy::from_config(&config.retry),
    ))
}

fn known_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    known_base_url(provider_name).unwrap_or_else(|| "http://localhost:8080/v1".into())
}
