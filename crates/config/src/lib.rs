//! Configuration loading, validation, and management for Kyoryoku.
//!
//! Loads configuration from `~/.kyoryoku/config.toml` with environment
//! variable overrides. Validates all settings at startup; a missing
//! credential is reported by [`AppConfig::require_credentials`] before the
//! first model call is ever attempted.

use kyoryoku_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.kyoryoku/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for every stage call
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per stage call
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Per-call settings
    #[serde(default)]
    pub stage: StageConfig,

    /// Admission control for in-flight model calls
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Retry-with-backoff policy for transient model-call failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Support pipeline gates
    #[serde(default)]
    pub support: SupportConfig,

    /// Refinement loop settings
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20241022".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}

/// Providers that run locally and need no API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("stage", &self.stage)
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("support", &self.support)
            .field("refinement", &self.refinement)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Upper bound on a single model call, queueing included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl StageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Ceiling on simultaneously in-flight model calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Callers allowed to wait for a slot; further callers are rejected
    #[serde(default = "default_max_waiting")]
    pub max_waiting: usize,
}

fn default_max_in_flight() -> usize {
    20
}
fn default_max_waiting() -> usize {
    100
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            max_waiting: default_max_waiting(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 0 = fail fast and let escalation logic handle it
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8_000
}
fn default_multiplier() -> f64 {
    2.0
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Triage below this confidence escalates immediately
    #[serde(default = "default_triage_threshold")]
    pub triage_threshold: f64,

    /// Min confidence across triage/research/craft below which escalation is added
    #[serde(default = "default_overall_threshold")]
    pub overall_threshold: f64,
}

fn default_triage_threshold() -> f64 {
    0.6
}
fn default_overall_threshold() -> f64 {
    0.8
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            triage_threshold: default_triage_threshold(),
            overall_threshold: default_overall_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Rounds after the first stop once round confidence exceeds this
    #[serde(default = "default_early_stop_threshold")]
    pub early_stop_threshold: f64,

    /// Every round must exceed this for the run to count as coordinated
    #[serde(default = "default_coordination_threshold")]
    pub coordination_threshold: f64,

    #[serde(default = "default_iterations")]
    pub default_iterations: u32,

    /// Hard ceiling on caller-requested rounds
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_early_stop_threshold() -> f64 {
    0.9
}
fn default_coordination_threshold() -> f64 {
    0.6
}
fn default_iterations() -> u32 {
    2
}
fn default_max_iterations() -> u32 {
    5
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            early_stop_threshold: default_early_stop_threshold(),
            coordination_threshold: default_coordination_threshold(),
            default_iterations: default_iterations(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.kyoryoku/config.toml).
    ///
    /// Also checks environment variables:
    /// - `KYORYOKU_API_KEY` (highest priority)
    /// - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` / `OPENROUTER_API_KEY`
    /// - `KYORYOKU_PROVIDER`, `KYORYOKU_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from `path` when given, otherwise from the default location,
    /// then apply environment overrides.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("KYORYOKU_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("KYORYOKU_MODEL") {
            self.default_model = model;
        }
        if self.api_key.is_none() {
            let vendor_keys: &[&str] = if self.default_provider == "anthropic" {
                &["ANTHROPIC_API_KEY"]
            } else {
                &["OPENAI_API_KEY", "OPENROUTER_API_KEY"]
            };
            self.api_key = lookup("KYORYOKU_API_KEY")
                .or_else(|| vendor_keys.iter().find_map(|k| lookup(k)))
                .filter(|k| !k.is_empty());
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".kyoryoku")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "default_max_tokens must be > 0".into(),
            ));
        }
        if self.stage.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "stage.timeout_secs must be > 0".into(),
            ));
        }
        if self.concurrency.max_in_flight == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency.max_in_flight must be > 0".into(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }
        for (name, value) in [
            ("support.triage_threshold", self.support.triage_threshold),
            ("support.overall_threshold", self.support.overall_threshold),
            (
                "refinement.early_stop_threshold",
                self.refinement.early_stop_threshold,
            ),
            (
                "refinement.coordination_threshold",
                self.refinement.coordination_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }
        if self.refinement.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "refinement.max_iterations must be > 0".into(),
            ));
        }
        if self.refinement.default_iterations > self.refinement.max_iterations {
            return Err(ConfigError::ValidationError(
                "refinement.default_iterations must not exceed refinement.max_iterations".into(),
            ));
        }
        Ok(())
    }

    /// The API key for `provider`: the provider's own key, else the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// The model for the default provider, honoring a per-provider override.
    pub fn effective_model(&self) -> String {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Fail if the default provider needs a key and none is configured.
    ///
    /// Call at initialization so a missing credential never surfaces as a
    /// stream of zero-confidence stage results.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if KEYLESS_PROVIDERS.contains(&self.default_provider.as_str()) {
            return Ok(());
        }
        if self.api_key_for(&self.default_provider).is_some() {
            return Ok(());
        }
        let hint = if self.default_provider == "anthropic" {
            "KYORYOKU_API_KEY or ANTHROPIC_API_KEY"
        } else {
            "KYORYOKU_API_KEY or OPENAI_API_KEY"
        };
        Err(ConfigError::MissingCredential {
            provider: self.default_provider.clone(),
            hint: hint.into(),
        })
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Effective config as TOML with secrets removed.
    pub fn redacted_toml(&self) -> String {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.map(|_| "[REDACTED]".into());
        for provider in copy.providers.values_mut() {
            provider.api_key = provider.api_key.take().map(|_| "[REDACTED]".into());
        }
        toml::to_string_pretty(&copy).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            stage: StageConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            support: SupportConfig::default(),
            refinement: RefinementConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.default_max_tokens, 2048);
        assert!((config.default_temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.support.triage_threshold, 0.6);
        assert_eq!(config.support.overall_threshold, 0.8);
        assert_eq!(config.refinement.early_stop_threshold, 0.9);
        assert_eq!(config.refinement.coordination_threshold, 0.6);
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.concurrency.max_in_flight, config.concurrency.max_in_flight);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.support.overall_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("support.overall_threshold"));
    }

    #[test]
    fn zero_in_flight_rejected() {
        let mut config = AppConfig::default();
        config.concurrency.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn iterations_above_ceiling_rejected() {
        let mut config = AppConfig::default();
        config.refinement.default_iterations = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "anthropic");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "claude-test"

[support]
triage_threshold = 0.5

[concurrency]
max_in_flight = 4
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "claude-test");
        assert_eq!(config.support.triage_threshold, 0.5);
        assert_eq!(config.support.overall_threshold, 0.8);
        assert_eq!(config.concurrency.max_in_flight, 4);
        assert_eq!(config.concurrency.max_waiting, 100);
    }

    #[test]
    fn unparseable_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_model = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("KYORYOKU_MODEL", "claude-other"),
            ("ANTHROPIC_API_KEY", "sk-ant-env"),
        ]));
        assert_eq!(config.default_model, "claude-other");
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-env"));
    }

    #[test]
    fn generic_key_wins_over_vendor_key() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("KYORYOKU_API_KEY", "generic"),
            ("ANTHROPIC_API_KEY", "vendor"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn openai_key_used_for_openai_provider() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("KYORYOKU_PROVIDER", "openai"),
            ("ANTHROPIC_API_KEY", "wrong"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn missing_credential_is_reported() {
        let config = AppConfig::default();
        let err = config.require_credentials().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn provider_key_satisfies_credentials() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".into(),
            ProviderConfig {
                api_key: Some("sk-ant-x".into()),
                ..ProviderConfig::default()
            },
        );
        assert!(config.require_credentials().is_ok());
        assert_eq!(config.api_key_for("anthropic").as_deref(), Some("sk-ant-x"));
    }

    #[test]
    fn keyless_provider_needs_no_credentials() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn debug_and_redacted_toml_hide_keys() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
        let rendered = config.redacted_toml();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("anthropic"));
        assert!(toml_str.contains("triage_threshold"));
    }
}
