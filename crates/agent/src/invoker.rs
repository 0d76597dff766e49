//! The stage invoker: one role, one task, one model call, one result.

use std::sync::Arc;
use std::time::Duration;

use kyoryoku_config::AppConfig;
use kyoryoku_core::error::ProviderError;
use kyoryoku_core::{
    AgentResult, PipelineContext, Provider, ProviderRequest, RoleCatalog, RoleOverrides,
};
use tracing::{debug, warn};

use crate::interpreter;
use crate::prompt;

/// Model-call settings shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokerSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on one call, including time spent queued for admission.
    pub timeout: Duration,
}

impl InvokerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.effective_model(),
            max_tokens: config.default_max_tokens,
            temperature: config.default_temperature,
            timeout: config.stage.timeout(),
        }
    }
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Composes, calls, interprets. Never returns an error.
///
/// Cheap to clone; clones share the provider and catalog.
#[derive(Clone)]
pub struct StageInvoker {
    provider: Arc<dyn Provider>,
    catalog: Arc<RoleCatalog>,
    settings: InvokerSettings,
}

impl StageInvoker {
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<RoleCatalog>,
        settings: InvokerSettings,
    ) -> Self {
        Self {
            provider,
            catalog,
            settings,
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run `role_name` on `task`.
    ///
    /// Transport failures and timeouts come back as a zero-confidence,
    /// escalation-flagged result carrying `metadata.error`.
    pub async fn invoke(
        &self,
        role_name: &str,
        task: &str,
        context: &PipelineContext,
        overrides: &RoleOverrides,
    ) -> AgentResult {
        let role = self.catalog.resolve(role_name).with_overrides(overrides);
        let composed = prompt::compose(&role, task, context);
        let request = ProviderRequest::instructed(
            self.settings.model.clone(),
            composed.system_instructions,
            composed.user_payload,
            self.settings.max_tokens,
            self.settings.temperature,
        );

        debug!(role = %role_name, model = %self.settings.model, "Dispatching stage call");

        let outcome = match tokio::time::timeout(self.settings.timeout, self.provider.complete(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(format!(
                "stage '{role_name}' timed out after {}s",
                self.settings.timeout.as_secs_f64()
            ))),
        };

        match outcome {
            Ok(response) => {
                let result = interpreter::interpret(&response.message.content);
                debug!(
                    role = %role_name,
                    confidence = result.confidence(),
                    escalation = result.escalation_needed(),
                    "Stage completed"
                );
                result
            }
            Err(e) => {
                warn!(role = %role_name, error = %e, "Stage call failed, degrading to zero confidence");
                AgentResult::transport_failure(&e)
            }
        }
    }
}
