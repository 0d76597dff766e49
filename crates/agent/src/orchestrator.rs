//! The orchestrator facade handed to whatever serves inbound requests.
//!
//! One `Orchestrator` is built at startup from configuration and a provider,
//! then cloned into every request handler. Clones share the provider stack
//! (and so its admission control) but nothing else; every run owns its own
//! context.

use std::sync::Arc;

use kyoryoku_config::AppConfig;
use kyoryoku_core::error::ConfigError;
use kyoryoku_core::{AgentResult, PipelineContext, Provider, RoleCatalog, RoleOverrides};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cancel::CancelSignal;
use crate::invoker::{InvokerSettings, StageInvoker};
use crate::refinement::{RefinementOrchestrator, RefinementRequest, RefinementSummary};
use crate::support::{PipelineOrchestrator, SupportRun};

const HEALTH_CHECK_TASK: &str = "Health check test";

/// Result of the end-to-end health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub provider: String,
    pub model: String,
    /// The probe stage reached the model and got an answer back.
    pub reachable: bool,
    pub confidence: f64,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    invoker: StageInvoker,
    support: PipelineOrchestrator,
    refinement: RefinementOrchestrator,
}

impl Orchestrator {
    /// Assemble from an explicit provider, catalog and settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<RoleCatalog>,
        config: &AppConfig,
    ) -> Self {
        let invoker = StageInvoker::new(provider, catalog, InvokerSettings::from_config(config));
        Self {
            support: PipelineOrchestrator::new(invoker.clone(), &config.support),
            refinement: RefinementOrchestrator::new(invoker.clone(), config.refinement.clone()),
            invoker,
        }
    }

    /// Build the full provider stack from configuration.
    ///
    /// Fails if credentials are missing or the provider cannot be built, so
    /// a misconfiguration surfaces here and not as a run of zero-confidence
    /// stages.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        config.require_credentials()?;
        let provider = kyoryoku_providers::build_from_config(config)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        info!(
            provider = %provider.name(),
            model = %config.effective_model(),
            "Orchestrator ready"
        );
        Ok(Self::new(provider, Arc::new(RoleCatalog::builtin()), config))
    }

    pub fn catalog(&self) -> &RoleCatalog {
        self.invoker.catalog()
    }

    pub fn settings(&self) -> &InvokerSettings {
        self.invoker.settings()
    }

    pub async fn run_support(&self, request: &str, context: PipelineContext) -> SupportRun {
        self.support.run(request, context, &CancelSignal::never()).await
    }

    pub async fn run_support_with_cancel(
        &self,
        request: &str,
        context: PipelineContext,
        cancel: &CancelSignal,
    ) -> SupportRun {
        self.support.run(request, context, cancel).await
    }

    pub async fn run_refinement(&self, request: &RefinementRequest) -> RefinementSummary {
        self.refinement.run(request, &CancelSignal::never()).await
    }

    pub async fn run_refinement_with_cancel(
        &self,
        request: &RefinementRequest,
        cancel: &CancelSignal,
    ) -> RefinementSummary {
        self.refinement.run(request, cancel).await
    }

    /// A single agent call outside any workflow.
    pub async fn run_stage(
        &self,
        role: &str,
        task: &str,
        context: &PipelineContext,
        overrides: &RoleOverrides,
    ) -> AgentResult {
        self.invoker.invoke(role, task, context, overrides).await
    }

    /// Run a triage stage on a canned task and report whether the model answered.
    pub async fn health_check(&self) -> HealthReport {
        let mut context = PipelineContext::new();
        context.insert("test", true);
        let overrides = RoleOverrides::from_slices(
            &["categorize_issues"],
            &["Test functionality"],
            &["Keep response brief"],
        );
        let result = self
            .invoker
            .invoke(self.catalog().default_role(), HEALTH_CHECK_TASK, &context, &overrides)
            .await;

        let error = result
            .is_transport_failure()
            .then(|| {
                result
                    .metadata()
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            });

        HealthReport {
            provider: self.invoker.provider_name().to_string(),
            model: self.settings().model.clone(),
            reachable: error.is_none(),
            confidence: result.confidence(),
            error,
        }
    }
}
