//! The sequential support workflow.
//!
//! ```text
//! Triage ──(gate A fails)──▶ Escalate ──▶ done
//!   │
//!   ▼
//! Research ──▶ Craft ──(gate B fails)──▶ Escalate
//! ```
//!
//! Gate A short-circuits: a low-confidence or self-escalating triage skips
//! research and crafting entirely. Gate B is additive: the crafted response
//! is kept and an escalation review is attached beside it.

use std::collections::BTreeMap;

use kyoryoku_config::SupportConfig;
use kyoryoku_core::{AgentResult, PipelineContext, StageSpec, TaskVars};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::invoker::StageInvoker;

/// Positions in the support workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportStage {
    #[serde(rename = "triage")]
    Triage,
    #[serde(rename = "research")]
    Research,
    #[serde(rename = "response")]
    Craft,
    #[serde(rename = "escalation")]
    Escalate,
}

impl SupportStage {
    pub fn key(self) -> &'static str {
        match self {
            SupportStage::Triage => "triage",
            SupportStage::Research => "research",
            SupportStage::Craft => "response",
            SupportStage::Escalate => "escalation",
        }
    }
}

impl std::fmt::Display for SupportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

const ESCALATION_CAPABILITIES: &[&str] = &["assess_complexity", "expert_matching"];
const ESCALATION_GOALS: &[&str] = &["Identify cases requiring human expertise"];
const ESCALATION_CONSTRAINTS: &[&str] = &["Err on side of escalation when uncertain"];

pub const TRIAGE: StageSpec = StageSpec {
    key: "triage",
    role_name: "triage_specialist",
    task_template: "Triage this customer support request: {request}",
    context_key: "triage_result",
    capabilities: &["categorize_issues", "identify_urgency", "route_appropriately"],
    goals: &[
        "Categorize incoming requests accurately",
        "Identify urgent issues requiring immediate attention",
    ],
    constraints: &[
        "Must escalate if unsure about urgency",
        "Follow established routing rules",
    ],
    confidence_threshold: Some(0.6),
};

pub const RESEARCH: StageSpec = StageSpec {
    key: "research",
    role_name: "solution_researcher",
    task_template: "Find solution for: {request}",
    context_key: "research_result",
    capabilities: &["search_knowledge_base", "find_past_tickets", "match_solutions"],
    goals: &["Find relevant solutions quickly", "Ensure solution accuracy"],
    constraints: &[
        "Cite sources for all solutions",
        "Verify solution applicability",
    ],
    confidence_threshold: None,
};

pub const CRAFT: StageSpec = StageSpec {
    key: "response",
    role_name: "response_crafter",
    task_template: "Craft customer response for: {request}",
    context_key: "response_result",
    capabilities: &[
        "write_empathetic_responses",
        "maintain_brand_voice",
        "ensure_accuracy",
    ],
    goals: &[
        "Create clear, helpful responses",
        "Maintain consistent brand voice",
    ],
    constraints: &[
        "Never promise what cannot be delivered",
        "Include relevant next steps",
    ],
    confidence_threshold: None,
};

/// Escalation after a failed triage gate.
pub const ESCALATE_AFTER_TRIAGE: StageSpec = StageSpec {
    key: "escalation",
    role_name: "escalation_analyst",
    task_template: "Analyze escalation need for: {request}",
    context_key: "escalation_result",
    capabilities: ESCALATION_CAPABILITIES,
    goals: ESCALATION_GOALS,
    constraints: ESCALATION_CONSTRAINTS,
    confidence_threshold: None,
};

/// Escalation review after a low overall confidence.
pub const ESCALATE_REVIEW: StageSpec = StageSpec {
    key: "escalation",
    role_name: "escalation_analyst",
    task_template: "Review overall confidence for: {request}",
    context_key: "escalation_result",
    capabilities: ESCALATION_CAPABILITIES,
    goals: ESCALATION_GOALS,
    constraints: ESCALATION_CONSTRAINTS,
    confidence_threshold: Some(0.8),
};

/// Outcome of one support run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportRun {
    pub run_id: Uuid,
    /// Every stage that actually ran.
    pub stages: BTreeMap<SupportStage, AgentResult>,
    /// Min of triage, research and craft confidences, when all three ran.
    pub overall_confidence: Option<f64>,
    /// Whether gate A routed straight to escalation.
    pub short_circuited: bool,
    pub cancelled: bool,
}

impl SupportRun {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: BTreeMap::new(),
            overall_confidence: None,
            short_circuited: false,
            cancelled: false,
        }
    }

    pub fn get(&self, stage: SupportStage) -> Option<&AgentResult> {
        self.stages.get(&stage)
    }

    pub fn escalated(&self) -> bool {
        self.stages.contains_key(&SupportStage::Escalate)
    }

    /// The customer-facing reply, if one was crafted.
    pub fn response(&self) -> Option<&AgentResult> {
        self.get(SupportStage::Craft)
    }

    fn cancelled(mut self, before: SupportStage) -> Self {
        info!(run_id = %self.run_id, stage = %before, "Support run cancelled");
        self.cancelled = true;
        self
    }
}

/// Drives the support workflow over a shared [`StageInvoker`].
#[derive(Clone)]
pub struct PipelineOrchestrator {
    invoker: StageInvoker,
    triage: StageSpec,
    review: StageSpec,
}

impl PipelineOrchestrator {
    pub fn new(invoker: StageInvoker, thresholds: &SupportConfig) -> Self {
        Self {
            invoker,
            triage: StageSpec {
                confidence_threshold: Some(thresholds.triage_threshold),
                ..TRIAGE
            },
            review: StageSpec {
                confidence_threshold: Some(thresholds.overall_threshold),
                ..ESCALATE_REVIEW
            },
        }
    }

    /// Run the workflow for `request`. Always returns a run record.
    pub async fn run(
        &self,
        request: &str,
        context: PipelineContext,
        cancel: &CancelSignal,
    ) -> SupportRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("support_run", %run_id);
        self.run_inner(run_id, request, context, cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        request: &str,
        context: PipelineContext,
        cancel: &CancelSignal,
    ) -> SupportRun {
        let mut run = SupportRun::new(run_id);
        let vars = TaskVars {
            request,
            ..TaskVars::default()
        };

        if cancel.is_cancelled() {
            return run.cancelled(SupportStage::Triage);
        }
        let triage = self.stage(&self.triage, &vars, &context).await;
        let triage_passed = self.triage.passes(triage.confidence()) && !triage.escalation_needed();
        let after_triage = context.folded(self.triage.context_key, &triage);
        run.stages.insert(SupportStage::Triage, triage);

        if !triage_passed {
            if cancel.is_cancelled() {
                return run.cancelled(SupportStage::Escalate);
            }
            info!(gate = "triage", "Triage gate failed, escalating");
            run.short_circuited = true;
            let escalation = self.stage(&ESCALATE_AFTER_TRIAGE, &vars, &after_triage).await;
            run.stages.insert(SupportStage::Escalate, escalation);
            return run;
        }

        if cancel.is_cancelled() {
            return run.cancelled(SupportStage::Research);
        }
        let research = self.stage(&RESEARCH, &vars, &after_triage).await;
        let after_research = after_triage.folded(RESEARCH.context_key, &research);
        run.stages.insert(SupportStage::Research, research);

        if cancel.is_cancelled() {
            return run.cancelled(SupportStage::Craft);
        }
        let craft = self.stage(&CRAFT, &vars, &after_research).await;
        run.stages.insert(SupportStage::Craft, craft);

        let overall = [SupportStage::Triage, SupportStage::Research, SupportStage::Craft]
            .iter()
            .filter_map(|s| run.stages.get(s))
            .map(AgentResult::confidence)
            .fold(f64::INFINITY, f64::min);
        run.overall_confidence = Some(overall);

        if !self.review.passes(overall) {
            if cancel.is_cancelled() {
                return run.cancelled(SupportStage::Escalate);
            }
            info!(gate = "overall", confidence = overall, "Overall confidence low, adding escalation review");
            let escalation = self.stage(&ESCALATE_REVIEW, &vars, &after_research).await;
            run.stages.insert(SupportStage::Escalate, escalation);
        }

        info!(
            stages = run.stages.len(),
            overall_confidence = overall,
            escalated = run.escalated(),
            "Support run finished"
        );
        run
    }

    async fn stage(&self, spec: &StageSpec, vars: &TaskVars<'_>, context: &PipelineContext) -> AgentResult {
        debug!(stage = spec.key, role = spec.role_name, "Running support stage");
        self.invoker
            .invoke(spec.role_name, &spec.render_task(vars), context, &spec.overrides())
            .await
    }
}
