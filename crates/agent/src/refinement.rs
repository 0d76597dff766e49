//! The iterative content-refinement workflow.
//!
//! Each round runs five roles in a fixed chain. Every role works on the
//! previous role's output and sees the previous role's full result in its
//! context. The Hook output of one round is the source of the next.
//! After any round past the first, a round whose weakest stage clears the
//! early-stop threshold ends the run.

use std::collections::BTreeMap;

use kyoryoku_config::RefinementConfig;
use kyoryoku_core::{AgentResult, PipelineContext, StageSpec, TaskVars};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::invoker::StageInvoker;

pub const DEFAULT_CONTENT_TYPE: &str = "blog_post";
pub const DEFAULT_AUDIENCE: &str = "business_professionals";

/// Positions in a refinement round, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RefinementStage {
    #[serde(rename = "story_mining")]
    Mine,
    #[serde(rename = "structure")]
    Structure,
    #[serde(rename = "translation")]
    Translate,
    #[serde(rename = "voice")]
    Voice,
    #[serde(rename = "hooks")]
    Hook,
}

impl RefinementStage {
    pub const CHAIN: [RefinementStage; 5] = [
        RefinementStage::Mine,
        RefinementStage::Structure,
        RefinementStage::Translate,
        RefinementStage::Voice,
        RefinementStage::Hook,
    ];

    pub fn spec(self) -> &'static StageSpec {
        match self {
            RefinementStage::Mine => &MINE,
            RefinementStage::Structure => &STRUCTURE,
            RefinementStage::Translate => &TRANSLATE,
            RefinementStage::Voice => &VOICE,
            RefinementStage::Hook => &HOOK,
        }
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }
}

impl std::fmt::Display for RefinementStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

pub const MINE: StageSpec = StageSpec {
    key: "story_mining",
    role_name: "story_miner",
    task_template: "Extract compelling narratives from this material: {content}",
    context_key: "story_mining_result",
    capabilities: &[
        "extract_narratives",
        "identify_compelling_stories",
        "find_human_elements",
    ],
    goals: &[
        "Find the most compelling stories in source material",
        "Identify relatable human elements",
    ],
    constraints: &[
        "Stay true to source material facts",
        "Focus on authentic experiences",
    ],
    confidence_threshold: None,
};

pub const STRUCTURE: StageSpec = StageSpec {
    key: "structure",
    role_name: "structure_architect",
    task_template: "Organize this content into compelling narrative flow: {content}",
    context_key: "structure_result",
    capabilities: &[
        "organize_narrative_flow",
        "create_logical_progression",
        "build_compelling_structure",
    ],
    goals: &[
        "Create clear, logical narrative progression",
        "Organize ideas for maximum impact",
    ],
    constraints: &["Maintain logical coherence", "Keep reader engagement high"],
    confidence_threshold: None,
};

pub const TRANSLATE: StageSpec = StageSpec {
    key: "translation",
    role_name: "technical_translator",
    task_template: "Simplify complex concepts for {audience}: {content}",
    context_key: "translation_result",
    capabilities: &[
        "simplify_complex_concepts",
        "create_analogies",
        "bridge_technical_gaps",
    ],
    goals: &[
        "Make complex ideas accessible to everyone",
        "Bridge technical and non-technical worlds",
    ],
    constraints: &["Maintain technical accuracy", "Preserve essential meaning"],
    confidence_threshold: None,
};

pub const VOICE: StageSpec = StageSpec {
    key: "voice",
    role_name: "voice_crafter",
    task_template: "Enhance authentic voice and tone: {content}",
    context_key: "voice_result",
    capabilities: &[
        "maintain_authentic_voice",
        "create_personal_tone",
        "ensure_consistency",
    ],
    goals: &[
        "Create authentic, personal connection",
        "Ensure content feels genuinely human",
    ],
    constraints: &[
        "Stay true to brand personality",
        "Avoid generic corporate speak",
    ],
    confidence_threshold: None,
};

pub const HOOK: StageSpec = StageSpec {
    key: "hooks",
    role_name: "hook_designer",
    task_template: "Create engaging hooks and maintain momentum: {content}",
    context_key: "hooks_result",
    capabilities: &[
        "create_compelling_openings",
        "maintain_reader_interest",
        "design_engaging_hooks",
    ],
    goals: &[
        "Capture attention from the first sentence",
        "Create memorable, impactful endings",
    ],
    constraints: &[
        "Stay relevant to core message",
        "Maintain credibility and trust",
    ],
    confidence_threshold: None,
};

/// Inputs to a refinement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRequest {
    pub source: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    /// Requested rounds; `None` uses the configured default.
    #[serde(default)]
    pub iterations: Option<u32>,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.into()
}
fn default_audience() -> String {
    DEFAULT_AUDIENCE.into()
}

impl RefinementRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: default_content_type(),
            target_audience: default_audience(),
            iterations: None,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }
}

/// One pass through the five-role chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based.
    pub round: u32,
    pub stages: BTreeMap<RefinementStage, AgentResult>,
    /// Min confidence across the stages that ran.
    pub round_confidence: f64,
    /// Output of the last stage that ran, normally Hook.
    pub final_content: String,
}

impl RoundResult {
    pub fn get(&self, stage: RefinementStage) -> Option<&AgentResult> {
        self.stages.get(&stage)
    }

    pub fn is_complete(&self) -> bool {
        self.stages.len() == RefinementStage::CHAIN.len()
    }
}

/// Outcome of a refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementSummary {
    pub run_id: Uuid,
    pub rounds: Vec<RoundResult>,
    pub final_content: String,
    pub content_type: String,
    pub target_audience: String,
    pub total_rounds: usize,
    /// Rounds the caller asked for, or the configured default.
    pub requested_rounds: u32,
    /// The request exceeded `max_iterations` and was cut down to it.
    pub rounds_capped: bool,
    /// Every round's confidence exceeded the coordination threshold.
    /// Vacuously true when no rounds were requested.
    pub coordination_success: bool,
    /// More than one round ran.
    pub iterative_improvement: bool,
    /// Five per round.
    pub handoff_count: usize,
    pub cancelled: bool,
}

/// Drives the refinement workflow over a shared [`StageInvoker`].
#[derive(Clone)]
pub struct RefinementOrchestrator {
    invoker: StageInvoker,
    settings: RefinementConfig,
}

impl RefinementOrchestrator {
    pub fn new(invoker: StageInvoker, settings: RefinementConfig) -> Self {
        Self { invoker, settings }
    }

    /// The number of rounds a request will be allowed: at most `max_iterations`.
    ///
    /// Zero is honored and runs no rounds.
    pub fn round_budget(&self, requested: Option<u32>) -> u32 {
        let requested = requested.unwrap_or(self.settings.default_iterations);
        let max = self.settings.max_iterations.max(1);
        if requested > max {
            warn!(requested, max, "Refinement rounds capped");
            return max;
        }
        requested
    }

    pub async fn run(&self, request: &RefinementRequest, cancel: &CancelSignal) -> RefinementSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("refinement_run", %run_id);
        self.run_inner(run_id, request, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        request: &RefinementRequest,
        cancel: &CancelSignal,
    ) -> RefinementSummary {
        let requested_rounds = request.iterations.unwrap_or(self.settings.default_iterations);
        let budget = self.round_budget(Some(requested_rounds));
        let mut rounds = Vec::new();
        let mut content = request.source.clone();
        let mut cancelled = false;

        info!(
            rounds = budget,
            content_type = %request.content_type,
            audience = %request.target_audience,
            "Refinement run started"
        );

        for round in 1..=budget {
            let (result, interrupted) = self.run_round(round, &content, request, cancel).await;
            if let Some(result) = result {
                content = result.final_content.clone();
                let round_confidence = result.round_confidence;
                rounds.push(result);
                if interrupted {
                    cancelled = true;
                    break;
                }
                info!(round, round_confidence, "Refinement round finished");
                if round > 1 && round_confidence > self.settings.early_stop_threshold {
                    info!(round, "Converged, stopping early");
                    break;
                }
            } else {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            info!(completed_rounds = rounds.len(), "Refinement run cancelled");
        }

        let total_rounds = rounds.len();
        let coordination_success = !cancelled
            && rounds
                .iter()
                .all(|r| r.round_confidence > self.settings.coordination_threshold);

        RefinementSummary {
            run_id,
            final_content: content,
            content_type: request.content_type.clone(),
            target_audience: request.target_audience.clone(),
            total_rounds,
            requested_rounds,
            rounds_capped: budget < requested_rounds,
            coordination_success,
            iterative_improvement: total_rounds > 1,
            handoff_count: total_rounds * RefinementStage::CHAIN.len(),
            cancelled,
            rounds,
        }
    }

    /// Run one round. Returns `None` if cancelled before its first stage, and
    /// `interrupted = true` if cancelled part way through.
    async fn run_round(
        &self,
        round: u32,
        source: &str,
        request: &RefinementRequest,
        cancel: &CancelSignal,
    ) -> (Option<RoundResult>, bool) {
        let mut base = PipelineContext::new();
        base.insert("content_type", request.content_type.as_str());
        base.insert("target_audience", request.target_audience.as_str());
        base.insert("iteration", round);

        let mut stages = BTreeMap::new();
        let mut content = source.to_string();
        let mut previous: Option<(&'static str, AgentResult)> = None;
        let mut interrupted = false;

        for stage in RefinementStage::CHAIN {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            let spec = stage.spec();
            let context = match &previous {
                Some((key, result)) => base.folded(*key, result),
                None => base.clone(),
            };
            let task = spec.render_task(&TaskVars {
                request: "",
                content: &content,
                audience: &request.target_audience,
            });

            debug!(round, stage = spec.key, role = spec.role_name, "Running refinement stage");
            let result = self
                .invoker
                .invoke(spec.role_name, &task, &context, &spec.overrides())
                .await;

            content = result.content().to_string();
            previous = Some((spec.context_key, result.clone()));
            stages.insert(stage, result);
        }

        if stages.is_empty() {
            return (None, interrupted);
        }

        let round_confidence = stages
            .values()
            .map(AgentResult::confidence)
            .fold(f64::INFINITY, f64::min);

        (
            Some(RoundResult {
                round,
                stages,
                round_confidence,
                final_content: content,
            }),
            interrupted,
        )
    }
}
