//! Multi-agent orchestration for Kyoryoku.
//!
//! A run sequences model calls under distinct role personas, threads each
//! stage's result into the next stage's context, and branches on the
//! confidence every stage reports:
//!
//! 1. **Compose** the role's instructions and the task/context payload
//! 2. **Call** the model once, bounded by a timeout
//! 3. **Interpret** whatever text comes back into an `AgentResult`
//! 4. **Route** on confidence: gate, escalate, iterate or stop
//!
//! Stage failures never abort a run; they become zero-confidence results
//! that the routing rules escalate.

pub mod cancel;
pub mod interpreter;
pub mod invoker;
pub mod orchestrator;
pub mod prompt;
pub mod refinement;
pub mod support;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use interpreter::{Interpretation, classify, interpret};
pub use invoker::{InvokerSettings, StageInvoker};
pub use orchestrator::{HealthReport, Orchestrator};
pub use prompt::{ComposedPrompt, compose};
pub use refinement::{
    RefinementOrchestrator, RefinementRequest, RefinementStage, RefinementSummary, RoundResult,
};
pub use support::{PipelineOrchestrator, SupportRun, SupportStage};
