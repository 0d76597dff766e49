//! Prompt composition for a single stage call.

use kyoryoku_core::{PipelineContext, RoleProfile};

const RESPONSE_REMINDER: &str =
    "Please process this request according to your role and respond in the specified JSON format.";

/// The two halves of a stage prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system_instructions: String,
    pub user_payload: String,
}

/// Build the instruction block and task/context block for `role`.
pub fn compose(role: &RoleProfile, task: &str, context: &PipelineContext) -> ComposedPrompt {
    ComposedPrompt {
        system_instructions: system_instructions(role),
        user_payload: user_payload(task, context),
    }
}

/// The role's template with its lists substituted.
///
/// Capabilities are joined with `", "`, goals and constraints with `"; "`.
/// Slots are filled in one pass, so list items that happen to contain a
/// slot name are not expanded again.
pub fn system_instructions(role: &RoleProfile) -> String {
    let capabilities = role.capabilities.join(", ");
    let goals = role.goals.join("; ");
    let constraints = role.constraints.join("; ");
    fill_slots(
        &role.prompt_template,
        &[
            ("{capabilities}", &capabilities),
            ("{goals}", &goals),
            ("{constraints}", &constraints),
        ],
    )
}

/// `TASK: ...`, then the context as pretty JSON when there is any.
pub fn user_payload(task: &str, context: &PipelineContext) -> String {
    let context_block = if context.is_empty() {
        String::new()
    } else {
        format!("\n\nCONTEXT:\n{}", context.to_pretty_json())
    };
    format!("TASK: {task}{context_block}\n\n{RESPONSE_REMINDER}")
}

fn fill_slots(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match slots.iter().find(|(slot, _)| tail.starts_with(slot)) {
            Some((slot, value)) => {
                out.push_str(value);
                rest = &tail[slot.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
