//! Static descriptions of pipeline positions.

use crate::role::RoleOverrides;

/// Which role runs at a pipeline position and how its task is phrased.
///
/// `task_template` may reference `{request}`, `{content}` and `{audience}`;
/// unknown placeholders are left as written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSpec {
    /// Key the stage's result is reported under, e.g. `"triage"`.
    pub key: &'static str,
    /// Catalog name of the role to run.
    pub role_name: &'static str,
    pub task_template: &'static str,
    /// Key later stages see this stage's result under, e.g. `"triage_result"`.
    pub context_key: &'static str,
    pub capabilities: &'static [&'static str],
    pub goals: &'static [&'static str],
    pub constraints: &'static [&'static str],
    /// Minimum confidence for the run to proceed past this stage, if gated.
    pub confidence_threshold: Option<f64>,
}

/// Values substituted into a task template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskVars<'a> {
    pub request: &'a str,
    pub content: &'a str,
    pub audience: &'a str,
}

impl StageSpec {
    /// The task string for this stage.
    ///
    /// Substituted text is never re-scanned, so a request that itself
    /// contains `{content}` comes through verbatim.
    pub fn render_task(&self, vars: &TaskVars<'_>) -> String {
        let slots = [
            ("{request}", vars.request),
            ("{content}", vars.content),
            ("{audience}", vars.audience),
        ];
        let mut out = String::with_capacity(self.task_template.len());
        let mut rest = self.task_template;
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

    /// The per-call overrides this stage applies to its role profile.
    ///
    /// Empty slices mean "use the catalog lists".
    pub fn overrides(&self) -> RoleOverrides {
        fn list(items: &[&str]) -> Option<Vec<String>> {
            if items.is_empty() {
                None
            } else {
                Some(items.iter().map(|s| s.to_string()).collect())
            }
        }
        RoleOverrides {
            capabilities: list(self.capabilities),
            goals: list(self.goals),
            constraints: list(self.constraints),
        }
    }

    /// Whether `confidence` clears this stage's gate. Ungated stages always pass.
    pub fn passes(&self, confidence: f64) -> bool {
        self.confidence_threshold.is_none_or(|t| confidence >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: StageSpec = StageSpec {
        key: "translation",
        role_name: "technical_translator",
        task_template: "Simplify complex concepts for {audience}: {content}",
        context_key: "translation_result",
        capabilities: &["simplify_complex_concepts"],
        goals: &[],
        constraints: &["Maintain technical accuracy"],
        confidence_threshold: Some(0.6),
    };

    #[test]
    fn renders_placeholders() {
        let task = SAMPLE.render_task(&TaskVars {
            request: "",
            content: "Rust ownership",
            audience: "investors",
        });
        assert_eq!(task, "Simplify complex concepts for investors: Rust ownership");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let spec = StageSpec {
            task_template: "Refine: {content}",
            ..SAMPLE
        };
        let task = spec.render_task(&TaskVars {
            request: "r",
            content: "literal {request}",
            audience: "a",
        });
        assert_eq!(task, "Refine: literal {request}");

        let support = StageSpec {
            task_template: "Triage this customer support request: {request}",
            ..SAMPLE
        };
        let task = support.render_task(&TaskVars {
            request: "why is {content} empty?",
            ..TaskVars::default()
        });
        assert_eq!(task, "Triage this customer support request: why is {content} empty?");
    }

    #[test]
    fn empty_lists_do_not_override() {
        let overrides = SAMPLE.overrides();
        assert!(overrides.capabilities.is_some());
        assert!(overrides.goals.is_none());
        assert_eq!(
            overrides.constraints,
            Some(vec!["Maintain technical accuracy".to_string()])
        );
    }

    #[test]
    fn gate_threshold() {
        assert!(SAMPLE.passes(0.6));
        assert!(!SAMPLE.passes(0.59));
        let ungated = StageSpec {
            confidence_threshold: None,
            ..SAMPLE
        };
        assert!(ungated.passes(0.0));
    }
}
