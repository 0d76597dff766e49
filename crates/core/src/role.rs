//! Agent personas and the static catalog they are looked up from.
//!
//! A [`RoleProfile`] parametrizes a prompt: its capability, goal and constraint
//! lists are substituted into its instruction template. Profiles are defined
//! once at process start and never mutated; per-call variations go through
//! [`RoleOverrides`], which produce a fresh profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The role whose template is used for unknown role names.
pub const DEFAULT_ROLE: &str = "triage_specialist";

/// Static description of an agent persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// Catalog key, e.g. `"solution_researcher"`.
    pub name: String,
    /// Human-facing name, e.g. `"Solution Researcher"`.
    pub display_name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub goals: Vec<String>,
    pub constraints: Vec<String>,
    /// Instruction template with `{capabilities}`, `{goals}` and `{constraints}` slots.
    pub prompt_template: String,
}

impl RoleProfile {
    /// A copy of this profile with any provided lists replaced.
    pub fn with_overrides(&self, overrides: &RoleOverrides) -> Self {
        let mut profile = self.clone();
        if let Some(capabilities) = &overrides.capabilities {
            profile.capabilities = capabilities.clone();
        }
        if let Some(goals) = &overrides.goals {
            profile.goals = goals.clone();
        }
        if let Some(constraints) = &overrides.constraints {
            profile.constraints = constraints.clone();
        }
        profile
    }
}

/// Per-call replacements for a profile's lists. `None` keeps the catalog value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
}

impl RoleOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    /// Override all three lists from static slices.
    pub fn from_slices(capabilities: &[&str], goals: &[&str], constraints: &[&str]) -> Self {
        Self {
            capabilities: Some(to_strings(capabilities)),
            goals: Some(to_strings(goals)),
            constraints: Some(to_strings(constraints)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_none() && self.goals.is_none() && self.constraints.is_none()
    }
}

/// Lookup table of role profiles keyed by name.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    profiles: BTreeMap<String, RoleProfile>,
    default_role: String,
}

impl RoleCatalog {
    /// An empty catalog whose fallback is `default_role`.
    pub fn new(default_role: impl Into<String>) -> Self {
        Self {
            profiles: BTreeMap::new(),
            default_role: default_role.into(),
        }
    }

    /// The built-in support, content and proposal personas.
    pub fn builtin() -> Self {
        let mut catalog = Self::new(DEFAULT_ROLE);
        let default_template = render_template(&TRIAGE);
        for persona in PERSONAS {
            let prompt_template = persona
                .instructions
                .map(render_template)
                .unwrap_or_else(|| default_template.clone());
            catalog.insert(RoleProfile {
                name: persona.name.into(),
                display_name: persona.display_name.into(),
                description: persona.description.into(),
                capabilities: to_strings(persona.capabilities),
                goals: to_strings(persona.goals),
                constraints: to_strings(persona.constraints),
                prompt_template,
            });
        }
        catalog
    }

    pub fn insert(&mut self, profile: RoleProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&RoleProfile> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Look up `name`, never failing.
    ///
    /// Unknown names get a profile carrying that name, empty lists and the
    /// default role's template.
    pub fn resolve(&self, name: &str) -> RoleProfile {
        if let Some(profile) = self.profiles.get(name) {
            return profile.clone();
        }
        debug!(role = %name, fallback = %self.default_role, "Unknown role, using default template");
        let prompt_template = self
            .profiles
            .get(&self.default_role)
            .map(|p| p.prompt_template.clone())
            .unwrap_or_else(|| render_template(&TRIAGE));
        RoleProfile {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            capabilities: Vec::new(),
            goals: Vec::new(),
            constraints: Vec::new(),
            prompt_template,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleProfile> {
        self.profiles.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Built-in personas ──────────────────────────────────────────────────────

struct Persona {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    capabilities: &'static [&'static str],
    goals: &'static [&'static str],
    constraints: &'static [&'static str],
    instructions: Option<&'static Instructions>,
}

/// The parts an instruction template is rendered from.
struct Instructions {
    intro: &'static str,
    per_item: &'static str,
    steps: [&'static str; 4],
    content: &'static str,
    confidence: &'static str,
    reasoning: &'static str,
    suggestions: &'static str,
    escalation: &'static str,
}

fn render_template(ins: &Instructions) -> String {
    let steps: Vec<String> = ins
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect();
    format!(
        "{intro}\n\n\
         CAPABILITIES: {{capabilities}}\n\
         GOALS: {{goals}}\n\
         CONSTRAINTS: {{constraints}}\n\n\
         {per_item}:\n{steps}\n\n\
         Respond in JSON format with:\n\
         - content: {content}\n\
         - confidence: 0.0-1.0 confidence {confidence}\n\
         - reasoning: {reasoning}\n\
         - suggestions: {suggestions}\n\
         - escalation_needed: {escalation}",
        intro = ins.intro,
        per_item = ins.per_item,
        steps = steps.join("\n"),
        content = ins.content,
        confidence = ins.confidence,
        reasoning = ins.reasoning,
        suggestions = ins.suggestions,
        escalation = ins.escalation,
    )
}

static TRIAGE: Instructions = Instructions {
    intro: "You are a Customer Support Triage Specialist agent. Your role is to categorize incoming support requests, assess their urgency, and route them appropriately.",
    per_item: "For each request",
    steps: [
        "Categorize the issue type (technical, billing, account, etc.)",
        "Assess urgency level (low, medium, high, critical)",
        "Determine appropriate routing",
        "Provide clear reasoning for your decisions",
    ],
    content: "Your triage decision and routing recommendation",
    confidence: "in your assessment",
    reasoning: "Brief explanation of your decision process",
    suggestions: "Alternative actions if confidence is low",
    escalation: "true if human review required",
};

static RESEARCHER: Instructions = Instructions {
    intro: "You are a Solution Research Specialist agent. Your role is to find relevant answers in documentation, past tickets, and knowledge bases.",
    per_item: "For each query",
    steps: [
        "Search through available knowledge sources",
        "Find the most relevant and accurate solutions",
        "Rank solutions by relevance and confidence",
        "Cite sources for all recommendations",
    ],
    content: "The solution or information found",
    confidence: "in the solution",
    reasoning: "How you found and validated the solution",
    suggestions: "Alternative solutions or next steps",
    escalation: "true if no sufficient solution found",
};

static CRAFTER: Instructions = Instructions {
    intro: "You are a Response Crafting Specialist agent. Your role is to write empathetic, accurate, and brand-aligned customer responses.",
    per_item: "For each response",
    steps: [
        "Maintain empathetic and professional tone",
        "Ensure accuracy and completeness",
        "Follow brand voice guidelines",
        "Include clear next steps",
    ],
    content: "The customer-ready response",
    confidence: "in response quality",
    reasoning: "Why this response addresses the customer's needs",
    suggestions: "Alternative phrasings or approaches",
    escalation: "true if complex issues require human touch",
};

static ESCALATOR: Instructions = Instructions {
    intro: "You are an Escalation Analysis Specialist agent. Your role is to identify when human intervention is needed and prepare proper handoffs.",
    per_item: "For each case",
    steps: [
        "Assess complexity and risk factors",
        "Determine if human expertise is needed",
        "Identify the right specialist type",
        "Prepare comprehensive handoff documentation",
    ],
    content: "Escalation recommendation and handoff notes",
    confidence: "in escalation decision",
    reasoning: "Factors leading to escalation decision",
    suggestions: "Specialist type and handoff approach",
    escalation: "always true for this agent type",
};

static STORY_MINER: Instructions = Instructions {
    intro: "You are a Story Miner agent for content creation. Your role is to extract compelling narratives and human elements from source material.",
    per_item: "For each piece of source material",
    steps: [
        "Identify the most compelling human stories and experiences",
        "Extract key moments that create emotional connection",
        "Find relatable elements that resonate with audiences",
        "Surface authentic experiences and genuine insights",
    ],
    content: "The compelling narratives and stories you've extracted",
    confidence: "in story relevance and impact",
    reasoning: "Why these stories are compelling and authentic",
    suggestions: "Alternative narrative angles or additional story elements",
    escalation: "true if source material lacks compelling narratives",
};

static STRUCTURE_ARCHITECT: Instructions = Instructions {
    intro: "You are a Structure Architect agent for content creation. Your role is to organize ideas into compelling narrative flow.",
    per_item: "For each piece of content",
    steps: [
        "Create logical progression that builds engagement",
        "Organize ideas for maximum impact and clarity",
        "Ensure smooth transitions between concepts",
        "Structure content for optimal readability and flow",
    ],
    content: "Content restructured for optimal narrative flow",
    confidence: "in structural improvements",
    reasoning: "How the new structure enhances readability and impact",
    suggestions: "Alternative structural approaches or organization methods",
    escalation: "true if content lacks sufficient substance for good structure",
};

static TECHNICAL_TRANSLATOR: Instructions = Instructions {
    intro: "You are a Technical Translator agent for content creation. Your role is to simplify complex concepts for general audiences without losing essential meaning.",
    per_item: "For each technical concept",
    steps: [
        "Break down complex ideas into understandable components",
        "Create analogies and metaphors that clarify meaning",
        "Remove jargon while preserving accuracy",
        "Make concepts accessible to non-technical audiences",
    ],
    content: "Simplified, accessible explanation of the technical concepts",
    confidence: "in translation accuracy and clarity",
    reasoning: "How you maintained accuracy while simplifying",
    suggestions: "Alternative explanations or additional clarifications",
    escalation: "true if concepts are too complex to simplify safely",
};

static VOICE_CRAFTER: Instructions = Instructions {
    intro: "You are a Voice Crafter agent for content creation. Your role is to maintain authentic, personal tone throughout content.",
    per_item: "For each piece of content",
    steps: [
        "Ensure authentic, human voice that connects with readers",
        "Maintain consistent tone and personality",
        "Balance professionalism with genuine warmth",
        "Make content feel personal and engaging",
    ],
    content: "Content refined for authentic voice and tone",
    confidence: "in voice consistency and authenticity",
    reasoning: "How you enhanced the human connection and authenticity",
    suggestions: "Alternative tone approaches or voice adjustments",
    escalation: "true if content feels too corporate or impersonal",
};

static HOOK_DESIGNER: Instructions = Instructions {
    intro: "You are a Hook Designer agent for content creation. Your role is to create engaging openings and maintain momentum throughout.",
    per_item: "For each piece of content",
    steps: [
        "Create compelling opening that captures immediate attention",
        "Design hooks that maintain reader interest throughout",
        "Craft memorable conclusions that leave lasting impact",
        "Ensure momentum builds naturally from start to finish",
    ],
    content: "Content enhanced with engaging hooks and strong momentum",
    confidence: "in engagement and memorability",
    reasoning: "How the hooks enhance reader engagement and retention",
    suggestions: "Alternative hook approaches or engagement techniques",
    escalation: "true if content lacks engaging elements to work with",
};

static PERSONAS: &[Persona] = &[
    Persona {
        name: "triage_specialist",
        display_name: "Triage Specialist",
        description: "Categorizes issues, identifies urgency, routes appropriately",
        capabilities: &[
            "categorize_issues",
            "identify_urgency",
            "route_appropriately",
            "priority_detection",
            "routing_rules",
            "urgency_markers",
        ],
        goals: &[
            "Categorize incoming requests accurately",
            "Identify urgent issues requiring immediate attention",
            "Route issues to appropriate team members",
        ],
        constraints: &[
            "Must escalate if unsure about urgency",
            "Follow established routing rules",
            "Document categorization reasoning",
        ],
        instructions: Some(&TRIAGE),
    },
    Persona {
        name: "solution_researcher",
        display_name: "Solution Researcher",
        description: "Finds answers in docs, past tickets, knowledge base",
        capabilities: &[
            "search_knowledge_base",
            "find_past_tickets",
            "match_solutions",
            "search_patterns",
            "doc_relevance",
            "solution_matching",
        ],
        goals: &[
            "Find relevant solutions quickly",
            "Ensure solution accuracy and completeness",
            "Learn from past successful resolutions",
        ],
        constraints: &[
            "Cite sources for all solutions",
            "Verify solution applicability",
            "Escalate if no solution found",
        ],
        instructions: Some(&RESEARCHER),
    },
    Persona {
        name: "response_crafter",
        display_name: "Response Crafter",
        description: "Writes empathetic, accurate, brand-aligned responses",
        capabilities: &[
            "write_empathetic_responses",
            "maintain_brand_voice",
            "ensure_accuracy",
            "brand_voice",
            "empathy_patterns",
            "clarity_rules",
        ],
        goals: &[
            "Create clear, helpful responses",
            "Maintain consistent brand voice",
            "Show empathy and understanding",
        ],
        constraints: &[
            "Never promise what cannot be delivered",
            "Use approved language and tone",
            "Include relevant next steps",
        ],
        instructions: Some(&CRAFTER),
    },
    Persona {
        name: "escalation_analyst",
        display_name: "Escalation Analyst",
        description: "Identifies when human intervention needed",
        capabilities: &[
            "identify_complex_cases",
            "determine_human_need",
            "route_to_experts",
            "assess_complexity",
            "expert_matching",
        ],
        goals: &[
            "Identify cases requiring human expertise",
            "Route to appropriate specialists",
            "Preserve context during handoffs",
        ],
        constraints: &[
            "Err on side of escalation when uncertain",
            "Provide complete context to humans",
            "Track escalation patterns",
        ],
        instructions: Some(&ESCALATOR),
    },
    Persona {
        name: "story_miner",
        display_name: "Story Miner",
        description: "Extracts compelling narratives and human elements",
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
        instructions: Some(&STORY_MINER),
    },
    Persona {
        name: "structure_architect",
        display_name: "Structure Architect",
        description: "Organizes ideas into compelling narrative flow",
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
        instructions: Some(&STRUCTURE_ARCHITECT),
    },
    Persona {
        name: "technical_translator",
        display_name: "Technical Translator",
        description: "Simplifies complex concepts for general audiences",
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
        instructions: Some(&TECHNICAL_TRANSLATOR),
    },
    Persona {
        name: "voice_crafter",
        display_name: "Voice Crafter",
        description: "Maintains authentic, personal tone",
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
        instructions: Some(&VOICE_CRAFTER),
    },
    Persona {
        name: "hook_designer",
        display_name: "Hook Designer",
        description: "Creates engaging openings and maintains momentum",
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
        instructions: Some(&HOOK_DESIGNER),
    },
    Persona {
        name: "requirements_analyst",
        display_name: "Requirements Analyst",
        description: "Parses RFP requirements into discrete needs",
        capabilities: &[
            "parse_rfp_requirements",
            "extract_discrete_needs",
            "prioritize_requirements",
            "requirement_mapping",
            "compliance_checking",
        ],
        goals: &[
            "Extract all requirements completely",
            "Organize requirements by priority",
            "Identify mandatory vs optional items",
        ],
        constraints: &[
            "Must capture all stated requirements",
            "Flag ambiguous or unclear items",
            "Document assumptions made",
        ],
        instructions: None,
    },
    Persona {
        name: "content_assembler",
        display_name: "Content Assembler",
        description: "Pulls from past proposals, case studies, docs",
        capabilities: &[
            "pull_past_proposals",
            "access_case_studies",
            "organize_content",
            "content_matching",
            "template_management",
        ],
        goals: &[
            "Find relevant existing content",
            "Organize content logically",
            "Ensure content freshness",
        ],
        constraints: &[
            "Verify content is current",
            "Maintain client confidentiality",
            "Attribute sources properly",
        ],
        instructions: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_all_personas() {
        let catalog = RoleCatalog::builtin();
        assert_eq!(catalog.len(), 11);
        for name in [
            "triage_specialist",
            "solution_researcher",
            "response_crafter",
            "escalation_analyst",
            "story_miner",
            "structure_architect",
            "technical_translator",
            "voice_crafter",
            "hook_designer",
        ] {
            assert!(catalog.contains(name), "missing {name}");
        }
    }

    #[test]
    fn templates_have_list_slots() {
        let catalog = RoleCatalog::builtin();
        for profile in catalog.iter() {
            assert!(profile.prompt_template.contains("CAPABILITIES: {capabilities}"));
            assert!(profile.prompt_template.contains("GOALS: {goals}"));
            assert!(profile.prompt_template.contains("CONSTRAINTS: {constraints}"));
            assert!(profile.prompt_template.contains("escalation_needed:"));
        }
    }

    #[test]
    fn rendered_template_numbers_steps() {
        let template = render_template(&HOOK_DESIGNER);
        assert!(template.starts_with("You are a Hook Designer agent"));
        assert!(template.contains("For each piece of content:\n1. Create compelling opening"));
        assert!(template.contains("4. Ensure momentum builds naturally"));
    }

    #[test]
    fn roles_without_instructions_use_default_template() {
        let catalog = RoleCatalog::builtin();
        let analyst = catalog.get("requirements_analyst").unwrap();
        let triage = catalog.get(DEFAULT_ROLE).unwrap();
        assert_eq!(analyst.prompt_template, triage.prompt_template);
        assert_eq!(analyst.capabilities[0], "parse_rfp_requirements");
    }

    #[test]
    fn unknown_role_resolves_to_default_template() {
        let catalog = RoleCatalog::builtin();
        let profile = catalog.resolve("compliance_checker");
        assert_eq!(profile.name, "compliance_checker");
        assert!(profile.capabilities.is_empty());
        assert_eq!(
            profile.prompt_template,
            catalog.get(DEFAULT_ROLE).unwrap().prompt_template
        );
    }

    #[test]
    fn unknown_role_in_empty_catalog_still_resolves() {
        let catalog = RoleCatalog::new("nobody");
        let profile = catalog.resolve("anything");
        assert!(profile.prompt_template.contains("Triage Specialist"));
    }

    #[test]
    fn overrides_replace_only_given_lists() {
        let catalog = RoleCatalog::builtin();
        let base = catalog.resolve("escalation_analyst");
        let overrides = RoleOverrides {
            capabilities: Some(vec!["assess_complexity".into()]),
            ..RoleOverrides::none()
        };
        let profile = base.with_overrides(&overrides);
        assert_eq!(profile.capabilities, vec!["assess_complexity".to_string()]);
        assert_eq!(profile.goals, base.goals);
        assert_eq!(profile.constraints, base.constraints);
        // The catalog copy is untouched
        assert_eq!(catalog.get("escalation_analyst").unwrap().capabilities.len(), 5);
    }

    #[test]
    fn from_slices_sets_everything() {
        let o = RoleOverrides::from_slices(&["a"], &["b"], &["c"]);
        assert!(!o.is_empty());
        assert_eq!(o.goals, Some(vec!["b".to_string()]));
        assert!(RoleOverrides::none().is_empty());
    }
}
