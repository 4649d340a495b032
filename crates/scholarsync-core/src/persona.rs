//! Agent personas.
//!
//! Each agent mode selects a fixed system instruction for the model. The
//! table is static data; modes are looked up, never subclassed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named persona configuration selecting the system instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    #[default]
    Librarian,
    Analyst,
    Scribe,
    Reviewer,
}

/// Display and prompt data for one agent mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub mode: AgentMode,
    pub name: &'static str,
    pub icon: &'static str,
    pub instruction: &'static str,
}

static PERSONAS: [Persona; 4] = [
    Persona {
        mode: AgentMode::Librarian,
        name: "The Librarian (Gronthagarik)",
        icon: "Library",
        instruction: "You are a PhD-level research librarian with the wisdom of the great libraries of Dhaka. Your goal is to find high-quality academic papers, summarize their key findings, and identify research gaps. Use Google Search grounding to find the latest publications and provide valid URLs or DOIs. Be polite and scholarly.",
    },
    Persona {
        mode: AgentMode::Analyst,
        name: "The Analyst (Bisleshok)",
        icon: "BarChart",
        instruction: "You are a research analyst, sharp as a monsoon lightning. Your goal is to identify patterns, insights, and logical connections between different research findings. You help synthesize information and identify where more data or evidence is needed.",
    },
    Persona {
        mode: AgentMode::Scribe,
        name: "The Scribe (Lekhok)",
        icon: "PenTool",
        instruction: "You are an academic writing specialist, crafting prose as beautiful as a Jamdani weave. Your goal is to convert research notes and summaries into formal academic prose. You ensure the tone is scholarly, the arguments are clear, and the formatting follows academic standards.",
    },
    Persona {
        mode: AgentMode::Reviewer,
        name: "The Peer Reviewer (Porikkhok)",
        icon: "CheckCircle",
        instruction: "You are an expert peer reviewer, as rigorous as the top professors at BUET or DU. Your goal is to critically evaluate research drafts for logical fallacies, weak arguments, missing citations, or lack of clarity. You act as 'Reviewer 2' to ensure the highest quality before submission.",
    },
];

impl AgentMode {
    pub const ALL: [AgentMode; 4] = [
        AgentMode::Librarian,
        AgentMode::Analyst,
        AgentMode::Scribe,
        AgentMode::Reviewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Librarian => "librarian",
            AgentMode::Analyst => "analyst",
            AgentMode::Scribe => "scribe",
            AgentMode::Reviewer => "reviewer",
        }
    }

    /// The persona entry for this mode.
    pub fn persona(&self) -> &'static Persona {
        // Table order matches declaration order of the enum.
        &PERSONAS[*self as usize]
    }
}

/// All personas in display order.
pub fn personas() -> &'static [Persona] {
    &PERSONAS
}

/// Opening message shown when a chat session is opened for a project.
pub fn greeting(project_title: &str, mode: AgentMode) -> String {
    format!(
        "Assalamu Alaikum! I am your research assistant for **{}**. I'm currently in **{}** mode. How can I assist you in your scholarly pursuits today?",
        project_title,
        mode.persona().name
    )
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "librarian" => Ok(AgentMode::Librarian),
            "analyst" => Ok(AgentMode::Analyst),
            "scribe" => Ok(AgentMode::Scribe),
            "reviewer" => Ok(AgentMode::Reviewer),
            _ => Err(format!("Unknown agent mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_table_matches_modes() {
        for mode in AgentMode::ALL {
            assert_eq!(mode.persona().mode, mode);
        }
        assert_eq!(personas().len(), 4);
    }

    #[test]
    fn test_default_mode_is_librarian() {
        assert_eq!(AgentMode::default(), AgentMode::Librarian);
        assert!(AgentMode::default()
            .persona()
            .instruction
            .contains("research librarian"));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("scribe".parse::<AgentMode>().unwrap(), AgentMode::Scribe);
        assert!("oracle".parse::<AgentMode>().is_err());
    }

    #[test]
    fn test_greeting_mentions_project_and_persona() {
        let text = greeting("Coral Reefs", AgentMode::Reviewer);
        assert!(text.contains("**Coral Reefs**"));
        assert!(text.contains("The Peer Reviewer (Porikkhok)"));
    }
}
