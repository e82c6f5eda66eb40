//! Advisor identities and the debate roster.

use serde::{Deserialize, Serialize};

use crate::prd::{FallbackTarget, SectionKey};

/// One of the fixed advisory roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorId {
    Ux,
    Database,
    Backend,
    Frontend,
    Business,
}

const UX_CUES: &[&str] = &[
    "user", "users", "interface", "experience", "design", "frontend", "usability",
    "accessibility", "journey", "onboarding",
];
const DATABASE_CUES: &[&str] = &[
    "database", "data", "storage", "query", "backend", "schema", "index", "backup",
    "migration",
];
const BACKEND_CUES: &[&str] = &[
    "api", "server", "backend", "service", "architecture", "endpoint", "queue", "auth",
];
const FRONTEND_CUES: &[&str] = &[
    "frontend", "ui", "interface", "client", "browser", "component", "responsive", "mobile",
];
const BUSINESS_CUES: &[&str] = &[
    "business", "revenue", "market", "strategy", "users", "pricing", "growth", "monetization",
];

/// Output shape every persona asks for, so the header tier has labels to find.
const RESPONSE_FORMAT: &str = "\
Structure your reply with labeled lines:
- User Follow-Up: your answer if the user asked you something, otherwise omit
- Observations: what you notice from your perspective
- PRD sections you want to add to, each as `Section Name:` followed by bullet points \
(Objectives, User Stories, Functional Requirements, Non-Functional Requirements, \
Technical Specifications, Success Metrics, Design Notes, Risks, Next Steps, Open Questions)
- Agreement Status: agree or disagree with the current PRD, with one reason";

impl AdvisorId {
    /// Fixed roster order used for every sequential round.
    pub const ROSTER: [AdvisorId; 5] = [
        Self::Ux,
        Self::Database,
        Self::Backend,
        Self::Frontend,
        Self::Business,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ux => "ux",
            Self::Database => "database",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Business => "business",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ux => "UX Designer",
            Self::Database => "Database Expert",
            Self::Backend => "Backend Developer",
            Self::Frontend => "Frontend Developer",
            Self::Business => "Business Analyst",
        }
    }

    /// Section that receives this advisor's fallback-tier content.
    pub fn focus_section(self) -> SectionKey {
        match self {
            Self::Ux => SectionKey::UserStories,
            Self::Database | Self::Backend => SectionKey::TechnicalSpecifications,
            Self::Frontend => SectionKey::FunctionalRequirements,
            Self::Business => SectionKey::Objectives,
        }
    }

    /// Domain vocabulary: fallback cue words and integration-mention triggers.
    pub fn lexicon(self) -> &'static [&'static str] {
        match self {
            Self::Ux => UX_CUES,
            Self::Database => DATABASE_CUES,
            Self::Backend => BACKEND_CUES,
            Self::Frontend => FRONTEND_CUES,
            Self::Business => BUSINESS_CUES,
        }
    }

    pub fn fallback_target(self) -> FallbackTarget {
        FallbackTarget {
            section: self.focus_section(),
            cues: self.lexicon(),
        }
    }

    /// System instruction for the LLM collaborator.
    pub fn persona(self) -> String {
        let focus = match self {
            Self::Ux => {
                "You review the product from a user-experience angle: usability, accessibility, \
                 and the flow through key journeys. Propose concrete UI/UX improvements and \
                 user stories."
            }
            Self::Database => {
                "You review the product from a data angle: data models, storage engines, \
                 indexing, retention, and migration. Propose concrete schema and storage choices."
            }
            Self::Backend => {
                "You review the product from a server-side angle: APIs, services, auth, \
                 and scaling. Propose concrete architecture and endpoint decisions."
            }
            Self::Frontend => {
                "You review the product from a client-side angle: components, state handling, \
                 browser and mobile support. Propose concrete functional requirements."
            }
            Self::Business => {
                "You review the product from a business angle: market fit, revenue, pricing, \
                 and measurable goals. Propose concrete objectives and success metrics."
            }
        };
        format!(
            "You are the {} on a product council drafting a PRD together with other specialists.\n\
             {focus}\n\
             If the user addressed a question to you, answer it first.\n\n\
             {RESPONSE_FORMAT}",
            self.display_name()
        )
    }

    /// Parse an identifier or a common alias (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        let folded = name.trim().to_lowercase().replace(['-', ' '], "_");
        let id = match folded.as_str() {
            "ux" | "ux_designer" | "designer" | "ux_agent" | "uxagent" => Self::Ux,
            "database" | "db" | "database_expert" | "dba" | "database_agent" | "databaseagent" => {
                Self::Database
            }
            "backend" | "backend_developer" | "backend_dev" | "be" | "backend_agent"
            | "backendagent" => Self::Backend,
            "frontend" | "frontend_developer" | "frontend_dev" | "fe" | "frontend_agent"
            | "frontendagent" => Self::Frontend,
            "business" | "business_analyst" | "ba" | "analyst" | "business_agent"
            | "businessagent" => Self::Business,
            _ => return None,
        };
        Some(id)
    }
}

impl std::fmt::Display for AdvisorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AdvisorId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown advisor: {s}"))
    }
}

/// The advisors taking part in a debate, in speaking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    advisors: Vec<AdvisorId>,
}

impl Roster {
    /// All five advisors in the fixed order.
    pub fn standard() -> Self {
        Self {
            advisors: AdvisorId::ROSTER.to_vec(),
        }
    }

    /// A custom roster; duplicates are dropped, first occurrence wins.
    pub fn new(advisors: impl IntoIterator<Item = AdvisorId>) -> Self {
        let mut unique = Vec::new();
        for advisor in advisors {
            if !unique.contains(&advisor) {
                unique.push(advisor);
            }
        }
        Self { advisors: unique }
    }

    pub fn advisors(&self) -> &[AdvisorId] {
        &self.advisors
    }

    pub fn contains(&self, advisor: AdvisorId) -> bool {
        self.advisors.contains(&advisor)
    }

    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::standard()
    }
}
