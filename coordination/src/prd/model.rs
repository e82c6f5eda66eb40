//! Canonical PRD model: a fixed set of ordered, typed sections.
//!
//! Every section key is always present. The model is backed by a fixed-size
//! array indexed by [`SectionKey`], so a missing section is unrepresentable;
//! deserialization repairs snapshots that lack keys or carry the wrong kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::is_generic;

/// Whether a section holds a single string or an ordered list of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Text,
    List,
}

/// The fixed section vocabulary, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Overview,
    Objectives,
    UserStories,
    FunctionalRequirements,
    NonFunctionalRequirements,
    TechnicalSpecifications,
    SuccessMetrics,
    DesignNotes,
    Risks,
    NextSteps,
    /// Outstanding questions; a non-empty list blocks stability.
    OpenQuestions,
}

impl SectionKey {
    pub const COUNT: usize = 11;

    pub const ALL: [SectionKey; Self::COUNT] = [
        Self::Overview,
        Self::Objectives,
        Self::UserStories,
        Self::FunctionalRequirements,
        Self::NonFunctionalRequirements,
        Self::TechnicalSpecifications,
        Self::SuccessMetrics,
        Self::DesignNotes,
        Self::Risks,
        Self::NextSteps,
        Self::OpenQuestions,
    ];

    pub fn kind(self) -> SectionKind {
        match self {
            Self::Overview | Self::TechnicalSpecifications | Self::DesignNotes => SectionKind::Text,
            _ => SectionKind::List,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Objectives => "objectives",
            Self::UserStories => "user_stories",
            Self::FunctionalRequirements => "functional_requirements",
            Self::NonFunctionalRequirements => "non_functional_requirements",
            Self::TechnicalSpecifications => "technical_specifications",
            Self::SuccessMetrics => "success_metrics",
            Self::DesignNotes => "design_notes",
            Self::Risks => "risks",
            Self::NextSteps => "next_steps",
            Self::OpenQuestions => "open_questions",
        }
    }

    /// Human-readable heading used by renderers.
    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Objectives => "Objectives",
            Self::UserStories => "User Stories",
            Self::FunctionalRequirements => "Functional Requirements",
            Self::NonFunctionalRequirements => "Non-Functional Requirements",
            Self::TechnicalSpecifications => "Technical Specifications",
            Self::SuccessMetrics => "Success Metrics",
            Self::DesignNotes => "Design Notes",
            Self::Risks => "Risks",
            Self::NextSteps => "Next Steps",
            Self::OpenQuestions => "Open Questions",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Resolve a free-form header label ("Non-Functional Requirements",
    /// "goals", "Tech Stack") to a section key.
    ///
    /// Case-insensitive; spaces and hyphens fold to underscores.
    pub fn from_label(label: &str) -> Option<Self> {
        let folded = fold_label(label);
        if folded.is_empty() {
            return None;
        }
        if let Some(key) = Self::ALL.iter().find(|k| k.as_str() == folded) {
            return Some(*key);
        }
        let key = match folded.as_str() {
            "introduction" | "summary" | "executive_summary" | "product_overview" => Self::Overview,
            "goals" | "goal" | "objective" | "business_goals" => Self::Objectives,
            "user_story" | "stories" => Self::UserStories,
            "features" | "feature" | "functional" | "requirements" | "functional_requirement"
            | "feature_requirements" => Self::FunctionalRequirements,
            "non_functional" | "nfr" | "nfrs" | "non_functional_requirement"
            | "quality_attributes" => Self::NonFunctionalRequirements,
            "technical_specs" | "tech_specs" | "technical_specification" | "technical"
            | "technical_details" | "architecture" | "tech_stack" => Self::TechnicalSpecifications,
            "metrics" | "kpis" | "kpi" | "success_criteria" | "success_metric" => {
                Self::SuccessMetrics
            }
            "design" | "design_note" | "ux_notes" | "ui_notes" => Self::DesignNotes,
            "risk" | "risks_and_mitigations" | "concerns" => Self::Risks,
            "next_step" | "action_items" | "follow_ups" => Self::NextSteps,
            "open_question" | "questions" | "unresolved_questions" => Self::OpenQuestions,
            _ => return None,
        };
        Some(key)
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown PRD section: {s}"))
    }
}

fn fold_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.trim().chars() {
        let c = if c == ' ' || c == '-' { '_' } else { c };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.extend(c.to_lowercase());
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Content of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Text(String),
    List(Vec<String>),
}

impl SectionContent {
    pub fn empty(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Text => Self::Text(String::new()),
            SectionKind::List => Self::List(Vec::new()),
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Self::Text(_) => SectionKind::Text,
            Self::List(_) => SectionKind::List,
        }
    }

    /// Empty, whitespace-only, or a generic placeholder ("TBD", "n/a").
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => is_generic(text),
            Self::List(items) => items.iter().all(|item| is_generic(item)),
        }
    }

    pub fn word_count(&self) -> usize {
        match self {
            Self::Text(text) => text.split_whitespace().count(),
            Self::List(items) => items.iter().map(|i| i.split_whitespace().count()).sum(),
        }
    }

    /// Convert into the requested kind. Lists become paragraphs; text becomes
    /// a one-item list (or empty when blank).
    pub fn into_kind(self, kind: SectionKind) -> Self {
        match (self, kind) {
            (Self::Text(text), SectionKind::List) => {
                if text.trim().is_empty() {
                    Self::List(Vec::new())
                } else {
                    Self::List(vec![text.trim().to_string()])
                }
            }
            (Self::List(items), SectionKind::Text) => Self::Text(
                items
                    .into_iter()
                    .filter(|i| !i.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            (content, _) => content,
        }
    }
}

/// The structured PRD under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, SectionContent>",
    into = "BTreeMap<String, SectionContent>"
)]
pub struct PrdModel {
    sections: [SectionContent; SectionKey::COUNT],
}

impl PrdModel {
    /// A model with every section present and empty.
    pub fn new() -> Self {
        Self {
            sections: SectionKey::ALL.map(|key| SectionContent::empty(key.kind())),
        }
    }

    pub fn get(&self, key: SectionKey) -> &SectionContent {
        &self.sections[key.index()]
    }

    pub(crate) fn get_mut(&mut self, key: SectionKey) -> &mut SectionContent {
        &mut self.sections[key.index()]
    }

    /// Text of a text section; `None` for list sections.
    pub fn text(&self, key: SectionKey) -> Option<&str> {
        match self.get(key) {
            SectionContent::Text(text) => Some(text),
            SectionContent::List(_) => None,
        }
    }

    /// Items of a list section; empty for text sections.
    pub fn items(&self, key: SectionKey) -> &[String] {
        match self.get(key) {
            SectionContent::List(items) => items,
            SectionContent::Text(_) => &[],
        }
    }

    pub fn is_section_empty(&self, key: SectionKey) -> bool {
        self.get(key).is_empty()
    }

    /// Sections in document order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &SectionContent)> {
        SectionKey::ALL.iter().map(move |k| (*k, self.get(*k)))
    }

    pub fn populated_sections(&self) -> Vec<SectionKey> {
        self.iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(key, _)| key)
            .collect()
    }

    /// Compact per-section progress line: item counts for lists, word
    /// counts for text. Never includes section content.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(key, content)| match content {
                SectionContent::List(items) => {
                    let n = items.iter().filter(|i| !is_generic(i)).count();
                    format!("{key}: {n} items")
                }
                SectionContent::Text(_) => format!("{key}: {} words", content.word_count()),
            })
            .collect();
        if parts.is_empty() {
            "No PRD content yet".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Copy with blank list items dropped and text trimmed; placeholder
    /// text becomes empty.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        for content in out.sections.iter_mut() {
            match content {
                SectionContent::Text(text) => {
                    *text = if is_generic(text) {
                        String::new()
                    } else {
                        text.trim().to_string()
                    };
                }
                SectionContent::List(items) => {
                    items.retain(|i| !is_generic(i));
                    for item in items.iter_mut() {
                        *item = item.trim().to_string();
                    }
                }
            }
        }
        out
    }
}

impl Default for PrdModel {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<String, SectionContent>> for PrdModel {
    fn from(raw: BTreeMap<String, SectionContent>) -> Self {
        let mut model = Self::new();
        for (label, content) in raw {
            match SectionKey::from_label(&label) {
                Some(key) => *model.get_mut(key) = content.into_kind(key.kind()),
                None => tracing::debug!(section = %label, "dropping unknown PRD section"),
            }
        }
        model
    }
}

impl From<PrdModel> for BTreeMap<String, SectionContent> {
    fn from(model: PrdModel) -> Self {
        SectionKey::ALL
            .iter()
            .zip(model.sections)
            .map(|(key, content)| (key.as_str().to_string(), content))
            .collect()
    }
}
