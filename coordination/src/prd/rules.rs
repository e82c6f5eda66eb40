//! Rule tables shared by extraction and merging
//!
//! Placeholder detection, stance markers, and the ordered keyword routing
//! table live here so each can be tested on its own.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::SectionKey;

/// Minimum alphanumeric characters for a response to be worth extracting.
pub const MIN_MEANINGFUL_CHARS: usize = 8;
/// List items shorter than this (in characters) are dropped.
pub const MIN_ITEM_CHARS: usize = 6;
/// Cap on items contributed to one list section by one extraction.
pub const MAX_ITEMS_PER_SECTION: usize = 5;
/// Cap on sentences routed to one section by the keyword tier.
pub const MAX_KEYWORD_MATCHES: usize = 3;
/// Fallback sentences must be strictly longer than this.
pub const MIN_FALLBACK_SENTENCE_CHARS: usize = 20;
pub const MAX_FALLBACK_SENTENCES: usize = 3;

const GENERIC_SIGNATURES: &[&str] = &[
    "tbd",
    "tbc",
    "tba",
    "n/a",
    "na",
    "none",
    "nothing",
    "unknown",
    "pending",
    "todo",
    "placeholder",
    "lorem ipsum",
    "to be defined",
    "to be determined",
    "to be decided",
    "not applicable",
    "not provided",
    "not specified",
    "not defined",
    "not set",
    "no data available",
    "no known requests listed",
    "no entries",
];

/// Lowercase, trim surrounding punctuation, collapse inner whitespace.
pub fn fold(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric() && c != '/')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn alphanumeric_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Empty, punctuation-only, or a known placeholder phrase.
pub fn is_generic(text: &str) -> bool {
    if alphanumeric_len(text) == 0 {
        return true;
    }
    let folded = fold(text);
    GENERIC_SIGNATURES.contains(&folded.as_str())
}

/// Long enough and specific enough to be extracted at all.
pub fn is_meaningful(text: &str) -> bool {
    !is_generic(text) && alphanumeric_len(text) >= MIN_MEANINGFUL_CHARS
}

/// An advisor's declared position on the current PRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Agree,
    Disagree,
    #[default]
    Unstated,
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agree => write!(f, "agree"),
            Self::Disagree => write!(f, "disagree"),
            Self::Unstated => write!(f, "unstated"),
        }
    }
}

static DISAGREE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(disagree[sd]?|do not agree|don't agree|cannot agree|can't agree|not in agreement|object to|oppose)\b",
    )
    .unwrap()
});

static AGREE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(agree[sd]?|in agreement|consensus reached|approved?|lgtm|sign off)\b").unwrap()
});

static STANCE_ONLY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:agreement status\s*:?\s*)?(?:i|we)?\s*(?:fully|strongly|partially|mostly)?\s*(?:agree[sd]?|disagree[sd]?|do not agree|don't agree|approved?|lgtm)\b[\w\s,'/-]{0,40}$",
    )
    .unwrap()
});

/// Disagreement wins over agreement when both appear.
pub fn detect_stance(text: &str) -> Stance {
    if DISAGREE_PATTERN.is_match(text) {
        Stance::Disagree
    } else if AGREE_PATTERN.is_match(text) {
        Stance::Agree
    } else {
        Stance::Unstated
    }
}

/// A fragment that only declares a position ("Agree.", "I disagree with
/// the scope") and carries no PRD content.
pub fn is_stance_marker(text: &str) -> bool {
    STANCE_ONLY_PATTERN.is_match(text.trim().trim_end_matches(['.', '!']))
}

/// One entry of the keyword routing table.
#[derive(Debug)]
pub struct KeywordRule {
    pub section: SectionKey,
    pub pattern: Regex,
}

impl KeywordRule {
    fn new(section: SectionKey, pattern: &str) -> Self {
        Self {
            section,
            pattern: Regex::new(pattern).unwrap(),
        }
    }
}

static KEYWORD_RULES: LazyLock<Vec<KeywordRule>> = LazyLock::new(|| {
    vec![
        KeywordRule::new(
            SectionKey::OpenQuestions,
            r"(?i)\b(open questions?|unresolved|outstanding questions?|still unclear|needs? (?:further )?clarification)\b",
        ),
        KeywordRule::new(
            SectionKey::UserStories,
            r"(?i)\bas an? [\w\s-]{2,40}?,?\s+i (?:want|need|would like)\b|\buser stor(?:y|ies)\b",
        ),
        KeywordRule::new(
            SectionKey::Objectives,
            r"(?i)\b(objectives?|goals?|aims? to|purpose|mission)\b",
        ),
        KeywordRule::new(
            SectionKey::SuccessMetrics,
            r"(?i)\b(metrics?|kpis?|measured? by|conversion rate|retention rate|churn|nps|mau|dau)\b|\d+(?:\.\d+)?\s?%",
        ),
        KeywordRule::new(
            SectionKey::Risks,
            r"(?i)\b(risks?|risky|concerns?|pitfalls?|threats?|challenges?|downside|mitigat\w*)\b",
        ),
        KeywordRule::new(
            SectionKey::NonFunctionalRequirements,
            r"(?i)\b(performance|latency|scalab\w*|secur\w*|availability|uptime|reliab\w*|accessib\w*|compliance|gdpr|wcag|throughput)\b",
        ),
        KeywordRule::new(
            SectionKey::TechnicalSpecifications,
            r"(?i)\b(databases?|schemas?|storage|postgres\w*|sql|nosql|index(?:es|ing)?|apis?|backend|microservices?|architecture|frameworks?|tech(?:nology)? stack|endpoints?|cach(?:e|ing))\b",
        ),
        KeywordRule::new(
            SectionKey::FunctionalRequirements,
            r"(?i)\b(features?|functionality|capabilit(?:y|ies)|(?:must|should) (?:support|allow|provide)|users? (?:can|should be able to))\b",
        ),
        KeywordRule::new(
            SectionKey::DesignNotes,
            r"(?i)\b(design|layout|wireframes?|visual|ui|ux|interface|onboarding flow|navigation|mobile-first)\b",
        ),
        KeywordRule::new(
            SectionKey::NextSteps,
            r"(?i)\b(next steps?|action items?|follow[- ]up|we should|let's|roadmap|milestones?|phase \d)\b",
        ),
    ]
});

/// The ordered keyword routing table. Earlier rules win when a sentence
/// matches more than one.
pub fn keyword_rules() -> &'static [KeywordRule] {
    &KEYWORD_RULES
}

/// First section whose keyword rule matches `sentence`.
pub fn route_sentence(sentence: &str) -> Option<SectionKey> {
    keyword_rules()
        .iter()
        .find(|rule| rule.pattern.is_match(sentence))
        .map(|rule| rule.section)
}
