//! Consensus, decisions, and cross-advisor mentions mined from history.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::advisor::AdvisorId;
use super::state::RoundRecord;
use crate::prd::split_sentences;

const MAX_CONSENSUS_POINTS: usize = 5;
const MAX_KEY_DECISIONS: usize = 3;
const MAX_INTEGRATION_POINTS: usize = 3;
const MIN_MENTION_CHARS: usize = 20;

static CONSENSUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:agree[sd]?|consensus|decided|team decision)\b[^\n.]*?([^\n.]{10,80})")
            .unwrap(),
        Regex::new(r"(?i)\b(?:we should|let's|final decision|requirement)\b([^\n.]{10,80})").unwrap(),
    ]
});

static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:decision|choose|chose|selected|decided on|will use)\b([^\n.]{15,100})")
            .unwrap(),
        Regex::new(r"(?i)\b(?:architecture|technology|approach|strategy)\b([^\n.]{15,100})")
            .unwrap(),
    ]
});

/// What one advisor should know about the debate so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateInsights {
    pub consensus_points: Vec<String>,
    pub key_decisions: Vec<String>,
    /// Sentences from other advisors touching this advisor's domain.
    pub integration_points: Vec<String>,
}

impl DebateInsights {
    pub fn from_history(history: &[RoundRecord], advisor: AdvisorId) -> Self {
        let mut insights = Self::default();
        let answered = history
            .iter()
            .flat_map(|record| record.turns.iter())
            .filter(|turn| !turn.failed);

        for turn in answered {
            collect(&CONSENSUS_PATTERNS, &turn.text, &mut insights.consensus_points);
            collect(&DECISION_PATTERNS, &turn.text, &mut insights.key_decisions);
            if turn.advisor != advisor {
                collect_mentions(advisor, &turn.text, &mut insights.integration_points);
            }
        }

        insights.consensus_points.truncate(MAX_CONSENSUS_POINTS);
        insights.key_decisions.truncate(MAX_KEY_DECISIONS);
        insights.integration_points.truncate(MAX_INTEGRATION_POINTS);
        insights
    }

    pub fn is_empty(&self) -> bool {
        self.consensus_points.is_empty()
            && self.key_decisions.is_empty()
            && self.integration_points.is_empty()
    }
}

fn collect(patterns: &[Regex], text: &str, out: &mut Vec<String>) {
    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push_unique(out, m.as_str().trim());
            }
        }
    }
}

fn collect_mentions(advisor: AdvisorId, text: &str, out: &mut Vec<String>) {
    let sentences = split_sentences(text);
    for cue in advisor.lexicon() {
        let hit = sentences.iter().find(|sentence| {
            sentence.chars().count() > MIN_MENTION_CHARS
                && sentence
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word.eq_ignore_ascii_case(cue))
        });
        if let Some(sentence) = hit {
            push_unique(out, sentence);
        }
    }
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !out.iter().any(|existing| existing == value) {
        out.push(value.to_string());
    }
}
