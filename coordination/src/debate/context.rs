//! Prompt assembly for one advisor turn.
//!
//! Pure: reads the session, never mutates it. Block order is fixed: topic,
//! round, directed question, previous-round excerpts, PRD progress, the
//! current round's earlier responses, then the framing instruction.

use std::sync::LazyLock;

use regex::Regex;

use super::advisor::AdvisorId;
use super::mention::DirectedQuestion;
use super::state::{AdvisorTurn, DebateSession};
use crate::prd::split_sentences;

const DEFAULT_HISTORY_WINDOW: usize = 2;
const EXCERPT_CHARS: usize = 100;
const MIN_EXCERPT_SENTENCE_CHARS: usize = 20;

static KEY_POINT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)\b(?:decision|agree[sd]?|recommend\w*|suggest\w*|must|should|requirements?)\b([^\n.]{20,100})",
        )
        .unwrap(),
        Regex::new(r"(?i)\b(?:important|critical|essential|key)\b([^\n.]{20,100})").unwrap(),
    ]
});

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    /// How many previous rounds are summarized.
    pub history_window: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl ContextAssembler {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Build the prompt for `advisor` in round `round`.
    ///
    /// `in_round` holds the turns already taken this round. `directed` is
    /// shown only when it is addressed to `advisor`.
    pub fn build_prompt(
        &self,
        session: &DebateSession,
        advisor: AdvisorId,
        round: u32,
        in_round: &[AdvisorTurn],
        directed: Option<&DirectedQuestion>,
    ) -> String {
        let mut blocks = vec![format!("Topic: {}", session.topic), format!("Round: {round}")];

        if let Some(question) = directed.filter(|q| q.advisor == advisor) {
            blocks.push(format!(
                "User question for {}: {}\nAnswer this question first.",
                advisor.display_name(),
                question.message
            ));
        }

        let previous = session.recent_rounds(self.history_window);
        if !previous.is_empty() {
            let mut summary = String::from("Previous rounds summary:");
            for record in previous {
                summary.push_str(&format!("\nRound {} key points:", record.round));
                for turn in record.turns.iter().filter(|t| !t.failed) {
                    if let Some(point) = key_point(&turn.text) {
                        summary.push_str(&format!(
                            "\n  - {}: {}",
                            turn.advisor.display_name(),
                            point
                        ));
                    }
                }
            }
            blocks.push(summary);
        }

        blocks.push(format!("Current PRD progress: {}", session.prd.summary()));

        if !in_round.is_empty() {
            let mut current = String::from("Current round - other advisors' responses:");
            for turn in in_round {
                current.push_str(&format!("\n\n{}: {}", turn.advisor.display_name(), turn.text));
            }
            blocks.push(current);
        }

        blocks.push(framing(advisor, round));
        blocks.join("\n\n")
    }
}

fn framing(advisor: AdvisorId, round: u32) -> String {
    if round <= 1 {
        format!(
            "You are acting as the {} in a product development debate. Give your opening \
             position on this product from your perspective and propose PRD content.",
            advisor.display_name()
        )
    } else {
        format!(
            "Continue the discussion as the {}. Respond to the previous rounds, build on \
             points you agree with, challenge the ones you don't, and refine the PRD.",
            advisor.display_name()
        )
    }
}

/// One short excerpt per response: a key-point match, else the first
/// substantial sentence.
pub fn key_point(text: &str) -> Option<String> {
    for pattern in KEY_POINT_PATTERNS.iter() {
        if let Some(m) = pattern.captures(text).and_then(|caps| caps.get(1)) {
            return Some(truncate(m.as_str().trim(), EXCERPT_CHARS));
        }
    }
    split_sentences(text)
        .into_iter()
        .find(|s| s.chars().count() > MIN_EXCERPT_SENTENCE_CHARS)
        .map(|s| truncate(&s, EXCERPT_CHARS))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::{RoundKind, RoundRecord};
    use crate::prd::{merge_section, SectionContent, SectionKey, Stance};
    use chrono::Utc;

    fn turn(advisor: AdvisorId, text: &str, failed: bool) -> AdvisorTurn {
        AdvisorTurn {
            advisor,
            text: text.into(),
            failed,
            stance: Stance::Unstated,
            sections_changed: vec![],
            agreed: false,
        }
    }

    fn session_with_rounds(n: u32) -> DebateSession {
        let mut session = DebateSession::new("Team task planner");
        for round in 1..=n {
            session.record_round(RoundRecord {
                round,
                kind: RoundKind::Continuation,
                started_at: Utc::now(),
                duration_ms: 0,
                directed: None,
                agreement: false,
                turns: vec![turn(
                    AdvisorId::Backend,
                    &format!("We should expose a versioned REST API in round {round}."),
                    false,
                )],
            });
        }
        session
    }

    #[test]
    fn test_block_order() {
        let mut session = session_with_rounds(1);
        merge_section(
            &mut session.prd,
            SectionKey::Objectives,
            SectionContent::List(vec!["grow MAU by 20%".into()]),
        );
        let question = DirectedQuestion {
            advisor: AdvisorId::Ux,
            message: "What about dark mode?".into(),
        };
        let in_round = vec![turn(AdvisorId::Database, "Use Postgres.", false)];

        let prompt = ContextAssembler::default().build_prompt(
            &session,
            AdvisorId::Ux,
            2,
            &in_round,
            Some(&question),
        );

        let order = [
            "Topic: Team task planner",
            "Round: 2",
            "User question for UX Designer: What about dark mode?",
            "Previous rounds summary:",
            "Current PRD progress: objectives: 1 items",
            "Current round - other advisors' responses:",
            "Database Expert: Use Postgres.",
            "Continue the discussion as the UX Designer",
        ];
        let mut last = 0;
        for needle in order {
            let pos = prompt[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or out of order: {needle}"));
            last += pos;
        }
    }

    #[test]
    fn test_directed_question_only_for_addressee() {
        let session = DebateSession::new("topic");
        let question = DirectedQuestion {
            advisor: AdvisorId::Ux,
            message: "What about dark mode?".into(),
        };
        let prompt = ContextAssembler::default().build_prompt(
            &session,
            AdvisorId::Business,
            1,
            &[],
            Some(&question),
        );
        assert!(!prompt.contains("dark mode"));
        assert!(prompt.contains("No PRD content yet"));
        assert!(prompt.contains("opening position"));
    }

    #[test]
    fn test_history_window_limits_rounds() {
        let session = session_with_rounds(4);
        let prompt =
            ContextAssembler::default().build_prompt(&session, AdvisorId::Ux, 5, &[], None);
        assert!(!prompt.contains("Round 2 key points"));
        assert!(prompt.contains("Round 3 key points"));
        assert!(prompt.contains("Round 4 key points"));
    }

    #[test]
    fn test_key_point_excerpt_is_bounded() {
        let long = format!("We must {}", "support offline sync ".repeat(20));
        let point = key_point(&long).unwrap();
        assert!(point.chars().count() <= EXCERPT_CHARS + 3);

        let plain = key_point("Short. This sentence is long enough to be used.").unwrap();
        assert_eq!(plain, "This sentence is long enough to be used.");
    }

    #[test]
    fn test_prompt_is_pure() {
        let session = session_with_rounds(2);
        let before = session.clone();
        let _ = ContextAssembler::default().build_prompt(&session, AdvisorId::Ux, 3, &[], None);
        assert_eq!(session, before);
    }
}
