//! Debate session state: rounds, advisor turns, and the follow-up slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::advisor::AdvisorId;
use super::insights::DebateInsights;
use super::mention::DirectedQuestion;
use crate::prd::{PrdModel, SectionKey, Stance};

/// Coarse lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Created or reset; no round has run.
    #[default]
    Idle,
    /// At least one round has run and the last one did not converge.
    Debating,
    /// The last round was stable and unanimous.
    Converged,
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Debating => write!(f, "debating"),
            Self::Converged => write!(f, "converged"),
        }
    }
}

/// Why a round was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// The first round of a session.
    Opening,
    /// A regular follow-up round.
    Continuation,
    /// A round re-run on request after the debate progressed.
    Revisit,
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Continuation => write!(f, "continuation"),
            Self::Revisit => write!(f, "revisit"),
        }
    }
}

/// One advisor's contribution to a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorTurn {
    pub advisor: AdvisorId,
    /// Raw response, or the sentinel text when the call failed.
    pub text: String,
    /// The backend call failed; `text` is a sentinel.
    pub failed: bool,
    /// Declared position, from stance markers in the response.
    #[serde(default)]
    pub stance: Stance,
    /// Sections this response actually changed.
    #[serde(default)]
    pub sections_changed: Vec<SectionKey>,
    /// Changed the PRD without declaring disagreement.
    pub agreed: bool,
}

impl AdvisorTurn {
    pub fn changed_prd(&self) -> bool {
        !self.sections_changed.is_empty()
    }
}

/// Record of a single round across the whole roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-indexed, strictly increasing within a session).
    pub round: u32,
    pub kind: RoundKind,
    /// When this round started.
    pub started_at: DateTime<Utc>,
    /// Round duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    /// User question answered in this round, if any.
    #[serde(default)]
    pub directed: Option<DirectedQuestion>,
    /// Turns in speaking order.
    pub turns: Vec<AdvisorTurn>,
    /// Every advisor agreed.
    pub agreement: bool,
}

impl RoundRecord {
    pub fn turn(&self, advisor: AdvisorId) -> Option<&AdvisorTurn> {
        self.turns.iter().find(|t| t.advisor == advisor)
    }

    /// No turn changed the PRD.
    pub fn is_stalled(&self) -> bool {
        self.turns.iter().all(|t| !t.changed_prd())
    }

    pub fn failed_count(&self) -> usize {
        self.turns.iter().filter(|t| t.failed).count()
    }
}

/// A debate session: topic, PRD under construction, and round history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateSession {
    pub topic: String,
    pub prd: PrdModel,
    pub history: Vec<RoundRecord>,
    /// Number of the last completed round; 0 before the first.
    pub round_counter: u32,
    /// Outstanding user question, cleared once its addressee answers.
    #[serde(default)]
    pub user_followup: Option<DirectedQuestion>,
    #[serde(default)]
    pub phase: DebatePhase,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            prd: PrdModel::new(),
            history: Vec::new(),
            round_counter: 0,
            user_followup: None,
            phase: DebatePhase::Idle,
            created_at: Utc::now(),
        }
    }

    /// Number the next round will get.
    pub fn next_round(&self) -> u32 {
        self.round_counter + 1
    }

    /// Append a finished round and advance the counter to it.
    pub fn record_round(&mut self, record: RoundRecord) {
        self.round_counter = self.round_counter.max(record.round);
        self.history.push(record);
    }

    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.history.last()
    }

    /// The last `n` rounds, oldest first.
    pub fn recent_rounds(&self, n: usize) -> &[RoundRecord] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Consecutive trailing rounds in which nobody changed the PRD.
    pub fn stalled_rounds(&self) -> u32 {
        self.history
            .iter()
            .rev()
            .take_while(|record| record.is_stalled())
            .count() as u32
    }

    pub fn insights_for(&self, advisor: AdvisorId) -> DebateInsights {
        DebateInsights::from_history(&self.history, advisor)
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        let agreement = match self.last_round() {
            Some(record) if record.agreement => "agreed",
            Some(_) => "open",
            None => "none",
        };
        format!(
            "[{}] round {} | agreement={} | {} sections populated | topic={}",
            self.phase,
            self.round_counter,
            agreement,
            self.prd.populated_sections().len(),
            self.topic
        )
    }
}
