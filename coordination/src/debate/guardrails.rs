//! Stagnation and iteration guardrails for debate sessions.
//!
//! Advisory only: the outcome is reported alongside each round and never
//! blocks the next one or changes `done`.

use serde::{Deserialize, Serialize};

use super::state::DebateSession;

/// Outcome of a guardrail evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum GuardrailOutcome {
    /// No guardrail triggered.
    Continue,
    /// Nobody changed the PRD for this many consecutive rounds.
    Stalled { stalled_rounds: u32 },
    /// The configured round budget is used up.
    MaxRoundsReached { rounds: u32 },
}

impl GuardrailOutcome {
    /// Whether a caller running rounds in a loop should stop.
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

impl std::fmt::Display for GuardrailOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Stalled { stalled_rounds } => {
                write!(f, "stalled ({} rounds without PRD changes)", stalled_rounds)
            }
            Self::MaxRoundsReached { rounds } => write!(f, "max_rounds_reached ({})", rounds),
        }
    }
}

/// Configuration for debate guardrails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Round budget; `None` means unlimited.
    pub max_rounds: Option<u32>,
    /// Consecutive no-change rounds that count as a stall.
    pub max_stalled_rounds: u32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_rounds: Some(10),
            max_stalled_rounds: 3,
        }
    }
}

/// Evaluates guardrails against debate state.
#[derive(Debug, Clone, Default)]
pub struct GuardrailEngine {
    config: GuardrailConfig,
}

impl GuardrailEngine {
    pub fn new(config: GuardrailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Evaluate after a round has been recorded.
    pub fn evaluate(&self, session: &DebateSession) -> GuardrailOutcome {
        if let Some(max) = self.config.max_rounds {
            if session.round_counter >= max {
                return GuardrailOutcome::MaxRoundsReached {
                    rounds: session.round_counter,
                };
            }
        }

        let stalled_rounds = session.stalled_rounds();
        if self.config.max_stalled_rounds > 0 && stalled_rounds >= self.config.max_stalled_rounds {
            return GuardrailOutcome::Stalled { stalled_rounds };
        }

        GuardrailOutcome::Continue
    }
}
