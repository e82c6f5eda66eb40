//! Round scheduler: one step of the debate over the whole roster.
//!
//! Advisors speak in roster order, each seeing the full text of earlier
//! turns in the same round. Extraction and merging run only after every
//! advisor has answered, so all prompts in a round see the same PRD.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::advisor::{AdvisorId, Roster};
use super::backend::{sentinel_text, AdvisorBackend};
use super::context::ContextAssembler;
use super::error::DebateError;
use super::mention::{resolve_mention, DirectedQuestion};
use super::state::{AdvisorTurn, DebateSession, RoundKind, RoundRecord};
use crate::prd::{extract, merge, PrdModel, Stance};

/// What a round produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub kind: RoundKind,
    /// Every advisor agreed this round.
    pub round_agreement: bool,
    pub history: Vec<RoundRecord>,
    pub prd: PrdModel,
}

#[derive(Debug, Clone, Default)]
pub struct RoundScheduler {
    roster: Roster,
    assembler: ContextAssembler,
}

impl RoundScheduler {
    pub fn new(roster: Roster, assembler: ContextAssembler) -> Self {
        Self { roster, assembler }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Run one sequential round.
    ///
    /// A `mention` that resolves to a roster advisor replaces any outstanding
    /// follow-up question. A follow-up for an advisor outside the roster is
    /// dropped.
    /// Backend failures become sentinel turns; the round always completes.
    pub async fn run_round(
        &self,
        session: &mut DebateSession,
        backend: &dyn AdvisorBackend,
        mention: Option<&str>,
        kind: RoundKind,
    ) -> RoundOutcome {
        let round = session.next_round();
        let started_at = Utc::now();
        let clock = Instant::now();

        if let Some(question) = mention.and_then(resolve_mention) {
            if self.roster.contains(question.advisor) {
                session.user_followup = Some(question);
            } else {
                tracing::warn!(advisor = %question.advisor, "mention names an advisor outside the roster");
            }
        }
        if let Some(question) = &session.user_followup {
            if !self.roster.contains(question.advisor) {
                tracing::warn!(advisor = %question.advisor, "dropping follow-up for advisor outside the roster");
                session.user_followup = None;
            }
        }
        let directed = session.user_followup.clone();

        tracing::info!(
            round,
            %kind,
            advisors = self.roster.len(),
            directed_to = ?directed.as_ref().map(|q| q.advisor),
            "starting round"
        );

        let mut turns: Vec<AdvisorTurn> = Vec::with_capacity(self.roster.len());
        for &advisor in self.roster.advisors() {
            let prompt =
                self.assembler
                    .build_prompt(session, advisor, round, &turns, directed.as_ref());
            turns.push(call_advisor(backend, advisor, &prompt).await);
        }

        self.finish_round(session, round, kind, started_at, clock, directed, turns)
    }

    /// Run the opening round with every advisor called concurrently.
    ///
    /// No advisor sees another's response. Only valid before any round has
    /// run.
    pub async fn run_opening_fanout(
        &self,
        session: &mut DebateSession,
        backend: &dyn AdvisorBackend,
    ) -> Result<RoundOutcome, DebateError> {
        let round = session.next_round();
        if round != 1 {
            return Err(DebateError::FanOutNotOpening { round });
        }
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(round, advisors = self.roster.len(), "starting opening fan-out");

        let prompts: Vec<(AdvisorId, String)> = self
            .roster
            .advisors()
            .iter()
            .map(|&advisor| {
                let prompt = self.assembler.build_prompt(session, advisor, round, &[], None);
                (advisor, prompt)
            })
            .collect();
        let turns = join_all(
            prompts
                .iter()
                .map(|(advisor, prompt)| call_advisor(backend, *advisor, prompt)),
        )
        .await;

        Ok(self.finish_round(
            session,
            round,
            RoundKind::Opening,
            started_at,
            clock,
            None,
            turns,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_round(
        &self,
        session: &mut DebateSession,
        round: u32,
        kind: RoundKind,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
        directed: Option<DirectedQuestion>,
        mut turns: Vec<AdvisorTurn>,
    ) -> RoundOutcome {
        for turn in turns.iter_mut().filter(|t| !t.failed) {
            let extraction = extract(&turn.text, Some(&turn.advisor.fallback_target()));
            let report = merge(&mut session.prd, &extraction);
            turn.stance = extraction.stance;
            turn.agreed = report.changed() && extraction.stance != Stance::Disagree;
            tracing::debug!(
                advisor = %turn.advisor,
                changed = ?report.changed_sections,
                stance = %turn.stance,
                agreed = turn.agreed,
                "merged advisor response"
            );
            turn.sections_changed = report.changed_sections;
        }

        let agreement = !turns.is_empty() && turns.iter().all(|t| t.agreed);

        if let Some(question) = &directed {
            let answered = turns
                .iter()
                .any(|t| t.advisor == question.advisor && !t.failed);
            if answered {
                session.user_followup = None;
            }
        }

        let record = RoundRecord {
            round,
            kind,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            directed,
            agreement,
            turns,
        };
        let failed = record.failed_count();
        session.record_round(record);

        tracing::info!(round, agreement, failed, "round complete");

        RoundOutcome {
            round,
            kind,
            round_agreement: agreement,
            history: session.history.clone(),
            prd: session.prd.clone(),
        }
    }
}

async fn call_advisor(backend: &dyn AdvisorBackend, advisor: AdvisorId, prompt: &str) -> AdvisorTurn {
    let (text, failed) = match backend.complete(advisor, prompt).await {
        Ok(text) => (text, false),
        Err(e) => {
            tracing::warn!(advisor = %advisor, error = %e, "advisor call failed; recording sentinel");
            (sentinel_text(&e), true)
        }
    };
    AdvisorTurn {
        advisor,
        text,
        failed,
        stance: Stance::Unstated,
        sections_changed: Vec::new(),
        agreed: false,
    }
}
