//! Debate orchestrator: owns the session and drives rounds.
//!
//! Ties together the round scheduler, the stability policy, and the
//! guardrails. Every round-running method takes `&mut self`, so one
//! orchestrator can never run two rounds at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::advisor::Roster;
use super::backend::AdvisorBackend;
use super::context::ContextAssembler;
use super::error::DebateError;
use super::guardrails::{GuardrailConfig, GuardrailEngine, GuardrailOutcome};
use super::persistence::{DebateSnapshot, SessionId, SessionStore};
use super::scheduler::{RoundOutcome, RoundScheduler};
use super::stability::{is_done, StabilityMode, StabilityPolicy};
use super::state::{DebatePhase, DebateSession, RoundKind};

/// How the opening round calls advisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningMode {
    /// Roster order, each advisor seeing earlier replies.
    #[default]
    Sequential,
    /// All advisors at once, none seeing the others.
    FanOut,
}

/// Configuration for the debate orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub stability: StabilityMode,
    pub opening_mode: OpeningMode,
    pub guardrails: GuardrailConfig,
    /// Previous rounds summarized in each prompt.
    pub history_window: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            stability: StabilityMode::default(),
            opening_mode: OpeningMode::default(),
            guardrails: GuardrailConfig::default(),
            history_window: ContextAssembler::default().history_window,
        }
    }
}

/// A round's outcome plus the convergence verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateProgress {
    #[serde(flatten)]
    pub outcome: RoundOutcome,
    /// The PRD is stable under the configured policy.
    pub stable: bool,
    /// Stable and unanimous.
    pub done: bool,
    pub stalled_rounds: u32,
    pub guardrail: GuardrailOutcome,
}

impl DebateProgress {
    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "round {} ({}) | agreement={} stable={} done={} | guardrail={}",
            self.outcome.round,
            self.outcome.kind,
            self.outcome.round_agreement,
            self.stable,
            self.done,
            self.guardrail
        )
    }
}

/// Drives a single debate session.
///
/// Usage:
/// 1. Create with `new()` or `with_config()`
/// 2. `start(topic)` runs the opening round, or `load()` resumes a saved one
/// 3. `continue_debate()` / `revisit()` run further rounds
/// 4. `save()` persists the session at any point
pub struct DebateOrchestrator {
    backend: Arc<dyn AdvisorBackend>,
    scheduler: RoundScheduler,
    policy: Box<dyn StabilityPolicy>,
    guardrails: GuardrailEngine,
    config: DebateConfig,
    session: Option<DebateSession>,
    session_id: Option<SessionId>,
}

impl DebateOrchestrator {
    pub fn new(backend: Arc<dyn AdvisorBackend>) -> Self {
        Self::with_config(backend, DebateConfig::default())
    }

    pub fn with_config(backend: Arc<dyn AdvisorBackend>, config: DebateConfig) -> Self {
        Self {
            backend,
            scheduler: RoundScheduler::new(
                Roster::standard(),
                ContextAssembler::new(config.history_window),
            ),
            policy: config.stability.policy(),
            guardrails: GuardrailEngine::new(config.guardrails.clone()),
            config,
            session: None,
            session_id: None,
        }
    }

    /// Replace the roster (e.g. a subset of advisors).
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.scheduler = RoundScheduler::new(roster, ContextAssembler::new(self.config.history_window));
        self
    }

    /// Replace the stability policy with a custom implementation.
    pub fn with_policy(mut self, policy: Box<dyn StabilityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&DebateSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn into_session(self) -> Option<DebateSession> {
        self.session
    }

    /// Start a new session on `topic` and run the opening round.
    pub async fn start(&mut self, topic: &str) -> Result<DebateProgress, DebateError> {
        tracing::info!(%topic, mode = ?self.config.opening_mode, "starting debate");
        self.session = Some(DebateSession::new(topic));
        self.session_id = None;

        let backend = Arc::clone(&self.backend);
        let session = self.session.as_mut().ok_or(DebateError::NotStarted)?;
        let outcome = match self.config.opening_mode {
            OpeningMode::Sequential => {
                self.scheduler
                    .run_round(session, backend.as_ref(), None, RoundKind::Opening)
                    .await
            }
            OpeningMode::FanOut => {
                self.scheduler
                    .run_opening_fanout(session, backend.as_ref())
                    .await?
            }
        };
        self.conclude(outcome)
    }

    /// Run the next round, optionally with an `@advisor question` mention.
    pub async fn continue_debate(
        &mut self,
        mention: Option<&str>,
    ) -> Result<DebateProgress, DebateError> {
        let kind = match self.session.as_ref() {
            Some(session) if session.round_counter == 0 => RoundKind::Opening,
            Some(_) => RoundKind::Continuation,
            None => return Err(DebateError::NotStarted),
        };
        self.run(mention, kind).await
    }

    /// Re-run a round over the current state. The counter still advances.
    pub async fn revisit(&mut self) -> Result<DebateProgress, DebateError> {
        self.run(None, RoundKind::Revisit).await
    }

    /// Replace the session with a fresh one on `topic`; no round runs.
    /// A loaded session keeps its id so the next `save()` overwrites it.
    pub fn reset(&mut self, topic: &str) -> &DebateSession {
        tracing::info!(%topic, "resetting debate");
        self.session.insert(DebateSession::new(topic))
    }

    /// Stability of the current PRD under the configured policy.
    pub fn is_stable(&self) -> Result<bool, DebateError> {
        let session = self.session.as_ref().ok_or(DebateError::NotStarted)?;
        Ok(self.policy.is_stable(&session.prd))
    }

    pub fn snapshot(&self) -> Result<DebateSnapshot, DebateError> {
        let session = self.session.as_ref().ok_or(DebateError::NotStarted)?;
        Ok(DebateSnapshot::from_session(session))
    }

    /// Persist the session: a new id the first time, an overwrite after.
    pub async fn save(&mut self, store: &dyn SessionStore) -> Result<SessionId, DebateError> {
        let snapshot = self.snapshot()?;
        let id = match self.session_id {
            Some(id) => {
                store.update(&id, &snapshot).await?;
                id
            }
            None => store.save(&snapshot).await?,
        };
        self.session_id = Some(id);
        tracing::info!(session = %id, round = snapshot.round_counter, "debate saved");
        Ok(id)
    }

    /// Replace the current session with a stored one.
    pub async fn load(
        &mut self,
        store: &dyn SessionStore,
        id: &SessionId,
    ) -> Result<&DebateSession, DebateError> {
        let snapshot = store.load(id).await?;
        self.session_id = Some(*id);
        tracing::info!(session = %id, round = snapshot.round_counter, "debate loaded");
        Ok(self.session.insert(snapshot.into_session()))
    }

    /// Adopt an in-memory snapshot without a store.
    pub fn restore(&mut self, snapshot: DebateSnapshot) -> &DebateSession {
        self.session_id = None;
        self.session.insert(snapshot.into_session())
    }

    async fn run(
        &mut self,
        mention: Option<&str>,
        kind: RoundKind,
    ) -> Result<DebateProgress, DebateError> {
        let backend = Arc::clone(&self.backend);
        let session = self.session.as_mut().ok_or(DebateError::NotStarted)?;
        let outcome = self
            .scheduler
            .run_round(session, backend.as_ref(), mention, kind)
            .await;
        self.conclude(outcome)
    }

    fn conclude(&mut self, outcome: RoundOutcome) -> Result<DebateProgress, DebateError> {
        let session = self.session.as_mut().ok_or(DebateError::NotStarted)?;
        let stable = self.policy.is_stable(&session.prd);
        let done = is_done(self.policy.as_ref(), &session.prd, outcome.round_agreement);
        session.phase = if done {
            DebatePhase::Converged
        } else {
            DebatePhase::Debating
        };
        let stalled_rounds = session.stalled_rounds();
        let guardrail = self.guardrails.evaluate(session);

        if guardrail.should_stop() {
            tracing::warn!(round = outcome.round, %guardrail, "guardrail triggered");
        }
        tracing::info!(
            round = outcome.round,
            stable,
            done,
            policy = self.policy.name(),
            "round evaluated"
        );

        Ok(DebateProgress {
            outcome,
            stable,
            done,
            stalled_rounds,
            guardrail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::advisor::AdvisorId;
    use crate::debate::backend::AdvisorError;
    use async_trait::async_trait;

    struct FixedBackend(&'static str);

    #[async_trait]
    impl AdvisorBackend for FixedBackend {
        async fn complete(&self, _advisor: AdvisorId, _prompt: &str) -> Result<String, AdvisorError> {
            Ok(self.0.to_string())
        }
    }

    fn orchestrator(reply: &'static str) -> DebateOrchestrator {
        DebateOrchestrator::new(Arc::new(FixedBackend(reply)))
    }

    #[tokio::test]
    async fn test_round_before_start_is_rejected() {
        let mut orch = orchestrator("Objectives: launch in Q3");
        assert!(matches!(
            orch.continue_debate(None).await,
            Err(DebateError::NotStarted)
        ));
        assert!(matches!(orch.revisit().await, Err(DebateError::NotStarted)));
        assert!(matches!(orch.is_stable(), Err(DebateError::NotStarted)));
    }

    #[tokio::test]
    async fn test_start_runs_opening_round() {
        let mut orch = orchestrator("Objectives: launch in Q3. Agree.");
        let progress = orch.start("Team task planner").await.unwrap();
        assert_eq!(progress.outcome.round, 1);
        assert_eq!(progress.outcome.kind, RoundKind::Opening);
        // only the first advisor adds the item; the rest change nothing
        assert!(!progress.outcome.round_agreement);
        assert!(progress.stable);
        assert!(!progress.done);
        assert_eq!(orch.session().unwrap().phase, DebatePhase::Debating);
    }

    #[tokio::test]
    async fn test_revisit_advances_counter() {
        let mut orch = orchestrator("Objectives: launch in Q3");
        orch.start("topic").await.unwrap();
        let progress = orch.revisit().await.unwrap();
        assert_eq!(progress.outcome.round, 2);
        assert_eq!(progress.outcome.kind, RoundKind::Revisit);
        assert_eq!(orch.session().unwrap().round_counter, 2);
    }

    #[tokio::test]
    async fn test_reset_keeps_nothing_but_topic() {
        let mut orch = orchestrator("Objectives: launch in Q3");
        orch.start("old topic").await.unwrap();
        let session = orch.reset("new topic");
        assert_eq!(session.topic, "new topic");
        assert_eq!(session.round_counter, 0);
        assert!(session.prd.populated_sections().is_empty());
        assert!(!orch.is_stable().unwrap());
    }

    #[tokio::test]
    async fn test_continue_after_reset_is_opening() {
        let mut orch = orchestrator("Objectives: launch in Q3");
        orch.start("topic").await.unwrap();
        orch.reset("topic");
        let progress = orch.continue_debate(None).await.unwrap();
        assert_eq!(progress.outcome.kind, RoundKind::Opening);
        assert_eq!(progress.outcome.round, 1);
    }

    #[tokio::test]
    async fn test_fanout_opening_mode() {
        let config = DebateConfig {
            opening_mode: OpeningMode::FanOut,
            ..DebateConfig::default()
        };
        let mut orch =
            DebateOrchestrator::with_config(Arc::new(FixedBackend("Risks: scope creep")), config);
        let progress = orch.start("topic").await.unwrap();
        assert_eq!(progress.outcome.round, 1);
        assert_eq!(progress.outcome.history[0].turns.len(), 5);
    }

    #[test]
    fn test_default_config() {
        let config = DebateConfig::default();
        assert_eq!(config.opening_mode, OpeningMode::Sequential);
        assert_eq!(config.history_window, 2);
        assert_eq!(
            config.stability,
            StabilityMode::Coverage {
                min_populated_sections: 1
            }
        );
    }
}
