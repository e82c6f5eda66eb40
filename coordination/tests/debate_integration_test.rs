//! Mocked debate integration test: exercises full advisor rounds with
//! deterministic scripted backends (no LLM calls).
//!
//! Covers: orchestrator ↔ scheduler ↔ extraction ↔ merge ↔ stability ↔
//! guardrails running together.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use prd_coordination::debate::{
    AdvisorBackend, AdvisorError, AdvisorId, DebateConfig, DebateError, DebateOrchestrator,
    DebatePhase, GuardrailConfig, GuardrailOutcome, RoundKind, Roster, StabilityMode,
};
use prd_coordination::prd::{SectionKey, Stance};

/// Backend driven by a closure over `(advisor, prompt)`; records prompts.
struct ScriptedBackend<F> {
    script: F,
    prompts: Mutex<Vec<(AdvisorId, String)>>,
}

impl<F> ScriptedBackend<F>
where
    F: Fn(AdvisorId, &str) -> Result<String, AdvisorError> + Send + Sync,
{
    fn new(script: F) -> Arc<Self> {
        Arc::new(Self {
            script,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self, advisor: AdvisorId) -> String {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(a, _)| *a == advisor)
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<F> AdvisorBackend for ScriptedBackend<F>
where
    F: Fn(AdvisorId, &str) -> Result<String, AdvisorError> + Send + Sync,
{
    async fn complete(&self, advisor: AdvisorId, prompt: &str) -> Result<String, AdvisorError> {
        self.prompts
            .lock()
            .unwrap()
            .push((advisor, prompt.to_string()));
        (self.script)(advisor, prompt)
    }
}

/// Helper: parse the `Round: n` line the context assembler always emits.
fn round_of(prompt: &str) -> u32 {
    prompt
        .lines()
        .find_map(|l| l.strip_prefix("Round: "))
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

/// Helper: every advisor contributes a distinct risk each round and agrees.
fn mock_fresh_content(advisor: AdvisorId, prompt: &str) -> Result<String, AdvisorError> {
    Ok(format!(
        "Risks: {} sees delivery risk number {}\nAgreement Status: agree",
        advisor.display_name(),
        round_of(prompt)
    ))
}

// ── Worked example: one business advisor ──────────────────────────

#[tokio::test]
async fn test_business_objective_is_merged_and_agreed() {
    let backend = ScriptedBackend::new(|_, _| Ok("Objectives: grow MAU by 20%. Agree.".to_string()));
    let mut orch = DebateOrchestrator::new(backend).with_roster(Roster::new([AdvisorId::Business]));

    let progress = orch.start("Team task planner").await.unwrap();

    let session = orch.session().unwrap();
    assert_eq!(session.prd.items(SectionKey::Objectives), ["grow MAU by 20%"]);
    assert_eq!(session.prd.populated_sections(), vec![SectionKey::Objectives]);

    let turn = progress.outcome.history[0].turn(AdvisorId::Business).unwrap();
    assert_eq!(turn.sections_changed, vec![SectionKey::Objectives]);
    assert_eq!(turn.stance, Stance::Agree);
    assert!(turn.agreed);
    assert!(progress.outcome.round_agreement);
    assert!(progress.stable);
    assert!(progress.done);
    assert_eq!(session.phase, DebatePhase::Converged);
}

// ── Unanimous new content converges ───────────────────────────────

#[tokio::test]
async fn test_unanimous_contribution_converges() {
    let backend = ScriptedBackend::new(mock_fresh_content);
    let mut orch = DebateOrchestrator::new(backend);

    let progress = orch.start("Team task planner").await.unwrap();
    assert!(progress.outcome.round_agreement);
    assert!(progress.done);
    assert_eq!(
        orch.session().unwrap().prd.items(SectionKey::Risks).len(),
        AdvisorId::ROSTER.len()
    );
}

// ── Stagnation: verbatim repetition never converges ───────────────

#[tokio::test]
async fn test_verbatim_repetition_never_converges() {
    let backend = ScriptedBackend::new(|advisor, _| {
        Ok(format!(
            "Functional Requirements: {} wants shared task lists\nI agree.",
            advisor.display_name()
        ))
    });
    let config = DebateConfig {
        guardrails: GuardrailConfig {
            max_rounds: None,
            max_stalled_rounds: 2,
        },
        ..DebateConfig::default()
    };
    let mut orch = DebateOrchestrator::with_config(backend, config);

    let first = orch.start("Team task planner").await.unwrap();
    assert!(first.done, "first round adds content from every advisor");

    let second = orch.continue_debate(None).await.unwrap();
    let third = orch.continue_debate(None).await.unwrap();
    let fourth = orch.continue_debate(None).await.unwrap();

    for progress in [&second, &third, &fourth] {
        assert!(!progress.outcome.round_agreement);
        assert!(!progress.done);
    }
    assert_eq!(fourth.stalled_rounds, 3);
    assert_eq!(
        third.guardrail,
        GuardrailOutcome::Stalled { stalled_rounds: 2 }
    );
    assert_eq!(
        orch.session().unwrap().prd.items(SectionKey::FunctionalRequirements).len(),
        5,
        "repetition must not grow lists"
    );
    assert_eq!(orch.session().unwrap().phase, DebatePhase::Debating);
}

// ── Failing advisor ───────────────────────────────────────────────

#[tokio::test]
async fn test_failing_advisor_does_not_abort_round() {
    let backend = ScriptedBackend::new(|advisor, prompt| {
        if advisor == AdvisorId::Database {
            return Err(AdvisorError::Timeout(std::time::Duration::from_secs(30)));
        }
        mock_fresh_content(advisor, prompt)
    });
    let mut orch = DebateOrchestrator::new(backend.clone());

    let progress = orch.start("Team task planner").await.unwrap();
    let record = &progress.outcome.history[0];

    assert_eq!(record.turns.len(), 5);
    let db = record.turn(AdvisorId::Database).unwrap();
    assert!(db.failed);
    assert!(db.text.starts_with("Error: request timed out"));
    assert!(!db.agreed);
    assert!(db.sections_changed.is_empty());
    assert!(!progress.outcome.round_agreement);
    assert!(!progress.done);

    // later advisors still ran and saw the sentinel
    assert!(backend
        .last_prompt(AdvisorId::Business)
        .contains("Database Expert: Error: request timed out"));
    assert_eq!(orch.session().unwrap().prd.items(SectionKey::Risks).len(), 4);
}

// ── Round counter ─────────────────────────────────────────────────

#[tokio::test]
async fn test_round_counter_increments_by_one() {
    let backend = ScriptedBackend::new(mock_fresh_content);
    let mut orch = DebateOrchestrator::new(backend);

    let mut rounds = vec![orch.start("topic").await.unwrap().outcome.round];
    rounds.push(orch.continue_debate(None).await.unwrap().outcome.round);
    let revisit = orch.revisit().await.unwrap();
    assert_eq!(revisit.outcome.kind, RoundKind::Revisit);
    rounds.push(revisit.outcome.round);
    rounds.push(orch.continue_debate(None).await.unwrap().outcome.round);

    assert_eq!(rounds, vec![1, 2, 3, 4]);
    let history: Vec<u32> = orch.session().unwrap().history.iter().map(|r| r.round).collect();
    assert_eq!(history, vec![1, 2, 3, 4]);
}

// ── Reset and stability policies ──────────────────────────────────

#[tokio::test]
async fn test_reset_prd_stability_under_each_policy() {
    let backend = ScriptedBackend::new(mock_fresh_content);

    let mut coverage = DebateOrchestrator::new(backend.clone());
    coverage.start("topic").await.unwrap();
    coverage.reset("new topic");
    assert!(!coverage.is_stable().unwrap());

    let config = DebateConfig {
        stability: StabilityMode::OpenQuestions,
        ..DebateConfig::default()
    };
    let mut naive = DebateOrchestrator::with_config(backend, config);
    naive.reset("new topic");
    assert!(naive.is_stable().unwrap());
}

#[tokio::test]
async fn test_open_questions_block_done() {
    let backend = ScriptedBackend::new(|advisor, _| {
        Ok(format!(
            "Open Questions: which regions does the {} expect at launch?\nAgree.",
            advisor.display_name()
        ))
    });
    let mut orch = DebateOrchestrator::new(backend);

    let progress = orch.start("topic").await.unwrap();
    assert!(progress.outcome.round_agreement);
    assert!(!progress.stable);
    assert!(!progress.done);
}

// ── Disagreement ──────────────────────────────────────────────────

#[tokio::test]
async fn test_explicit_disagreement_blocks_agreement() {
    let backend = ScriptedBackend::new(|advisor, prompt| {
        if advisor == AdvisorId::Frontend {
            return Ok("Risks: offline sync doubles client complexity\n\
                       Agreement Status: disagree, scope is too wide"
                .to_string());
        }
        mock_fresh_content(advisor, prompt)
    });
    let mut orch = DebateOrchestrator::new(backend);

    let progress = orch.start("topic").await.unwrap();
    let fe = progress.outcome.history[0].turn(AdvisorId::Frontend).unwrap();
    assert!(fe.changed_prd());
    assert_eq!(fe.stance, Stance::Disagree);
    assert!(!fe.agreed);
    assert!(!progress.done);
}

// ── Generic responses ─────────────────────────────────────────────

#[tokio::test]
async fn test_placeholder_responses_leave_prd_untouched() {
    let backend = ScriptedBackend::new(|_, _| Ok("TBD".to_string()));
    let mut orch = DebateOrchestrator::new(backend);

    let progress = orch.start("topic").await.unwrap();
    assert!(orch.session().unwrap().prd.populated_sections().is_empty());
    assert!(!progress.outcome.round_agreement);
    assert!(!progress.stable);
}

// ── Directed questions ────────────────────────────────────────────

#[tokio::test]
async fn test_mention_directs_question_to_one_advisor() {
    let backend = ScriptedBackend::new(mock_fresh_content);
    let mut orch = DebateOrchestrator::new(backend.clone());
    orch.start("topic").await.unwrap();

    let progress = orch
        .continue_debate(Some("@business What should pricing look like?"))
        .await
        .unwrap();

    assert!(backend
        .last_prompt(AdvisorId::Business)
        .contains("User question for Business Analyst: What should pricing look like?"));
    assert!(!backend
        .last_prompt(AdvisorId::Ux)
        .contains("What should pricing look like?"));
    let record = progress.outcome.history.last().unwrap();
    assert_eq!(
        record.directed.as_ref().map(|q| q.advisor),
        Some(AdvisorId::Business)
    );
    assert!(orch.session().unwrap().user_followup.is_none());
}

// ── Context carries history ───────────────────────────────────────

#[tokio::test]
async fn test_second_round_prompt_summarizes_first() {
    let backend = ScriptedBackend::new(mock_fresh_content);
    let mut orch = DebateOrchestrator::new(backend.clone());
    orch.start("Team task planner").await.unwrap();
    orch.continue_debate(None).await.unwrap();

    let prompt = backend.last_prompt(AdvisorId::Ux);
    assert!(prompt.contains("Round: 2"));
    assert!(prompt.contains("Previous rounds summary:"));
    assert!(prompt.contains("Round 1 key points:"));
    assert!(prompt.contains("Current PRD progress: risks: 5 items"));
    assert!(prompt.contains("Continue the discussion as the UX Designer"));
}

#[tokio::test]
async fn test_not_started_error_before_any_call() {
    let backend = ScriptedBackend::new(mock_fresh_content);
    let mut orch = DebateOrchestrator::new(backend.clone());

    let err = orch.continue_debate(Some("@ux hi there")).await.unwrap_err();
    assert!(matches!(err, DebateError::NotStarted));
    assert!(backend.prompts.lock().unwrap().is_empty());
}
