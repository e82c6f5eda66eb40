//! Command handlers behind the CLI.
//!
//! Each handler loads what it needs from the session store, runs at most
//! one debate step, persists the result, and returns the text to print.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use prd_coordination::{
    render_markdown, AdvisorBackend, DebateConfig, DebateOrchestrator, DebateProgress,
    QualityReport, SessionId, SessionStore,
};

/// How `show` prints a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    Summary,
}

pub struct Council {
    store: Box<dyn SessionStore>,
    backend: Option<Arc<dyn AdvisorBackend>>,
    debate: DebateConfig,
}

impl Council {
    pub fn new(store: Box<dyn SessionStore>, debate: DebateConfig) -> Self {
        Self {
            store,
            backend: None,
            debate,
        }
    }

    /// Needed only by commands that run rounds.
    pub fn with_backend(mut self, backend: Arc<dyn AdvisorBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub async fn start(&self, topic: &str) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(anyhow!("topic must not be empty"));
        }
        let mut orch = self.orchestrator()?;
        let progress = orch.start(topic).await?;
        let id = orch.save(self.store.as_ref()).await?;
        Ok(progress_report(&id, &orch, &progress))
    }

    pub async fn continue_session(&self, id: &SessionId, mention: Option<&str>) -> Result<String> {
        let mut orch = self.loaded(id).await?;
        let progress = orch.continue_debate(mention).await?;
        orch.save(self.store.as_ref()).await?;
        Ok(progress_report(id, &orch, &progress))
    }

    pub async fn revisit(&self, id: &SessionId) -> Result<String> {
        let mut orch = self.loaded(id).await?;
        let progress = orch.revisit().await?;
        orch.save(self.store.as_ref()).await?;
        Ok(progress_report(id, &orch, &progress))
    }

    pub async fn reset(&self, id: &SessionId, topic: &str) -> Result<String> {
        let mut orch = self.loaded(id).await?;
        let line = orch.reset(topic.trim()).status_line();
        orch.save(self.store.as_ref()).await?;
        Ok(format!("session {id}\n{line}\n"))
    }

    pub async fn show(&self, id: &SessionId, format: OutputFormat) -> Result<String> {
        let snapshot = self
            .store
            .load(id)
            .await
            .with_context(|| format!("failed to load session {id}"))?;
        let out = match format {
            OutputFormat::Json => snapshot.to_json()?,
            OutputFormat::Markdown => {
                render_markdown(&snapshot.topic, &snapshot.prd, &snapshot.history)
            }
            OutputFormat::Summary => {
                let session = snapshot.into_session();
                format!("{}\n{}\n", session.status_line(), session.prd.summary())
            }
        };
        Ok(out)
    }

    pub async fn quality(&self, id: &SessionId) -> Result<String> {
        let snapshot = self
            .store
            .load(id)
            .await
            .with_context(|| format!("failed to load session {id}"))?;
        Ok(QualityReport::evaluate(&snapshot.prd).to_text())
    }

    pub async fn list(&self) -> Result<String> {
        let ids = self.store.list().await.context("failed to list sessions")?;
        if ids.is_empty() {
            return Ok("no sessions\n".to_string());
        }
        let mut out = String::new();
        for id in ids {
            match self.store.load(&id).await {
                Ok(snapshot) => {
                    let _ = writeln!(
                        out,
                        "{id}  round {:<3} {:<10} {}  {}",
                        snapshot.round_counter,
                        snapshot.phase.to_string(),
                        snapshot.saved_at.format("%Y-%m-%d %H:%M"),
                        snapshot.topic
                    );
                }
                Err(e) => {
                    tracing::warn!(session = %id, error = %e, "skipping unreadable session");
                    let _ = writeln!(out, "{id}  (unreadable: {e})");
                }
            }
        }
        Ok(out)
    }

    fn orchestrator(&self) -> Result<DebateOrchestrator> {
        let backend = self
            .backend
            .clone()
            .ok_or_else(|| anyhow!("no advisor backend configured"))?;
        Ok(DebateOrchestrator::with_config(backend, self.debate.clone()))
    }

    async fn loaded(&self, id: &SessionId) -> Result<DebateOrchestrator> {
        let mut orch = self.orchestrator()?;
        orch.load(self.store.as_ref(), id)
            .await
            .with_context(|| format!("failed to load session {id}"))?;
        Ok(orch)
    }
}

fn progress_report(id: &SessionId, orch: &DebateOrchestrator, progress: &DebateProgress) -> String {
    let mut out = format!("session {id}\n{}\n", progress.summary_line());
    if let Some(session) = orch.session() {
        let _ = writeln!(out, "{}", session.status_line());
        if let Some(record) = session.last_round() {
            for turn in &record.turns {
                let status = if turn.failed {
                    "failed"
                } else if turn.agreed {
                    "agreed"
                } else {
                    "no change"
                };
                let _ = writeln!(out, "  {:<20} {status}", turn.advisor.display_name());
            }
        }
    }
    if progress.done {
        out.push_str("PRD converged.\n");
    } else if progress.guardrail.should_stop() {
        let _ = writeln!(out, "Guardrail: {}", progress.guardrail);
    }
    out
}
