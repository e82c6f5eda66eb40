//! Debate Orchestration: multi-advisor rounds that converge on a PRD
//!
//! A fixed roster of advisors answers in turn. After each round their
//! responses are mined for PRD content, merged into the shared model, and
//! checked for convergence.
//!
//! # Round Flow
//!
//! ```text
//! start(topic) ─► round 1 (opening) ─► extract + merge ─► stable && unanimous?
//!                      ▲                                        │
//!                      │                                        ├─ yes → Converged
//!   continue / revisit ┘◄───────────────────────────────────────┘ no  → Debating
//!
//! reset(topic) → Idle (round 0, empty PRD)
//! ```

pub mod advisor;
pub mod backend;
pub mod context;
pub mod error;
pub mod guardrails;
pub mod insights;
pub mod mention;
pub mod orchestrator;
pub mod persistence;
pub mod scheduler;
pub mod stability;
pub mod state;

pub use advisor::{AdvisorId, Roster};
pub use backend::{AdvisorBackend, AdvisorError};
pub use context::ContextAssembler;
pub use error::DebateError;
pub use guardrails::{GuardrailConfig, GuardrailEngine, GuardrailOutcome};
pub use insights::DebateInsights;
pub use mention::{parse_mention, resolve_mention, DirectedQuestion, Mention};
pub use orchestrator::{DebateConfig, DebateOrchestrator, DebateProgress, OpeningMode};
pub use persistence::{
    validate_snapshot, DebateSnapshot, FileSessionStore, IntegrityStatus, MemorySessionStore,
    PersistenceError, SessionId, SessionStore,
};
pub use scheduler::{RoundOutcome, RoundScheduler};
pub use stability::{CoveragePolicy, OpenQuestionsPolicy, StabilityMode, StabilityPolicy};
pub use state::{AdvisorTurn, DebatePhase, DebateSession, RoundKind, RoundRecord};
