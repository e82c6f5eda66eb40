//! PRD Council Coordination Library
//!
//! This library provides:
//! - A canonical, always-complete PRD model with fixed typed sections
//! - Heuristic extraction of PRD content from free-form advisor prose
//! - A debate engine that runs advisor rounds and detects convergence
//! - Session snapshots with file and in-memory stores
//!
//! # Modules
//!
//! ## PRD
//! - [`prd::model`]: section vocabulary and the [`PrdModel`]
//! - [`prd::extract`]: header, keyword, and fallback extraction tiers
//! - [`prd::merge`]: idempotent, additive merging
//! - [`prd::quality`]: heuristic section scoring
//!
//! ## Debate
//! - [`debate::scheduler`]: one round over the roster
//! - [`debate::orchestrator`]: session lifecycle (start, continue, revisit, reset)
//! - [`debate::persistence`]: snapshots and [`SessionStore`] implementations
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use prd_coordination::{DebateOrchestrator, FileSessionStore};
//! # async fn run(backend: Arc<dyn prd_coordination::AdvisorBackend>) -> Result<(), prd_coordination::DebateError> {
//! let mut orchestrator = DebateOrchestrator::new(backend);
//! let progress = orchestrator.start("Shared task planner for small teams").await?;
//! println!("{}", progress.summary_line());
//!
//! let store = FileSessionStore::new("data/debates");
//! let id = orchestrator.save(&store).await?;
//! println!("saved {id}");
//! # Ok(())
//! # }
//! ```

pub mod debate;
pub mod prd;
pub mod render;

pub use debate::{
    AdvisorBackend, AdvisorError, AdvisorId, DebateConfig, DebateError, DebateOrchestrator,
    DebateProgress, DebateSession, DebateSnapshot, FileSessionStore, MemorySessionStore,
    OpeningMode, PersistenceError, SessionId, SessionStore,
};
pub use prd::{PrdModel, QualityReport, SectionContent, SectionKey};
pub use render::render_markdown;
