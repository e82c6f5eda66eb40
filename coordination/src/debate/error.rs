use thiserror::Error;

use super::persistence::PersistenceError;

/// Errors surfaced by the debate orchestrator.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("no debate session; call start() or load() first")]
    NotStarted,

    #[error("concurrent fan-out is only allowed for the opening round (next round is {round})")]
    FanOutNotOpening { round: u32 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
