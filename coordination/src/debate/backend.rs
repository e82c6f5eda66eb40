//! LLM collaborator seam.
//!
//! The engine only needs "text in, text out" per advisor. Provider adapters
//! live outside this crate and normalize whatever the remote API returns
//! (string, list of parts, streamed chunks) into one `String`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::advisor::AdvisorId;

/// Transient failures from an advisor call. The scheduler records these as
/// sentinel responses and keeps the round going.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("advisor unavailable: {0}")]
    Unavailable(String),
}

/// Produces one advisor's response to an assembled prompt.
#[async_trait]
pub trait AdvisorBackend: Send + Sync {
    async fn complete(&self, advisor: AdvisorId, prompt: &str) -> Result<String, AdvisorError>;

    /// Short label for logs (provider and model).
    fn describe(&self) -> String {
        "advisor-backend".to_string()
    }
}

/// Prefix marking a response recorded in place of a failed call.
pub const SENTINEL_PREFIX: &str = "Error: ";

pub fn sentinel_text(error: &AdvisorError) -> String {
    format!("{SENTINEL_PREFIX}{error}")
}
