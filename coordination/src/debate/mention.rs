//! `@advisor question` mentions from the user.

use serde::{Deserialize, Serialize};

use super::advisor::AdvisorId;

/// A raw mention as typed: the target name and the rest of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub target: String,
    pub message: String,
}

impl Mention {
    /// Map the target name onto a roster advisor.
    pub fn resolve(&self) -> Option<DirectedQuestion> {
        AdvisorId::parse(&self.target).map(|advisor| DirectedQuestion {
            advisor,
            message: self.message.clone(),
        })
    }
}

/// A user question addressed to one advisor for the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedQuestion {
    pub advisor: AdvisorId,
    pub message: String,
}

/// Parse `@<name> <message>`. No leading `@`, no space, an empty name, or
/// an empty message yields `None`.
pub fn parse_mention(input: &str) -> Option<Mention> {
    let rest = input.strip_prefix('@')?;
    let (target, message) = rest.split_once(' ')?;
    let message = message.trim();
    if target.is_empty() || message.is_empty() {
        return None;
    }
    Some(Mention {
        target: target.to_string(),
        message: message.to_string(),
    })
}

/// Parse and resolve in one step, logging mentions that name no advisor.
pub fn resolve_mention(input: &str) -> Option<DirectedQuestion> {
    let mention = parse_mention(input)?;
    let resolved = mention.resolve();
    if resolved.is_none() {
        tracing::warn!(target_name = %mention.target, "mention names no advisor; ignoring");
    }
    resolved
}
