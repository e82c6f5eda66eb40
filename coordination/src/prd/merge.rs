//! Merge extracted content into the canonical PRD.
//!
//! List sections accumulate items in first-seen order, skipping exact
//! duplicates. Text sections are filled when empty and otherwise grow by
//! appending a new paragraph, unless the incoming text already appears.
//! Nothing is ever removed.

use serde::{Deserialize, Serialize};

use super::extract::Extraction;
use super::model::{PrdModel, SectionContent, SectionKey};
use super::rules::{fold, is_generic};

/// Which sections a merge actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub changed_sections: Vec<SectionKey>,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        !self.changed_sections.is_empty()
    }
}

/// Merge every section of `extraction` into `prd`.
pub fn merge(prd: &mut PrdModel, extraction: &Extraction) -> MergeReport {
    let mut report = MergeReport::default();
    for (key, content) in extraction.iter() {
        if merge_section(prd, key, content.clone()) {
            report.changed_sections.push(key);
        }
    }
    report
}

/// Merge one section's content. Returns `true` when the PRD changed.
pub fn merge_section(prd: &mut PrdModel, key: SectionKey, incoming: SectionContent) -> bool {
    let incoming = incoming.into_kind(key.kind());
    match (prd.get_mut(key), incoming) {
        (SectionContent::List(current), SectionContent::List(items)) => merge_items(current, items),
        (SectionContent::Text(current), SectionContent::Text(text)) => merge_text(current, &text),
        // into_kind guarantees matching kinds
        _ => false,
    }
}

fn merge_items(current: &mut Vec<String>, incoming: Vec<String>) -> bool {
    let mut changed = false;
    for item in incoming {
        let item = item.trim();
        if is_generic(item) {
            continue;
        }
        if current.iter().any(|existing| existing == item) {
            continue;
        }
        current.push(item.to_string());
        changed = true;
    }
    changed
}

fn merge_text(current: &mut String, incoming: &str) -> bool {
    let incoming = incoming.trim();
    if is_generic(incoming) {
        return false;
    }
    if is_generic(current) {
        *current = incoming.to_string();
        return true;
    }
    let needle = fold(incoming);
    let already_present = current
        .split("\n\n")
        .any(|paragraph| fold(paragraph) == needle)
        || fold(current).contains(&needle);
    if already_present {
        return false;
    }
    current.push_str("\n\n");
    current.push_str(incoming);
    true
}
