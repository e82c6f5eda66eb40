//! Tiered extraction of PRD content from free-form advisor prose
//!
//! Three tiers, tried in order:
//! 1. **Header**: `Label:` lines whose label names a section; content runs
//!    until the next header-shaped line.
//! 2. **Keyword**: sentences routed through the ordered rule table, at most
//!    [`MAX_KEYWORD_MATCHES`] per section, and only into sections the header
//!    tier left unfilled; a sentence claimed by the header tier is never
//!    reused.
//! 3. **Fallback**: only when the first two produced nothing: cue-word
//!    sentences go to the speaking advisor's focus section.
//!
//! Extraction never fails. Unusable input yields an empty [`Extraction`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::{SectionContent, SectionKey, SectionKind};
use super::rules::{
    detect_stance, is_generic, is_meaningful, is_stance_marker, route_sentence, Stance,
    MAX_FALLBACK_SENTENCES, MAX_ITEMS_PER_SECTION, MAX_KEYWORD_MATCHES, MIN_FALLBACK_SENTENCE_CHARS,
    MIN_ITEM_CHARS,
};

/// A line shaped like `Label: content`, optionally bulleted, numbered,
/// bolded, emoji-prefixed, or prefixed with a markdown heading marker.
static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[-*+•]\s+|#{1,6}\s+|\d+[.)]\s+)?(?:\p{So}\S*\s+)?(?:\*\*|__)?([A-Za-z][A-Za-z _/&-]{0,40}?)(?:\*\*|__)?\s*:(?:\*\*|__)?\s*(.*)$",
    )
    .unwrap()
});

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+•]|\d+[.)]|#{1,6})\s+").unwrap());

static SYMBOL_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[-*+•]\s+").unwrap());

/// Which tier produced a section's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    Header,
    Keyword,
    Fallback,
}

/// Where fallback content goes for a given speaker, and which words make a
/// sentence eligible.
#[derive(Debug, Clone, Copy)]
pub struct FallbackTarget {
    pub section: SectionKey,
    pub cues: &'static [&'static str],
}

/// Cue words eligible for any speaker's fallback.
const SHARED_CUES: &[&str] = &[
    "user",
    "product",
    "feature",
    "requirement",
    "system",
    "customer",
    "support",
    "workflow",
];

/// Partial PRD content pulled from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    sections: BTreeMap<SectionKey, SectionContent>,
    tiers: BTreeMap<SectionKey, ExtractionTier>,
    pub stance: Stance,
}

impl Extraction {
    pub fn get(&self, key: SectionKey) -> Option<&SectionContent> {
        self.sections.get(&key)
    }

    pub fn tier(&self, key: SectionKey) -> Option<ExtractionTier> {
        self.tiers.get(&key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Sections in document order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &SectionContent)> {
        self.sections.iter().map(|(k, v)| (*k, v))
    }

    pub fn section_keys(&self) -> Vec<SectionKey> {
        self.sections.keys().copied().collect()
    }

    fn insert(&mut self, key: SectionKey, content: SectionContent, tier: ExtractionTier) {
        if content.is_empty() {
            return;
        }
        match self.sections.get_mut(&key) {
            Some(SectionContent::List(existing)) => {
                if let SectionContent::List(items) = content {
                    for item in items {
                        push_unique(existing, item);
                    }
                    existing.truncate(MAX_ITEMS_PER_SECTION);
                }
            }
            Some(SectionContent::Text(existing)) => {
                if let SectionContent::Text(text) = content {
                    existing.push_str("\n\n");
                    existing.push_str(&text);
                }
            }
            None => {
                self.sections.insert(key, content);
                self.tiers.insert(key, tier);
            }
        }
    }
}

/// Extract partial PRD content from `text`.
///
/// `fallback` names the speaker's focus section; without it the fallback
/// tier is skipped.
pub fn extract(text: &str, fallback: Option<&FallbackTarget>) -> Extraction {
    let mut extraction = Extraction {
        stance: detect_stance(text),
        ..Extraction::default()
    };
    if !is_meaningful(text) {
        return extraction;
    }

    let scan = header_tier(text);
    for (key, raw) in &scan.blocks {
        let content = shape(key.kind(), raw);
        extraction.insert(*key, content, ExtractionTier::Header);
    }

    keyword_tier(&scan.free_lines, &mut extraction);

    if extraction.is_empty() {
        if let Some(target) = fallback {
            fallback_tier(text, target, &mut extraction);
        }
    }

    tracing::debug!(
        sections = extraction.len(),
        stance = %extraction.stance,
        "extracted PRD content"
    );
    extraction
}

/// Header tier output: recognized blocks in response order, plus the lines
/// left for the keyword tier.
struct HeaderScan {
    blocks: Vec<(SectionKey, String)>,
    free_lines: Vec<String>,
}

/// Lines under a recognized header belong to its block. A header with an
/// unknown label ends the current block and only its content is left free,
/// unless it is a dash or star bullet inside an open block.
fn header_tier(text: &str) -> HeaderScan {
    let mut scan = HeaderScan {
        blocks: Vec::new(),
        free_lines: Vec::new(),
    };
    let mut current: Option<(SectionKey, Vec<String>)> = None;

    for line in text.lines() {
        if let Some(caps) = HEADER_LINE.captures(line) {
            let label = SectionKey::from_label(&caps[1]);
            // "- Term: detail" bullets stay in the open block
            if label.is_none() && SYMBOL_BULLET.is_match(line) {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line.to_string());
                    continue;
                }
            }
            if let Some((key, lines)) = current.take() {
                scan.blocks.push((key, lines.join("\n")));
            }
            match label {
                Some(key) => current = Some((key, vec![caps[2].to_string()])),
                None => scan.free_lines.push(caps[2].to_string()),
            }
            continue;
        }
        match current.as_mut() {
            Some((_, lines)) => lines.push(line.to_string()),
            None => scan.free_lines.push(line.to_string()),
        }
    }
    if let Some((key, lines)) = current {
        scan.blocks.push((key, lines.join("\n")));
    }
    scan
}

fn keyword_tier(free_lines: &[String], extraction: &mut Extraction) {
    let mut routed: BTreeMap<SectionKey, Vec<String>> = BTreeMap::new();

    for sentence in split_sentences(&free_lines.join("\n")) {
        if is_stance_marker(&sentence) || is_generic(&sentence) {
            continue;
        }
        let Some(section) = route_sentence(&sentence) else {
            continue;
        };
        if extraction.get(section).is_some() {
            continue;
        }
        let bucket = routed.entry(section).or_default();
        if bucket.len() < MAX_KEYWORD_MATCHES {
            bucket.push(sentence);
        }
    }

    for (key, sentences) in routed {
        let content = match key.kind() {
            SectionKind::List => SectionContent::List(clean_items(sentences)),
            SectionKind::Text => SectionContent::Text(sentences.join(" ")),
        };
        extraction.insert(key, content, ExtractionTier::Keyword);
    }
}

fn fallback_tier(text: &str, target: &FallbackTarget, extraction: &mut Extraction) {
    let picked: Vec<String> = split_sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() > MIN_FALLBACK_SENTENCE_CHARS)
        .filter(|s| !is_stance_marker(s) && !is_generic(s))
        .filter(|s| has_cue(s, target.cues) || has_cue(s, SHARED_CUES))
        .take(MAX_FALLBACK_SENTENCES)
        .collect();
    if picked.is_empty() {
        return;
    }
    let content = match target.section.kind() {
        SectionKind::List => SectionContent::List(clean_items(picked)),
        SectionKind::Text => SectionContent::Text(picked.join(" ")),
    };
    extraction.insert(target.section, content, ExtractionTier::Fallback);
}

fn has_cue(sentence: &str, cues: &[&str]) -> bool {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .any(|word| {
            cues.iter().any(|cue| {
                word == *cue || (cue.len() >= 4 && word.starts_with(cue) && word.len() <= cue.len() + 3)
            })
        })
}

/// Shape a raw header block into the section's kind.
fn shape(kind: SectionKind, raw: &str) -> SectionContent {
    match kind {
        SectionKind::Text => {
            let text = raw
                .lines()
                .map(strip_markup)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if is_generic(&text) || is_stance_marker(&text) {
                SectionContent::Text(String::new())
            } else {
                SectionContent::Text(text)
            }
        }
        SectionKind::List => {
            let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
            let candidates = if lines.len() > 1 {
                lines.into_iter().map(str::to_string).collect()
            } else {
                split_sentences(raw)
            };
            SectionContent::List(clean_items(candidates))
        }
    }
}

fn clean_items(candidates: Vec<String>) -> Vec<String> {
    let mut items = Vec::new();
    for candidate in candidates {
        let item = strip_markup(&candidate)
            .trim_end_matches(['.', ';', ',', ':'])
            .trim()
            .to_string();
        if item.chars().count() < MIN_ITEM_CHARS || is_generic(&item) || is_stance_marker(&item) {
            continue;
        }
        push_unique(&mut items, item);
        if items.len() == MAX_ITEMS_PER_SECTION {
            break;
        }
    }
    items
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn strip_markup(line: &str) -> String {
    let line = BULLET_PREFIX.replace(line, "");
    line.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// Split on sentence terminators followed by whitespace, and on newlines.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for line in text.lines() {
        let line = strip_markup(line);
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                push_sentence(&mut sentences, &current);
                current.clear();
            }
        }
        push_sentence(&mut sentences, &current);
    }
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
