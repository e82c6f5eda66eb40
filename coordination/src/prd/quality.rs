//! Heuristic PRD quality scoring.
//!
//! Each populated section starts at 1.0 and loses points for thin content,
//! hedging language, and missing section-specific elements.

use serde::{Deserialize, Serialize};

use super::model::{PrdModel, SectionContent, SectionKey};

const MIN_TEXT_WORDS: usize = 50;
const MIN_LIST_ITEMS: usize = 3;
const THIN_PENALTY: f64 = 0.3;
const HEDGE_PENALTY: f64 = 0.1;
const MISSING_ELEMENTS_PENALTY: f64 = 0.2;
/// Sections scoring below this are flagged invalid.
pub const PASSING_SCORE: f64 = 0.75;

const HEDGING_PHRASES: &[&str] = &["maybe", "possibly", "might", "could be"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl QualityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Excellent
        } else if score >= 0.8 {
            Self::Good
        } else if score >= PASSING_SCORE {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Acceptable => write!(f, "acceptable"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionQuality {
    pub section: SectionKey,
    pub score: f64,
    pub level: QualityLevel,
    pub issues: Vec<String>,
}

impl SectionQuality {
    pub fn is_valid(&self) -> bool {
        self.score >= PASSING_SCORE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Populated sections only, in document order.
    pub sections: Vec<SectionQuality>,
    pub overall: f64,
    pub level: QualityLevel,
}

impl QualityReport {
    pub fn evaluate(prd: &PrdModel) -> Self {
        let sections: Vec<SectionQuality> = prd
            .iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(key, content)| score_section(key, content))
            .collect();
        let overall = if sections.is_empty() {
            0.0
        } else {
            round2(sections.iter().map(|s| s.score).sum::<f64>() / sections.len() as f64)
        };
        Self {
            level: QualityLevel::from_score(overall),
            sections,
            overall,
        }
    }

    pub fn section(&self, key: SectionKey) -> Option<&SectionQuality> {
        self.sections.iter().find(|s| s.section == key)
    }

    /// Plain-text table for terminal output.
    pub fn to_text(&self) -> String {
        let mut out = format!("Overall: {:.2} ({})\n", self.overall, self.level);
        for section in &self.sections {
            out.push_str(&format!(
                "  {:<28} {:.2} {}\n",
                section.section.as_str(),
                section.score,
                section.level
            ));
            for issue in &section.issues {
                out.push_str(&format!("      - {issue}\n"));
            }
        }
        out
    }
}

fn required_elements(key: SectionKey) -> &'static [&'static str] {
    match key {
        SectionKey::Objectives => &["target", "metric"],
        SectionKey::UserStories => &["as a", "i want"],
        SectionKey::SuccessMetrics => &["metric", "target", "kpi", "%"],
        _ => &[],
    }
}

fn score_section(key: SectionKey, content: &SectionContent) -> SectionQuality {
    let mut score = 1.0;
    let mut issues = Vec::new();

    let flat = match content {
        SectionContent::Text(text) => {
            let words = content.word_count();
            if words < MIN_TEXT_WORDS {
                score -= THIN_PENALTY;
                issues.push(format!("only {words} words (want {MIN_TEXT_WORDS}+)"));
            }
            text.to_lowercase()
        }
        SectionContent::List(items) => {
            if items.len() < MIN_LIST_ITEMS {
                score -= THIN_PENALTY;
                issues.push(format!("only {} items (want {MIN_LIST_ITEMS}+)", items.len()));
            }
            items.join("\n").to_lowercase()
        }
    };

    for phrase in HEDGING_PHRASES {
        if contains_word(&flat, phrase) {
            score -= HEDGE_PENALTY;
            issues.push(format!("hedging language: \"{phrase}\""));
        }
    }

    let required = required_elements(key);
    if !required.is_empty() {
        let missing: Vec<&str> = required
            .iter()
            .filter(|element| !flat.contains(*element))
            .copied()
            .collect();
        if !missing.is_empty() {
            score -= MISSING_ELEMENTS_PENALTY * missing.len() as f64 / required.len() as f64;
            issues.push(format!("missing: {}", missing.join(", ")));
        }
    }

    let score = round2(score.clamp(0.0, 1.0));
    SectionQuality {
        section: key,
        score,
        level: QualityLevel::from_score(score),
        issues,
    }
}

fn contains_word(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
