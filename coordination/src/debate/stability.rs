//! Convergence predicates over the PRD.
//!
//! A debate is done when the PRD is stable under the configured policy and
//! every advisor agreed in the same round.

use serde::{Deserialize, Serialize};

use crate::prd::{PrdModel, SectionKey};

/// Decides whether a PRD has settled.
pub trait StabilityPolicy: Send + Sync + std::fmt::Debug {
    fn is_stable(&self, prd: &PrdModel) -> bool;

    fn name(&self) -> &'static str;
}

/// Stable iff the open-questions section is empty. An untouched PRD counts
/// as stable under this policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenQuestionsPolicy;

impl StabilityPolicy for OpenQuestionsPolicy {
    fn is_stable(&self, prd: &PrdModel) -> bool {
        prd.is_section_empty(SectionKey::OpenQuestions)
    }

    fn name(&self) -> &'static str {
        "open_questions"
    }
}

/// No open questions and at least `min_populated_sections` other sections
/// with content.
#[derive(Debug, Clone, Copy)]
pub struct CoveragePolicy {
    pub min_populated_sections: usize,
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            min_populated_sections: 1,
        }
    }
}

impl StabilityPolicy for CoveragePolicy {
    fn is_stable(&self, prd: &PrdModel) -> bool {
        if !prd.is_section_empty(SectionKey::OpenQuestions) {
            return false;
        }
        let populated = prd
            .populated_sections()
            .into_iter()
            .filter(|key| *key != SectionKey::OpenQuestions)
            .count();
        populated >= self.min_populated_sections
    }

    fn name(&self) -> &'static str {
        "coverage"
    }
}

/// Serializable policy selection for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum StabilityMode {
    OpenQuestions,
    Coverage { min_populated_sections: usize },
}

impl Default for StabilityMode {
    fn default() -> Self {
        Self::Coverage {
            min_populated_sections: CoveragePolicy::default().min_populated_sections,
        }
    }
}

impl StabilityMode {
    pub fn policy(self) -> Box<dyn StabilityPolicy> {
        match self {
            Self::OpenQuestions => Box::new(OpenQuestionsPolicy),
            Self::Coverage {
                min_populated_sections,
            } => Box::new(CoveragePolicy {
                min_populated_sections,
            }),
        }
    }
}

/// Terminal condition for a round.
pub fn is_done(policy: &dyn StabilityPolicy, prd: &PrdModel, round_agreement: bool) -> bool {
    round_agreement && policy.is_stable(prd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prd::{merge_section, SectionContent};

    fn with_open_question() -> PrdModel {
        let mut prd = PrdModel::new();
        merge_section(
            &mut prd,
            SectionKey::OpenQuestions,
            SectionContent::List(vec!["Which regions at launch?".into()]),
        );
        prd
    }

    #[test]
    fn test_fresh_prd_stability_differs_by_policy() {
        let prd = PrdModel::new();
        assert!(OpenQuestionsPolicy.is_stable(&prd));
        assert!(!CoveragePolicy::default().is_stable(&prd));
    }

    #[test]
    fn test_open_questions_block_both_policies() {
        let mut prd = with_open_question();
        merge_section(
            &mut prd,
            SectionKey::Objectives,
            SectionContent::List(vec!["Launch in Q3".into()]),
        );
        assert!(!OpenQuestionsPolicy.is_stable(&prd));
        assert!(!CoveragePolicy::default().is_stable(&prd));
    }

    #[test]
    fn test_coverage_threshold() {
        let mut prd = PrdModel::new();
        merge_section(
            &mut prd,
            SectionKey::Objectives,
            SectionContent::List(vec!["Launch in Q3".into()]),
        );
        let strict = CoveragePolicy {
            min_populated_sections: 2,
        };
        assert!(CoveragePolicy::default().is_stable(&prd));
        assert!(!strict.is_stable(&prd));
    }

    #[test]
    fn test_done_requires_agreement() {
        let prd = PrdModel::new();
        assert!(!is_done(&OpenQuestionsPolicy, &prd, false));
        assert!(is_done(&OpenQuestionsPolicy, &prd, true));
    }

    #[test]
    fn test_mode_builds_policy() {
        assert_eq!(StabilityMode::default().policy().name(), "coverage");
        assert_eq!(StabilityMode::OpenQuestions.policy().name(), "open_questions");
    }
}
