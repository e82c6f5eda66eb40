//! Markdown rendering of a PRD and its debate history.

use std::fmt::Write as _;

use crate::debate::advisor::AdvisorId;
use crate::debate::context::key_point;
use crate::debate::insights::DebateInsights;
use crate::debate::state::RoundRecord;
use crate::prd::{PrdModel, SectionContent};

const EMPTY_SECTION: &str = "_(no entries)_";

/// Render the normalized PRD followed by a debate-history appendix and the
/// per-advisor insights drawn from it.
pub fn render_markdown(topic: &str, prd: &PrdModel, history: &[RoundRecord]) -> String {
    let prd = prd.normalized();
    let mut out = format!("# Product Requirements: {topic}\n");

    for (key, content) in prd.iter() {
        let _ = write!(out, "\n## {}\n\n", key.title());
        match content {
            _ if content.is_empty() => {
                let _ = writeln!(out, "{EMPTY_SECTION}");
            }
            SectionContent::Text(text) => {
                let _ = writeln!(out, "{text}");
            }
            SectionContent::List(items) => {
                for item in items {
                    let _ = writeln!(out, "- {item}");
                }
            }
        }
    }

    if !history.is_empty() {
        out.push_str("\n---\n\n## Debate History\n");
        for record in history {
            let _ = write!(
                out,
                "\n### Round {} ({}) - {}\n\n",
                record.round,
                record.kind,
                if record.agreement { "agreed" } else { "open" }
            );
            if let Some(question) = &record.directed {
                let _ = writeln!(
                    out,
                    "> User asked {}: {}\n",
                    question.advisor.display_name(),
                    question.message
                );
            }
            for turn in &record.turns {
                let status = if turn.failed {
                    "failed"
                } else if turn.agreed {
                    "agreed"
                } else {
                    "no change"
                };
                let excerpt = if turn.failed {
                    turn.text.clone()
                } else {
                    key_point(&turn.text).unwrap_or_default()
                };
                let _ = writeln!(
                    out,
                    "- **{}** ({status}): {excerpt}",
                    turn.advisor.display_name()
                );
            }
        }
        render_insights(&mut out, history);
    }

    out
}

fn render_insights(out: &mut String, history: &[RoundRecord]) {
    let per_advisor: Vec<(AdvisorId, DebateInsights)> = AdvisorId::ROSTER
        .iter()
        .map(|&advisor| (advisor, DebateInsights::from_history(history, advisor)))
        .filter(|(_, insights)| !insights.is_empty())
        .collect();
    if per_advisor.is_empty() {
        return;
    }

    out.push_str("\n## Debate Insights\n");
    for (advisor, insights) in per_advisor {
        let _ = write!(out, "\n### {}\n\n", advisor.display_name());
        let groups = [
            ("Consensus", &insights.consensus_points),
            ("Decision", &insights.key_decisions),
            ("Integration", &insights.integration_points),
        ];
        for (label, points) in groups {
            for point in points {
                let _ = writeln!(out, "- {label}: {point}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::advisor::AdvisorId;
    use crate::debate::state::{AdvisorTurn, RoundKind};
    use crate::prd::{merge_section, SectionKey, Stance};
    use chrono::Utc;

    #[test]
    fn test_sections_render_in_fixed_order() {
        let mut prd = PrdModel::new();
        merge_section(
            &mut prd,
            SectionKey::Risks,
            SectionContent::List(vec!["Vendor lock-in".into()]),
        );
        merge_section(
            &mut prd,
            SectionKey::Overview,
            SectionContent::Text("A shared planner for small teams.".into()),
        );

        let md = render_markdown("Team task planner", &prd, &[]);
        assert!(md.starts_with("# Product Requirements: Team task planner\n"));
        let overview = md.find("## Overview").unwrap();
        let objectives = md.find("## Objectives").unwrap();
        let risks = md.find("## Risks").unwrap();
        assert!(overview < objectives && objectives < risks);
        assert!(md.contains("- Vendor lock-in"));
        assert!(md.contains("## Objectives\n\n_(no entries)_"));
        assert!(!md.contains("Debate History"));
    }

    #[test]
    fn test_history_appendix() {
        let record = RoundRecord {
            round: 1,
            kind: RoundKind::Opening,
            started_at: Utc::now(),
            duration_ms: 0,
            directed: None,
            agreement: false,
            turns: vec![
                AdvisorTurn {
                    advisor: AdvisorId::Ux,
                    text: "We should keep onboarding under two minutes.".into(),
                    failed: false,
                    stance: Stance::Agree,
                    sections_changed: vec![SectionKey::DesignNotes],
                    agreed: true,
                },
                AdvisorTurn {
                    advisor: AdvisorId::Database,
                    text: "Error: request timed out".into(),
                    failed: true,
                    stance: Stance::Unstated,
                    sections_changed: vec![],
                    agreed: false,
                },
            ],
        };
        let md = render_markdown("topic", &PrdModel::new(), &[record]);
        assert!(md.contains("### Round 1 (opening) - open"));
        assert!(md.contains("- **UX Designer** (agreed): keep onboarding under two minutes"));
        assert!(md.contains("- **Database Expert** (failed): Error: request timed out"));
        assert!(md.contains("## Debate Insights\n\n### UX Designer"));
        assert!(md.contains("- Consensus: keep onboarding under two minutes"));
    }
}
