use std::fmt::Write;

use crate::models::{InsightRecord, MarketSummary, Opportunity, PatternRecord, ScoredAudit};

/// KSh per wasted hour used for the cost estimate.
pub const HOURLY_COST: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn for_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Urgency::Critical,
            60..=79 => Urgency::High,
            40..=59 => Urgency::Medium,
            _ => Urgency::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Urgency::Critical => "CRITICAL",
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }
}

pub fn build_audit_report(audit: &ScoredAudit) -> String {
    let mut output = String::new();
    let submission = &audit.submission;

    let _ = writeln!(output, "# Intelligence Waste Audit");
    let _ = writeln!(output, "Prepared for {}", submission.company_name);
    if let Some(industry) = submission.industry_label() {
        let _ = writeln!(output, "Industry: {industry}");
    }
    if let Some(team_size) = submission.team_size.as_deref() {
        let _ = writeln!(output, "Team size: {team_size}");
    }
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Waste score: {}/100 ({})",
        audit.overall_score,
        Urgency::for_score(audit.overall_score).label()
    );
    let _ = writeln!(
        output,
        "Hours wasted: {} per month (about KSh {} per month)",
        audit.total_hours_wasted,
        audit.total_hours_wasted * HOURLY_COST
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Waste Zones by ROI");
    for (rank, zone) in audit.zones.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {}: score {}, {} h/month, {} complexity, {}% ROI",
            rank + 1,
            zone.zone,
            zone.score,
            zone.hours_wasted,
            zone.complexity,
            zone.roi
        );
        let _ = writeln!(output, "   {}", zone.recommendation);
    }

    let quick_wins = audit.quick_wins();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Quick Wins");
    if quick_wins.is_empty() {
        let _ = writeln!(output, "No low-complexity zones in this audit.");
    } else {
        for zone in quick_wins {
            let _ = writeln!(output, "- {} ({} h/month)", zone.zone, zone.hours_wasted);
        }
    }

    output
}

pub fn build_intelligence_report(
    summary: &MarketSummary,
    top_zones: &[PatternRecord],
    opportunities: &[Opportunity],
    insights: &[InsightRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Market Intelligence Report");
    let _ = writeln!(
        output,
        "{} audits recorded, average waste score {:.1}",
        summary.total_audits, summary.avg_overall_score
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Waste Zones");
    if top_zones.is_empty() {
        let _ = writeln!(output, "No waste zone patterns recorded yet.");
    } else {
        for record in top_zones.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} audits (avg score {:.1})",
                record.payload.label(),
                record.frequency,
                record.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Market Opportunities");
    if opportunities.is_empty() {
        let _ = writeln!(output, "No pattern has enough audits to size yet.");
    } else {
        for opportunity in opportunities {
            let _ = writeln!(
                output,
                "- Build {} AI template: {} companies, avg pain {:.1}, potential KSh {:.0}",
                opportunity.label, opportunity.frequency, opportunity.avg_score, opportunity.value
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Insights");
    if insights.is_empty() {
        let _ = writeln!(output, "No insights generated yet.");
    } else {
        for insight in insights {
            let _ = writeln!(
                output,
                "- [{}] {} (confidence {:.2})",
                insight.insight_type, insight.text, insight.confidence
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    match opportunities.first() {
        Some(top) => {
            let _ = writeln!(
                output,
                "- BUILD: {} AI template - {} companies need this (KSh {:.0} potential)",
                top.label, top.frequency, top.value
            );
        }
        None => {
            let _ = writeln!(output, "- Keep collecting audits.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WasteZoneCatalog;
    use crate::models::{PatternKind, PatternPayload, Submission};
    use crate::opportunity;
    use crate::scoring::ScoringEngine;

    #[test]
    fn urgency_follows_score_bands() {
        assert_eq!(Urgency::for_score(95), Urgency::Critical);
        assert_eq!(Urgency::for_score(80), Urgency::Critical);
        assert_eq!(Urgency::for_score(60), Urgency::High);
        assert_eq!(Urgency::for_score(40), Urgency::Medium);
        assert_eq!(Urgency::for_score(39), Urgency::Low);
    }

    #[test]
    fn audit_report_lists_zones_and_cost() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let audit = engine
            .score(&Submission {
                company_name: "Savanna Freight".to_string(),
                industry: Some("Logistics".to_string()),
                team_size: None,
                answers: vec!["It happens".to_string(); 8],
            })
            .expect("scores");
        let report = build_audit_report(&audit);

        assert!(report.contains("Prepared for Savanna Freight"));
        assert!(report.contains("Waste score: 40/100 (MEDIUM)"));
        assert!(report.contains(&format!(
            "Hours wasted: {} per month (about KSh {} per month)",
            audit.total_hours_wasted,
            audit.total_hours_wasted * HOURLY_COST
        )));
        assert!(report.contains("1. Information Access Gap"));
        assert!(report.contains("## Quick Wins"));
    }

    #[test]
    fn intelligence_report_recommends_top_opportunity() {
        let zones = vec![PatternRecord {
            kind: PatternKind::WasteZone,
            payload: PatternPayload::Zone {
                zone: "Mechanical Tasks".to_string(),
            },
            frequency: 6,
            avg_score: 70.0,
        }];
        let opportunities = opportunity::rank(&zones, 5000.0);
        let report = build_intelligence_report(
            &MarketSummary {
                total_audits: 12,
                avg_overall_score: 61.5,
            },
            &zones,
            &opportunities,
            &[],
        );

        assert!(report.contains("12 audits recorded, average waste score 61.5"));
        assert!(report.contains("- Mechanical Tasks: 6 audits (avg score 70.0)"));
        assert!(report.contains(
            "- BUILD: Mechanical Tasks AI template - 6 companies need this (KSh 21000 potential)"
        ));
        assert!(report.contains("No insights generated yet."));
    }
}
