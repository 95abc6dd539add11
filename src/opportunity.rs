use std::cmp::Ordering;

use crate::models::{Opportunity, PatternRecord};

/// Orders patterns by `frequency * revenue_per_client * avg_score / 100`.
pub fn rank(records: &[PatternRecord], revenue_per_client: f64) -> Vec<Opportunity> {
    let mut opportunities: Vec<Opportunity> = records
        .iter()
        .map(|record| Opportunity {
            kind: record.kind,
            label: record.payload.label(),
            frequency: record.frequency,
            avg_score: record.avg_score,
            value: opportunity_value(record.frequency, record.avg_score, revenue_per_client),
        })
        .collect();

    opportunities.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| a.label.cmp(&b.label))
    });
    opportunities
}

pub fn opportunity_value(frequency: i64, avg_score: f64, revenue_per_client: f64) -> f64 {
    frequency as f64 * revenue_per_client * (avg_score / 100.0)
}
