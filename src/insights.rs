use std::cmp::Ordering;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CipConfig;
use crate::error::PersistenceError;
use crate::models::{InsightRecord, PatternKind, PatternRecord};
use crate::patterns::PatternStore;

/// Turns accumulated pattern records into insight records once per
/// `insight_threshold` submissions.
pub struct InsightGenerator<'a, S: PatternStore + ?Sized> {
    store: &'a S,
    config: &'a CipConfig,
}

impl<'a, S: PatternStore + ?Sized> InsightGenerator<'a, S> {
    pub fn new(store: &'a S, config: &'a CipConfig) -> Self {
        Self { store, config }
    }

    pub fn should_generate(&self, total_submissions: i64) -> bool {
        total_submissions > 0 && total_submissions % self.config.insight_threshold == 0
    }

    /// Returns an empty list when the threshold is not crossed.
    pub async fn maybe_generate(
        &self,
        total_submissions: i64,
    ) -> Result<Vec<InsightRecord>, PersistenceError> {
        if !self.should_generate(total_submissions) {
            debug!(total_submissions, "insight generation skipped");
            return Ok(Vec::new());
        }

        let mut insights = Vec::new();
        for kind in [
            PatternKind::WasteZone,
            PatternKind::Industry,
            PatternKind::CoOccurrence,
        ] {
            let mut records = self.store.patterns(kind).await?;
            sort_by_prevalence(&mut records);
            for (rank, record) in records.iter().take(self.config.top_k).enumerate() {
                insights.push(self.build_insight(record, rank, total_submissions));
            }
        }

        if !insights.is_empty() {
            self.store.append_insights(&insights).await?;
            info!(
                total_submissions,
                generated = insights.len(),
                "generated market insights"
            );
        }

        Ok(insights)
    }

    fn build_insight(
        &self,
        record: &PatternRecord,
        rank: usize,
        total_submissions: i64,
    ) -> InsightRecord {
        let label = record.payload.label();
        let standing = if rank == 0 {
            "most common".to_string()
        } else {
            format!("#{} most common", rank + 1)
        };

        let (insight_type, text) = match record.kind {
            PatternKind::WasteZone => (
                "waste_zone_trend",
                format!(
                    "{label} appears in {} audits ({standing}); average severity {:.1}/100.",
                    record.frequency, record.avg_score
                ),
            ),
            PatternKind::Industry => (
                "industry_trend",
                format!(
                    "{label} accounts for {} audits ({standing}); average waste score {:.1}/100.",
                    record.frequency, record.avg_score
                ),
            ),
            PatternKind::CoOccurrence => (
                "zone_pairing",
                format!(
                    "{label} lead together in {} audits ({standing}); average severity {:.1}/100.",
                    record.frequency, record.avg_score
                ),
            ),
        };

        InsightRecord {
            insight_type: insight_type.to_string(),
            text,
            confidence: support_confidence(
                record.frequency,
                total_submissions,
                self.config.confidence_scaling,
            ),
            supporting_data: json!({
                "pattern_type": record.kind.as_str(),
                "pattern_data": record.payload,
                "frequency": record.frequency,
                "avg_score": record.avg_score,
                "total_submissions": total_submissions,
                "rank": rank + 1,
                "scaling_factor": self.config.confidence_scaling,
            }),
            generated_at: Utc::now(),
        }
    }
}

/// Support ratio scaled and capped at 1.0. A heuristic, not a calibrated
/// probability.
pub fn support_confidence(frequency: i64, total_submissions: i64, scaling: f64) -> f64 {
    if total_submissions <= 0 {
        return 0.0;
    }
    (frequency as f64 / total_submissions as f64 * scaling).clamp(0.0, 1.0)
}

/// Frequency desc, then average desc, then label for a stable order.
pub fn sort_by_prevalence(records: &mut [PatternRecord]) {
    records.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| {
                b.avg_score
                    .partial_cmp(&a.avg_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.payload.label().cmp(&b.payload.label()))
    });
}
