use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PersistenceError;
use crate::models::{InsightRecord, PatternKind, PatternObservation, PatternPayload, PatternRecord};

/// Shared learning state behind CIP. Implementations must apply
/// `record_observations` atomically: every upsert plus the submission counter
/// increment commit together or not at all.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Upserts each observation and bumps the submission counter, returning
    /// the counter value this call produced.
    async fn record_observations(
        &self,
        observations: &[PatternObservation],
    ) -> Result<i64, PersistenceError>;

    async fn patterns(&self, kind: PatternKind) -> Result<Vec<PatternRecord>, PersistenceError>;

    async fn append_insights(&self, insights: &[InsightRecord]) -> Result<(), PersistenceError>;

    /// Highest-confidence insights first, newest first within a confidence,
    /// optionally restricted to those generated at or after `since`.
    async fn recent_insights(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InsightRecord>, PersistenceError>;
}

/// Incremental mean: `old + (observed - old) / frequency`.
pub fn running_average(old_avg: f64, observed: f64, new_frequency: i64) -> f64 {
    if new_frequency <= 1 {
        return observed;
    }
    old_avg + (observed - old_avg) / new_frequency as f64
}

#[derive(Debug, Default)]
struct MemoryState {
    patterns: BTreeMap<(PatternKind, PatternPayload), PatternRecord>,
    submissions: i64,
    insights: Vec<InsightRecord>,
}

/// Process-local store used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    state: Mutex<MemoryState>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submission_count(&self) -> Result<i64, PersistenceError> {
        Ok(self.lock()?.submissions)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, PersistenceError> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn record_observations(
        &self,
        observations: &[PatternObservation],
    ) -> Result<i64, PersistenceError> {
        let mut state = self.lock()?;

        for observation in observations {
            let key = (observation.kind, observation.payload.clone());
            state
                .patterns
                .entry(key)
                .and_modify(|record| {
                    record.frequency += 1;
                    record.avg_score =
                        running_average(record.avg_score, observation.score, record.frequency);
                })
                .or_insert_with(|| PatternRecord {
                    kind: observation.kind,
                    payload: observation.payload.clone(),
                    frequency: 1,
                    avg_score: observation.score,
                });
        }

        state.submissions += 1;
        Ok(state.submissions)
    }

    async fn patterns(&self, kind: PatternKind) -> Result<Vec<PatternRecord>, PersistenceError> {
        let state = self.lock()?;
        Ok(state
            .patterns
            .values()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect())
    }

    async fn append_insights(&self, insights: &[InsightRecord]) -> Result<(), PersistenceError> {
        self.lock()?.insights.extend_from_slice(insights);
        Ok(())
    }

    async fn recent_insights(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InsightRecord>, PersistenceError> {
        let state = self.lock()?;
        let mut insights: Vec<InsightRecord> = state
            .insights
            .iter()
            .filter(|insight| since.map_or(true, |cutoff| insight.generated_at >= cutoff))
            .cloned()
            .collect();
        insights.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.generated_at.cmp(&a.generated_at))
        });
        insights.truncate(limit);
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_observation(zone: &str, score: f64) -> PatternObservation {
        PatternObservation {
            kind: PatternKind::WasteZone,
            payload: PatternPayload::Zone {
                zone: zone.to_string(),
            },
            score,
        }
    }

    #[test]
    fn running_average_matches_mean() {
        let scores = [55.0, 72.0, 61.0, 90.0, 48.0];
        let mut avg = 0.0;
        for (index, score) in scores.iter().enumerate() {
            avg = running_average(avg, *score, index as i64 + 1);
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        assert!((avg - mean).abs() < 1e-9);
    }

    #[tokio::test]
    async fn two_observations_average_their_scores() {
        let store = MemoryPatternStore::new();
        store
            .record_observations(&[zone_observation("Mechanical Tasks", 60.0)])
            .await
            .expect("first record");
        let count = store
            .record_observations(&[zone_observation("Mechanical Tasks", 80.0)])
            .await
            .expect("second record");
        assert_eq!(count, 2);

        let patterns = store.patterns(PatternKind::WasteZone).await.expect("patterns");
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].frequency, 2);
        assert!((patterns[0].avg_score - 70.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn keys_are_scoped_by_kind_and_payload() {
        let store = MemoryPatternStore::new();
        store
            .record_observations(&[
                zone_observation("Mechanical Tasks", 60.0),
                zone_observation("Knowledge Silos", 50.0),
                PatternObservation {
                    kind: PatternKind::Industry,
                    payload: PatternPayload::Industry {
                        industry: "Retail".to_string(),
                    },
                    score: 60.0,
                },
            ])
            .await
            .expect("record");

        assert_eq!(store.patterns(PatternKind::WasteZone).await.expect("zones").len(), 2);
        assert_eq!(store.patterns(PatternKind::Industry).await.expect("industries").len(), 1);
        assert!(store
            .patterns(PatternKind::CoOccurrence)
            .await
            .expect("pairs")
            .is_empty());
        assert_eq!(store.submission_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn recent_insights_respect_window_and_order() {
        let store = MemoryPatternStore::new();
        let now = Utc::now();
        let insight = |text: &str, confidence: f64, days_ago: i64| InsightRecord {
            insight_type: "waste_zone_trend".to_string(),
            text: text.to_string(),
            confidence,
            supporting_data: serde_json::json!({}),
            generated_at: now - chrono::Duration::days(days_ago),
        };
        store
            .append_insights(&[
                insight("stale", 0.9, 45),
                insight("weak", 0.3, 1),
                insight("strong", 0.8, 2),
            ])
            .await
            .expect("append");

        let all = store.recent_insights(10, None).await.expect("all");
        let texts: Vec<&str> = all.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["stale", "strong", "weak"]);

        let cutoff = now - chrono::Duration::days(30);
        let windowed = store.recent_insights(1, Some(cutoff)).await.expect("windowed");
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].text, "strong");
    }
}
