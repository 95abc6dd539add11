use tracing::{info, warn};

use crate::config::CipConfig;
use crate::insights::InsightGenerator;
use crate::models::{
    InsightRecord, PatternKind, PatternObservation, PatternPayload, ScoredAudit, Submission,
};
use crate::patterns::PatternStore;

/// Feeds each scored submission into the pattern store and triggers insight
/// generation on threshold crossings.
pub struct CipRecorder<'a, S: PatternStore + ?Sized> {
    store: &'a S,
    config: &'a CipConfig,
}

impl<'a, S: PatternStore + ?Sized> CipRecorder<'a, S> {
    pub fn new(store: &'a S, config: &'a CipConfig) -> Self {
        Self { store, config }
    }

    /// Never fails the caller: store errors are logged and yield no insights.
    pub async fn record(&self, submission: &Submission, audit: &ScoredAudit) -> Vec<InsightRecord> {
        let observations = observations_for(submission, audit);
        let total_submissions = match self.store.record_observations(&observations).await {
            Ok(total) => total,
            Err(err) => {
                warn!(
                    company = %submission.company_name,
                    error = %err,
                    "dropping CIP pattern update"
                );
                return Vec::new();
            }
        };
        info!(
            total_submissions,
            patterns = observations.len(),
            "recorded submission patterns"
        );

        // Patterns and counter are committed at this point; only the batch's
        // insights can still be lost.
        match InsightGenerator::new(self.store, self.config)
            .maybe_generate(total_submissions)
            .await
        {
            Ok(insights) => insights,
            Err(err) => {
                warn!(
                    total_submissions,
                    error = %err,
                    "insight generation failed for batch at {total_submissions}"
                );
                Vec::new()
            }
        }
    }
}

/// Candidate patterns for one submission. Scores are the overall waste score.
pub fn observations_for(submission: &Submission, audit: &ScoredAudit) -> Vec<PatternObservation> {
    let score = f64::from(audit.overall_score);
    let mut observations = Vec::with_capacity(3);

    if let Some(industry) = submission.industry_label() {
        observations.push(PatternObservation {
            kind: PatternKind::Industry,
            payload: PatternPayload::Industry {
                industry: industry.to_string(),
            },
            score,
        });
    }

    if let Some(top) = audit.zones.first() {
        observations.push(PatternObservation {
            kind: PatternKind::WasteZone,
            payload: PatternPayload::Zone {
                zone: top.zone.clone(),
            },
            score,
        });
    }

    if let [first, second, ..] = audit.zones.as_slice() {
        observations.push(PatternObservation {
            kind: PatternKind::CoOccurrence,
            payload: PatternPayload::zone_pair(&first.zone, &second.zone),
            score,
        });
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::error::PersistenceError;

    use crate::catalog::WasteZoneCatalog;
    use crate::patterns::MemoryPatternStore;
    use crate::scoring::ScoringEngine;

    struct FailingStore;

    #[async_trait]
    impl PatternStore for FailingStore {
        async fn record_observations(
            &self,
            _observations: &[PatternObservation],
        ) -> Result<i64, PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }

        async fn patterns(&self, _kind: PatternKind) -> Result<Vec<crate::models::PatternRecord>, PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }

        async fn append_insights(&self, _insights: &[InsightRecord]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }

        async fn recent_insights(
            &self,
            _limit: usize,
            _since: Option<DateTime<Utc>>,
        ) -> Result<Vec<InsightRecord>, PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
    }

    struct InsightsOfflineStore {
        inner: MemoryPatternStore,
    }

    #[async_trait]
    impl PatternStore for InsightsOfflineStore {
        async fn record_observations(
            &self,
            observations: &[PatternObservation],
        ) -> Result<i64, PersistenceError> {
            self.inner.record_observations(observations).await
        }

        async fn patterns(&self, kind: PatternKind) -> Result<Vec<crate::models::PatternRecord>, PersistenceError> {
            self.inner.patterns(kind).await
        }

        async fn append_insights(&self, _insights: &[InsightRecord]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("insights table offline".to_string()))
        }

        async fn recent_insights(
            &self,
            limit: usize,
            since: Option<DateTime<Utc>>,
        ) -> Result<Vec<InsightRecord>, PersistenceError> {
            self.inner.recent_insights(limit, since).await
        }
    }

    fn submission(industry: Option<&str>, answers: [&str; 8]) -> Submission {
        Submission {
            company_name: "Kilimo Supplies".to_string(),
            industry: industry.map(str::to_string),
            team_size: Some("11-50".to_string()),
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn busy_answers() -> [&'static str; 8] {
        [
            "We explain it every day",
            "Same report",
            "We search for minutes",
            "Manual",
            "Check it",
            "Frustrated",
            "Copy and paste, repetitive, no thinking",
            "Only one person",
        ]
    }

    #[test]
    fn observations_cover_industry_top_zone_and_pair() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let input = submission(Some("Retail"), busy_answers());
        let audit = engine.score(&input).expect("scores");
        let observations = observations_for(&input, &audit);

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].kind, PatternKind::Industry);
        assert_eq!(
            observations[1].payload,
            PatternPayload::Zone {
                zone: audit.zones[0].zone.clone()
            }
        );
        assert_eq!(
            observations[2].payload,
            PatternPayload::zone_pair(&audit.zones[0].zone, &audit.zones[1].zone)
        );
        assert!(observations
            .iter()
            .all(|o| o.score == f64::from(audit.overall_score)));
    }

    #[test]
    fn missing_industry_is_not_recorded() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let input = submission(Some(""), busy_answers());
        let audit = engine.score(&input).expect("scores");
        let observations = observations_for(&input, &audit);
        assert!(observations.iter().all(|o| o.kind != PatternKind::Industry));
        assert_eq!(observations.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let input = submission(Some("Retail"), busy_answers());
        let audit = engine.score(&input).expect("scores");
        let config = CipConfig::default();

        let recorder = CipRecorder::new(&FailingStore, &config);
        assert!(recorder.record(&input, &audit).await.is_empty());
        assert_eq!(audit.zones.len(), 8);
    }

    #[tokio::test]
    async fn generation_failure_keeps_recorded_patterns() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let store = InsightsOfflineStore {
            inner: MemoryPatternStore::new(),
        };
        let config = CipConfig::default();
        let recorder = CipRecorder::new(&store, &config);

        for _ in 0..10 {
            let input = submission(Some("Retail"), busy_answers());
            let audit = engine.score(&input).expect("scores");
            assert!(recorder.record(&input, &audit).await.is_empty());
        }

        assert_eq!(store.inner.submission_count().expect("count"), 10);
        let zones = store.inner.patterns(PatternKind::WasteZone).await.expect("zones");
        assert_eq!(zones[0].frequency, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_generate_once_per_threshold() {
        let engine = Arc::new(ScoringEngine::new(WasteZoneCatalog::default()));
        let store = Arc::new(MemoryPatternStore::new());
        let config = Arc::new(CipConfig::default());

        let mut handles = Vec::new();
        for _ in 0..100 {
            let engine = Arc::clone(&engine);
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            handles.push(tokio::spawn(async move {
                let input = submission(Some("Retail"), busy_answers());
                let audit = engine.score(&input).expect("scores");
                CipRecorder::new(store.as_ref(), config.as_ref())
                    .record(&input, &audit)
                    .await
                    .len()
            }));
        }

        let mut batches = 0;
        let mut generated = 0;
        for handle in handles {
            let count = handle.await.expect("task joins");
            if count > 0 {
                batches += 1;
                generated += count;
            }
        }

        assert_eq!(batches, 10);
        assert_eq!(generated, 30);
        assert_eq!(store.submission_count().expect("count"), 100);
        let zones = store.patterns(PatternKind::WasteZone).await.expect("zones");
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].frequency, 100);
        let industries = store.patterns(PatternKind::Industry).await.expect("industries");
        assert_eq!(industries[0].frequency, 100);
    }

    #[tokio::test]
    async fn tenth_submission_triggers_insights_once() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let store = MemoryPatternStore::new();
        let config = CipConfig::default();
        let recorder = CipRecorder::new(&store, &config);

        let mut batches = Vec::new();
        for _ in 0..20 {
            let input = submission(Some("Retail"), busy_answers());
            let audit = engine.score(&input).expect("scores");
            batches.push(recorder.record(&input, &audit).await.len());
        }

        let triggered: Vec<usize> = batches
            .iter()
            .enumerate()
            .filter(|(_, generated)| **generated > 0)
            .map(|(index, _)| index + 1)
            .collect();
        assert_eq!(triggered, vec![10, 20]);
        // one zone, one industry and one pair pattern each time
        assert_eq!(batches[9], 3);

        let zones = store.patterns(PatternKind::WasteZone).await.expect("zones");
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].frequency, 20);
    }

    #[tokio::test]
    async fn same_top_zone_averages_overall_scores() {
        let engine = ScoringEngine::new(WasteZoneCatalog::default());
        let store = MemoryPatternStore::new();
        let config = CipConfig::default();
        let recorder = CipRecorder::new(&store, &config);

        let quiet = submission(None, ["a"; 8]);
        let loud = submission(None, busy_answers());
        let mut scores = Vec::new();
        for input in [&quiet, &loud] {
            let audit = engine.score(input).expect("scores");
            assert_eq!(audit.zones[0].zone, "Information Access Gap");
            scores.push(f64::from(audit.overall_score));
            recorder.record(input, &audit).await;
        }

        let zones = store.patterns(PatternKind::WasteZone).await.expect("zones");
        assert_eq!(zones[0].frequency, 2);
        let mean = (scores[0] + scores[1]) / 2.0;
        assert!((zones[0].avg_score - mean).abs() < 1e-9);
    }
}
