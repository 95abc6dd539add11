use crate::catalog::{WasteZoneCatalog, ZoneSpec};
use crate::error::ValidationError;
use crate::models::{ScoredAudit, Submission, WasteZoneResult};

pub const BASE_SCORE: u32 = 40;
pub const KEYWORD_POINTS: u32 = 10;
pub const MAX_SCORE: u32 = 100;

/// Scores submissions against a catalog. Pure; safe to share across threads.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    catalog: WasteZoneCatalog,
}

impl ScoringEngine {
    pub fn new(catalog: WasteZoneCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, submission: &Submission) -> Result<(), ValidationError> {
        if submission.company_name.trim().is_empty() {
            return Err(ValidationError::MissingCompanyName);
        }

        if submission.answers.len() != self.catalog.len() {
            return Err(ValidationError::AnswerCount {
                expected: self.catalog.len(),
                actual: submission.answers.len(),
            });
        }

        if let Some(index) = submission
            .answers
            .iter()
            .position(|answer| answer.trim().is_empty())
        {
            return Err(ValidationError::EmptyAnswer { question: index + 1 });
        }

        Ok(())
    }

    pub fn score(&self, submission: &Submission) -> Result<ScoredAudit, ValidationError> {
        self.validate(submission)?;

        let mut ranked: Vec<(usize, WasteZoneResult)> = self
            .catalog
            .zones()
            .iter()
            .zip(submission.answers.iter())
            .enumerate()
            .map(|(index, (spec, answer))| (index, self.score_zone(spec, answer)))
            .collect();

        let total: u32 = ranked.iter().map(|(_, zone)| u32::from(zone.score)).sum();
        let total_hours_wasted: u32 = ranked.iter().map(|(_, zone)| zone.hours_wasted).sum();
        let overall_score = mean_round_half_up(total, ranked.len() as u32);

        ranked.sort_by(|(a_index, a), (b_index, b)| {
            b.roi
                .cmp(&a.roi)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a_index.cmp(b_index))
        });

        Ok(ScoredAudit {
            submission: submission.clone(),
            zones: ranked.into_iter().map(|(_, zone)| zone).collect(),
            overall_score,
            total_hours_wasted,
        })
    }

    fn score_zone(&self, spec: &ZoneSpec, answer: &str) -> WasteZoneResult {
        let score = keyword_score(answer, &spec.keywords);
        WasteZoneResult {
            zone: spec.zone.clone(),
            score,
            hours_wasted: hours_wasted(score, spec.max_monthly_hours),
            complexity: spec.complexity,
            roi: spec.roi,
            recommendation: self.catalog.recommendation(spec, spec.complexity),
        }
    }
}

/// Base score plus a bonus per distinct keyword found, clamped to 0..=100.
pub fn keyword_score(answer: &str, keywords: &[String]) -> u8 {
    let text = answer.to_lowercase();
    let mut seen: Vec<&str> = Vec::new();

    for keyword in keywords {
        let keyword = keyword.as_str();
        if !keyword.is_empty() && !seen.contains(&keyword) && text.contains(keyword) {
            seen.push(keyword);
        }
    }

    let raw = BASE_SCORE + KEYWORD_POINTS * seen.len() as u32;
    raw.min(MAX_SCORE) as u8
}

/// `round(score / 100 * max_hours)`, rounding halves up.
pub fn hours_wasted(score: u8, max_monthly_hours: u32) -> u32 {
    let scaled = u64::from(score) * u64::from(max_monthly_hours);
    ((scaled + 50) / 100) as u32
}

fn mean_round_half_up(total: u32, count: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    ((2 * total + count) / (2 * count)).min(MAX_SCORE) as u8
}
