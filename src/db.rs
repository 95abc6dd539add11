use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{
    InsightRecord, MarketSummary, PatternKind, PatternObservation, PatternPayload, PatternRecord,
    ScoredAudit, Submission,
};
use crate::patterns::PatternStore;

const SUBMISSION_COUNTER: &str = "submissions";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Identifiers assigned to a persisted audit.
#[derive(Debug, Clone)]
pub struct SavedAudit {
    pub audit_id: Uuid,
    pub session_id: String,
}

/// Writes the audit row and its per-zone rows in one transaction.
pub async fn save_audit(pool: &PgPool, audit: &ScoredAudit) -> anyhow::Result<SavedAudit> {
    let audit_id = Uuid::new_v4();
    let session_id = Uuid::new_v4().simple().to_string();
    let submission = &audit.submission;
    let opportunities = serde_json::json!({
        "top_zone": audit.top_zone().map(|zone| zone.zone.as_str()),
        "quick_wins": audit.quick_wins(),
        "waste_zones": audit.zones,
    });

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO waste_audit.audits
        (id, session_id, company_name, industry, team_size, responses,
         overall_score, total_hours_wasted, opportunities)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(audit_id)
    .bind(&session_id)
    .bind(&submission.company_name)
    .bind(submission.industry_label())
    .bind(submission.team_size.as_deref())
    .bind(Json(&submission.answers))
    .bind(i32::from(audit.overall_score))
    .bind(i32::try_from(audit.total_hours_wasted).context("total hours out of range")?)
    .bind(Json(&opportunities))
    .execute(&mut *tx)
    .await
    .context("failed to insert audit")?;

    for (rank, zone) in audit.zones.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO waste_audit.audit_results
            (id, audit_id, rank, waste_zone, waste_score, hours_wasted_monthly,
             automation_complexity, estimated_roi, recommendation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(audit_id)
        .bind(rank as i32 + 1)
        .bind(&zone.zone)
        .bind(i32::from(zone.score))
        .bind(i32::try_from(zone.hours_wasted).context("zone hours out of range")?)
        .bind(zone.complexity.as_str())
        .bind(i32::try_from(zone.roi).context("zone roi out of range")?)
        .bind(&zone.recommendation)
        .execute(&mut *tx)
        .await
        .context("failed to insert audit result")?;
    }

    tx.commit().await?;

    Ok(SavedAudit {
        audit_id,
        session_id,
    })
}

pub async fn fetch_market_summary(pool: &PgPool) -> anyhow::Result<MarketSummary> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_audits,
               COALESCE(AVG(overall_score)::DOUBLE PRECISION, 0) AS avg_score
        FROM waste_audit.audits
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(MarketSummary {
        total_audits: row.get("total_audits"),
        avg_overall_score: row.get("avg_score"),
    })
}

pub fn seed_submissions() -> Vec<Submission> {
    let answers = |items: [&str; 8]| -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    };

    vec![
        Submission {
            company_name: "Savanna Freight".to_string(),
            industry: Some("Logistics".to_string()),
            team_size: Some("11-50".to_string()),
            answers: answers([
                "Dispatchers always explain the same routing rules to every new driver",
                "We rebuild the same delivery metrics in a spreadsheet each week",
                "Drivers call the office to find delivery notes, it takes minutes each time",
                "Manual compile of manifests from multiple sources",
                "Someone must check and approve every fuel claim",
                "We are frustrated by paperwork, there must be a better way",
                "Copy and paste waybill numbers all day",
                "Only one person knows the customs process",
            ]),
        },
        Submission {
            company_name: "Mama Njeri Bakery".to_string(),
            industry: Some("Food & Beverage".to_string()),
            team_size: Some("1-10".to_string()),
            answers: answers([
                "I explain recipes daily",
                "Sales reports on Friday",
                "We look up supplier prices",
                "Orders come from WhatsApp and phone, we combine them by hand",
                "If stock is low then we reorder",
                "Stock counting is inefficient",
                "Repetitive order entry",
                "Ask the owner",
            ]),
        },
        Submission {
            company_name: "Nairobi Dental Group".to_string(),
            industry: Some("Healthcare".to_string()),
            team_size: Some("51-200".to_string()),
            answers: answers([
                "Front desk repeatedly answers the same insurance questions",
                "Monthly dashboard of appointments",
                "Patients wait while staff search records",
                "Billing data is manual across multiple systems",
                "Verify insurance before each visit",
                "Claims rework is a waste of time",
                "Copy patient details between forms, no thinking needed",
                "Only the office manager knows the claims portal",
            ]),
        },
    ]
}

/// Reads submissions from a CSV with columns
/// `company_name,industry,team_size,q1..q8`.
pub fn read_submissions_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<Submission>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        company_name: String,
        industry: Option<String>,
        team_size: Option<String>,
        q1: String,
        q2: String,
        q3: String,
        q4: String,
        q5: String,
        q6: String,
        q7: String,
        q8: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut submissions = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        submissions.push(Submission {
            company_name: row.company_name,
            industry: row.industry.filter(|value| !value.trim().is_empty()),
            team_size: row.team_size.filter(|value| !value.trim().is_empty()),
            answers: vec![
                row.q1, row.q2, row.q3, row.q4, row.q5, row.q6, row.q7, row.q8,
            ],
        });
    }

    Ok(submissions)
}

/// Postgres-backed pattern store. Atomicity comes from the unique
/// `(pattern_type, pattern_data)` constraint and the surrounding transaction.
#[derive(Debug, Clone)]
pub struct PgPatternStore {
    pool: PgPool,
}

impl PgPatternStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatternStore for PgPatternStore {
    async fn record_observations(
        &self,
        observations: &[PatternObservation],
    ) -> Result<i64, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        for observation in observations {
            let payload = serde_json::to_value(&observation.payload)?;
            sqlx::query(
                r#"
                INSERT INTO waste_audit.patterns AS p
                (pattern_type, pattern_data, frequency, avg_score, last_updated)
                VALUES ($1, $2, 1, $3, NOW())
                ON CONFLICT (pattern_type, pattern_data) DO UPDATE
                SET frequency = p.frequency + 1,
                    avg_score = p.avg_score
                        + (EXCLUDED.avg_score - p.avg_score) / (p.frequency + 1),
                    last_updated = NOW()
                "#,
            )
            .bind(observation.kind.as_str())
            .bind(Json(payload))
            .bind(observation.score)
            .execute(&mut *tx)
            .await?;
        }

        let total: i64 = sqlx::query(
            r#"
            INSERT INTO waste_audit.counters AS c (name, value)
            VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE
            SET value = c.value + 1
            RETURNING value
            "#,
        )
        .bind(SUBMISSION_COUNTER)
        .fetch_one(&mut *tx)
        .await?
        .get("value");

        tx.commit().await?;
        Ok(total)
    }

    async fn patterns(&self, kind: PatternKind) -> Result<Vec<PatternRecord>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT pattern_type, pattern_data, frequency, avg_score
            FROM waste_audit.patterns
            WHERE pattern_type = $1
            ORDER BY frequency DESC, avg_score DESC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let stored_type: String = row.get("pattern_type");
            let kind = stored_type
                .parse::<PatternKind>()
                .map_err(PersistenceError::UnknownPatternType)?;
            let Json(payload): Json<PatternPayload> = row.try_get("pattern_data")?;
            records.push(PatternRecord {
                kind,
                payload,
                frequency: row.get("frequency"),
                avg_score: row.get("avg_score"),
            });
        }

        Ok(records)
    }

    async fn append_insights(&self, insights: &[InsightRecord]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        for insight in insights {
            sqlx::query(
                r#"
                INSERT INTO waste_audit.insights
                (insight_type, insight_text, confidence, supporting_data, generated_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&insight.insight_type)
            .bind(&insight.text)
            .bind(insight.confidence)
            .bind(Json(&insight.supporting_data))
            .bind(insight.generated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn recent_insights(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InsightRecord>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT insight_type, insight_text, confidence, supporting_data, generated_at
            FROM waste_audit.insights
            WHERE $2::TIMESTAMPTZ IS NULL OR generated_at >= $2
            ORDER BY confidence DESC, generated_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut insights = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(supporting_data): Json<serde_json::Value> = row.try_get("supporting_data")?;
            insights.push(InsightRecord {
                insight_type: row.get("insight_type"),
                text: row.get("insight_text"),
                confidence: row.get("confidence"),
                supporting_data,
                generated_at: row.get("generated_at"),
            });
        }

        Ok(insights)
    }
}
