use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod catalog;
mod config;
mod db;
mod error;
mod insights;
mod models;
mod opportunity;
mod patterns;
mod recorder;
mod report;
mod scoring;
mod telemetry;

use crate::catalog::WasteZoneCatalog;
use crate::config::AppConfig;
use crate::db::PgPatternStore;
use crate::models::{PatternKind, ScoredAudit, Submission};
use crate::patterns::{MemoryPatternStore, PatternStore};
use crate::recorder::CipRecorder;
use crate::scoring::ScoringEngine;

#[derive(Parser)]
#[command(name = "waste-audit")]
#[command(about = "Intelligence waste audit scoring and market pattern learning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Score, store and learn from a few realistic sample audits
    Seed,
    /// Score one submission from a JSON file
    Score {
        #[arg(long)]
        file: PathBuf,
        /// Store the audit and feed it into pattern learning
        #[arg(long, default_value_t = false)]
        persist: bool,
        /// Write a markdown audit report to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score, store and learn from every submission in a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List recent market insights
    Insights {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only show insights generated in the last N days
        #[arg(long)]
        since_days: Option<i64>,
    },
    /// Rank learned patterns by estimated market value
    Opportunities {
        #[arg(long)]
        revenue_per_client: Option<f64>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown market intelligence report
    Report {
        #[arg(long, default_value = "intelligence-report.md")]
        out: PathBuf,
        /// Window for the recent insights section
        #[arg(long, default_value_t = 30)]
        since_days: i64,
    },
    /// Run a CSV of submissions through scoring and learning in memory
    Simulate {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&config.telemetry)?;

    let catalog = match config.catalog_path.as_deref() {
        Some(path) => WasteZoneCatalog::from_json_file(path)
            .with_context(|| format!("failed to load catalog from {}", path.display()))?,
        None => WasteZoneCatalog::default(),
    };
    let engine = ScoringEngine::new(catalog);

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let store = PgPatternStore::new(pool.clone());
            let submissions = db::seed_submissions();
            let count = submissions.len();
            for submission in submissions {
                persist_and_learn(&pool, &store, &config, &engine, &submission).await?;
            }
            println!("Seeded {count} audits.");
        }
        Commands::Score { file, persist, out } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let submission: Submission = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid submission", file.display()))?;

            let audit = if persist {
                let pool = connect(&config).await?;
                let store = PgPatternStore::new(pool.clone());
                persist_and_learn(&pool, &store, &config, &engine, &submission).await?
            } else {
                engine.score(&submission)?
            };

            print_audit(&audit);
            if let Some(out) = out {
                std::fs::write(&out, report::build_audit_report(&audit))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let store = PgPatternStore::new(pool.clone());
            let submissions = db::read_submissions_csv(&csv)?;
            let mut imported = 0usize;
            for submission in submissions {
                match persist_and_learn(&pool, &store, &config, &engine, &submission).await {
                    Ok(_) => imported += 1,
                    Err(err) => println!("Skipped {}: {err:#}", submission.company_name),
                }
            }
            println!("Imported {imported} audits from {}.", csv.display());
        }
        Commands::Insights { limit, since_days } => {
            let pool = connect(&config).await?;
            let store = PgPatternStore::new(pool);
            let insights = store
                .recent_insights(limit, since_days.map(insight_cutoff))
                .await?;
            if insights.is_empty() {
                println!("No insights generated yet.");
                return Ok(());
            }
            for insight in insights {
                println!(
                    "- [{}] {} (confidence {:.2}, {})",
                    insight.insight_type,
                    insight.text,
                    insight.confidence,
                    insight.generated_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Opportunities {
            revenue_per_client,
            limit,
        } => {
            let pool = connect(&config).await?;
            let store = PgPatternStore::new(pool);
            let revenue = revenue_per_client.unwrap_or(config.cip.revenue_per_client);
            let mut records = store.patterns(PatternKind::WasteZone).await?;
            records.extend(store.patterns(PatternKind::Industry).await?);
            records.extend(store.patterns(PatternKind::CoOccurrence).await?);
            let ranked = opportunity::rank(&records, revenue);

            if ranked.is_empty() {
                println!("No patterns recorded yet.");
                return Ok(());
            }
            println!("Top opportunities at KSh {revenue:.0} per client:");
            for item in ranked.iter().take(limit) {
                println!(
                    "- [{}] {}: {} audits, avg score {:.1}, value KSh {:.0}",
                    item.kind, item.label, item.frequency, item.avg_score, item.value
                );
            }
        }
        Commands::Report { out, since_days } => {
            let pool = connect(&config).await?;
            let store = PgPatternStore::new(pool.clone());
            let summary = db::fetch_market_summary(&pool).await?;
            let report =
                market_report(&store, &config, summary, Some(insight_cutoff(since_days))).await?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Simulate { csv } => {
            let store = MemoryPatternStore::new();
            let recorder = CipRecorder::new(&store, &config.cip);
            let submissions = db::read_submissions_csv(&csv)?;
            let mut scores = Vec::new();

            for submission in &submissions {
                let audit = match engine.score(submission) {
                    Ok(audit) => audit,
                    Err(err) => {
                        println!("Skipped {}: {err}", submission.company_name);
                        continue;
                    }
                };
                scores.push(f64::from(audit.overall_score));
                for insight in recorder.record(submission, &audit).await {
                    println!("Insight: {}", insight.text);
                }
            }

            let summary = models::MarketSummary {
                total_audits: store.submission_count()?,
                avg_overall_score: if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                },
            };
            print!("{}", market_report(&store, &config, summary, None).await?);
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Scores, stores the audit, then feeds pattern learning. Learning failures
/// are logged by the recorder and never fail the audit.
async fn persist_and_learn(
    pool: &PgPool,
    store: &PgPatternStore,
    config: &AppConfig,
    engine: &ScoringEngine,
    submission: &Submission,
) -> anyhow::Result<ScoredAudit> {
    let audit = engine.score(submission)?;
    let saved = db::save_audit(pool, &audit).await?;
    info!(
        audit_id = %saved.audit_id,
        company = %submission.company_name,
        score = audit.overall_score,
        "stored audit"
    );
    println!(
        "Stored audit {} for {} (session {}).",
        saved.audit_id, submission.company_name, saved.session_id
    );

    for insight in CipRecorder::new(store, &config.cip)
        .record(submission, &audit)
        .await
    {
        println!("Insight: {}", insight.text);
    }

    Ok(audit)
}

async fn market_report<S: PatternStore + ?Sized>(
    store: &S,
    config: &AppConfig,
    summary: models::MarketSummary,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<String> {
    let mut top_zones = store.patterns(PatternKind::WasteZone).await?;
    insights::sort_by_prevalence(&mut top_zones);

    let candidates: Vec<_> = top_zones
        .iter()
        .filter(|record| record.frequency >= config.cip.min_opportunity_frequency)
        .take(3)
        .cloned()
        .collect();
    let opportunities = opportunity::rank(&candidates, config.cip.revenue_per_client);
    let recent = store.recent_insights(5, since).await?;

    Ok(report::build_intelligence_report(
        &summary,
        &top_zones,
        &opportunities,
        &recent,
    ))
}

fn insight_cutoff(since_days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(since_days.max(1))
}

fn print_audit(audit: &ScoredAudit) {
    println!(
        "{}: waste score {}/100, {} hours wasted per month",
        audit.submission.company_name, audit.overall_score, audit.total_hours_wasted
    );
    for zone in &audit.zones {
        println!(
            "- {} score {} ({} h/month, {} complexity, {}% ROI)",
            zone.zone, zone.score, zone.hours_wasted, zone.complexity, zone.roi
        );
    }
}
