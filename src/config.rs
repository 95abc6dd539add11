use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Top-level configuration, read once from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub cip: CipConfig,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for pattern learning and insight generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CipConfig {
    pub insight_threshold: i64,
    pub top_k: usize,
    pub confidence_scaling: f64,
    pub revenue_per_client: f64,
    pub min_opportunity_frequency: i64,
}

impl Default for CipConfig {
    fn default() -> Self {
        Self {
            insight_threshold: 10,
            top_k: 3,
            confidence_scaling: 2.0,
            revenue_per_client: 5000.0,
            min_opportunity_frequency: 5,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{name} must be {requirement}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
    },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = CipConfig::default();
        let cip = CipConfig {
            insight_threshold: parse_var(
                "CIP_INSIGHT_THRESHOLD",
                "integer",
                defaults.insight_threshold,
            )?,
            top_k: parse_var("CIP_TOP_K", "integer", defaults.top_k)?,
            confidence_scaling: parse_var(
                "CIP_CONFIDENCE_SCALING",
                "number",
                defaults.confidence_scaling,
            )?,
            revenue_per_client: parse_var(
                "CIP_REVENUE_PER_CLIENT",
                "number",
                defaults.revenue_per_client,
            )?,
            min_opportunity_frequency: parse_var(
                "CIP_MIN_OPPORTUNITY_FREQUENCY",
                "integer",
                defaults.min_opportunity_frequency,
            )?,
        };
        cip.validate()?;

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                max_connections: parse_var("DB_MAX_CONNECTIONS", "integer", 5)?,
            },
            telemetry: TelemetryConfig {
                log_level: env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            cip,
            catalog_path: env::var("WASTE_CATALOG_PATH").ok().map(PathBuf::from),
        })
    }
}

impl CipConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.insight_threshold < 1 {
            return Err(ConfigError::OutOfRange {
                name: "CIP_INSIGHT_THRESHOLD",
                requirement: "at least 1",
            });
        }
        if self.top_k < 1 {
            return Err(ConfigError::OutOfRange {
                name: "CIP_TOP_K",
                requirement: "at least 1",
            });
        }
        if !(self.confidence_scaling > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "CIP_CONFIDENCE_SCALING",
                requirement: "greater than 0",
            });
        }
        if !(self.revenue_per_client >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "CIP_REVENUE_PER_CLIENT",
                requirement: "non-negative",
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
