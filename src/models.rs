use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One questionnaire submission, answers in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub company_name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub team_size: Option<String>,
    pub answers: Vec<String>,
}

impl Submission {
    /// Industry label, if present and not blank.
    pub fn industry_label(&self) -> Option<&str> {
        self.industry
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "Low",
            Complexity::Medium => "Medium",
            Complexity::High => "High",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteZoneResult {
    pub zone: String,
    pub score: u8,
    pub hours_wasted: u32,
    pub complexity: Complexity,
    pub roi: u32,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredAudit {
    pub submission: Submission,
    /// Sorted by ROI desc, then score desc, then catalog order.
    pub zones: Vec<WasteZoneResult>,
    pub overall_score: u8,
    pub total_hours_wasted: u32,
}

impl ScoredAudit {
    pub fn top_zone(&self) -> Option<&WasteZoneResult> {
        self.zones.first()
    }

    pub fn quick_wins(&self) -> Vec<&WasteZoneResult> {
        self.zones
            .iter()
            .filter(|zone| zone.complexity == Complexity::Low)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "waste_zone")]
    WasteZone,
    #[serde(rename = "industry")]
    Industry,
    #[serde(rename = "co-occurrence")]
    CoOccurrence,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::WasteZone => "waste_zone",
            PatternKind::Industry => "industry",
            PatternKind::CoOccurrence => "co-occurrence",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "waste_zone" => Ok(PatternKind::WasteZone),
            "industry" => Ok(PatternKind::Industry),
            "co-occurrence" => Ok(PatternKind::CoOccurrence),
            other => Err(other.to_string()),
        }
    }
}

/// Structured key of a pattern record. Serialized as a flat JSON object,
/// e.g. `{"zone": "Data Integration Gap"}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternPayload {
    ZonePair { zone_a: String, zone_b: String },
    Zone { zone: String },
    Industry { industry: String },
}

impl PatternPayload {
    /// Pair key with the zone names in sorted order.
    pub fn zone_pair(first: &str, second: &str) -> Self {
        let (zone_a, zone_b) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        PatternPayload::ZonePair {
            zone_a: zone_a.to_string(),
            zone_b: zone_b.to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            PatternPayload::ZonePair { zone_a, zone_b } => format!("{zone_a} + {zone_b}"),
            PatternPayload::Zone { zone } => zone.clone(),
            PatternPayload::Industry { industry } => industry.clone(),
        }
    }
}

/// A single candidate observation fed into the pattern store.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternObservation {
    pub kind: PatternKind,
    pub payload: PatternPayload,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub kind: PatternKind,
    pub payload: PatternPayload,
    pub frequency: i64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub insight_type: String,
    pub text: String,
    pub confidence: f64,
    pub supporting_data: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub kind: PatternKind,
    pub label: String,
    pub frequency: i64,
    pub avg_score: f64,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub total_audits: i64,
    pub avg_overall_score: f64,
}
