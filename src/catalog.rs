use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::Complexity;

/// Hours in a 31-day month.
pub const MAX_MONTHLY_HOURS: u32 = 744;
pub const MAX_ROI: u32 = i32::MAX as u32;

/// One questionnaire question and the waste zone it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub zone: String,
    pub keywords: Vec<String>,
    pub max_monthly_hours: u32,
    pub roi: u32,
    pub complexity: Complexity,
    pub recommendation: String,
}

/// Immutable mapping from question index to waste zone. Entry order is
/// question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteZoneCatalog {
    zones: Vec<ZoneSpec>,
}

impl WasteZoneCatalog {
    pub fn new(zones: Vec<ZoneSpec>) -> Result<Self, CatalogError> {
        if zones.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(zones.len());

        for mut spec in zones {
            if spec.zone.trim().is_empty() {
                return Err(CatalogError::InvalidZone {
                    zone: spec.zone,
                    reason: "zone name is blank".to_string(),
                });
            }
            if spec.roi == 0 {
                return Err(CatalogError::InvalidZone {
                    zone: spec.zone,
                    reason: "roi must be positive".to_string(),
                });
            }
            if spec.roi > MAX_ROI {
                return Err(CatalogError::InvalidZone {
                    zone: spec.zone,
                    reason: format!("roi must be at most {MAX_ROI}"),
                });
            }
            if spec.max_monthly_hours == 0 || spec.max_monthly_hours > MAX_MONTHLY_HOURS {
                return Err(CatalogError::InvalidZone {
                    zone: spec.zone,
                    reason: format!("max_monthly_hours must be between 1 and {MAX_MONTHLY_HOURS}"),
                });
            }
            if !seen.insert(spec.zone.clone()) {
                return Err(CatalogError::DuplicateZone(spec.zone));
            }

            // Keywords match case-insensitively and count once each.
            let mut keywords: Vec<String> = Vec::with_capacity(spec.keywords.len());
            for keyword in spec.keywords.iter().map(|k| k.trim().to_lowercase()) {
                if !keyword.is_empty() && !keywords.contains(&keyword) {
                    keywords.push(keyword);
                }
            }
            spec.keywords = keywords;
            normalized.push(spec);
        }

        Ok(Self { zones: normalized })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: WasteZoneCatalog = serde_json::from_str(&raw)?;
        Self::new(catalog.zones)
    }

    pub fn zones(&self) -> &[ZoneSpec] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn recommendation(&self, spec: &ZoneSpec, tier: Complexity) -> String {
        format!("{} {}", tier_lead_in(tier), spec.recommendation)
    }
}

impl Default for WasteZoneCatalog {
    fn default() -> Self {
        let zone = |zone: &str,
                    keywords: &[&str],
                    max_monthly_hours: u32,
                    roi: u32,
                    complexity: Complexity,
                    recommendation: &str| ZoneSpec {
            zone: zone.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            max_monthly_hours,
            roi,
            complexity,
            recommendation: recommendation.to_string(),
        };

        Self {
            zones: vec![
                zone(
                    "Knowledge Bottleneck",
                    &["every", "always", "repeatedly", "constantly", "daily"],
                    20,
                    250,
                    Complexity::Low,
                    "Build internal knowledge base with AI search. Eliminate repeat explanations.",
                ),
                zone(
                    "Repetitive Analysis",
                    &["same", "metrics", "reports", "dashboard", "spreadsheet"],
                    30,
                    180,
                    Complexity::Medium,
                    "Automate recurring analysis with AI dashboard. Decision-ready insights instantly.",
                ),
                zone(
                    "Information Access Gap",
                    &["look up", "search", "find", "minutes", "time"],
                    15,
                    300,
                    Complexity::Low,
                    "Build AI customer support layer. Instant answers from company knowledge.",
                ),
                zone(
                    "Data Integration Gap",
                    &["manual", "combine", "multiple", "sources", "compile"],
                    40,
                    200,
                    Complexity::Medium,
                    "Connect data sources with automated pipeline. Real-time unified reports.",
                ),
                zone(
                    "Rule-Based Decisions",
                    &["if", "then", "check", "verify", "approve"],
                    25,
                    220,
                    Complexity::Low,
                    "Automate if/then logic with AI monitoring. Human only for exceptions.",
                ),
                zone(
                    "Acknowledged Pain Points",
                    &["better way", "frustrated", "waste", "inefficient"],
                    35,
                    150,
                    Complexity::Medium,
                    "High-priority fix. Team already knows this needs solving.",
                ),
                zone(
                    "Mechanical Tasks",
                    &["repetitive", "copy", "paste", "same thing", "no thinking"],
                    45,
                    280,
                    Complexity::Low,
                    "Pure automation opportunity. No creativity required, high ROI.",
                ),
                zone(
                    "Knowledge Silos",
                    &["only", "person", "knows", "head", "ask"],
                    20,
                    190,
                    Complexity::Medium,
                    "Capture tribal knowledge in AI system. Team-wide access, not person-dependent.",
                ),
            ],
        }
    }
}

fn tier_lead_in(tier: Complexity) -> &'static str {
    match tier {
        Complexity::Low => "Quick win:",
        Complexity::Medium => "Planned project:",
        Complexity::High => "Strategic initiative:",
    }
}
