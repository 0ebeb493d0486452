//! Scan-level value objects: the report returned to callers and the
//! partial-failure bookkeeping that comes with it.

use super::finding::Finding;
use super::resource::ResourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identity returned by credential validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub account_id: String,
    /// Principal identifier (ARN or analogue), when the provider exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

/// A resource-type enumeration or scenario that was skipped, with the cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedScenario {
    pub region: String,
    pub resource_type: ResourceType,
    /// Absent when the whole resource type was skipped (e.g. list denied).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphan_type: Option<String>,
    pub reason: String,
}

/// A region that could not be scanned, or was only partially scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionError {
    pub region: String,
    pub error: String,
    /// True when some findings from this region made it into the report.
    pub partial: bool,
}

/// Aggregated result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub account: AccountIdentity,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub scanned_regions: Vec<String>,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region_errors: Vec<RegionError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_scenarios: Vec<SkippedScenario>,
}

impl ScanReport {
    /// Sum of estimated monthly costs across all findings. Mixes absolute
    /// costs and projected savings; per-finding `cost_kind` disambiguates.
    pub fn total_monthly_waste(&self) -> f64 {
        self.findings.iter().map(|f| f.estimated_monthly_cost).sum()
    }

    pub fn findings_for(&self, resource_type: ResourceType) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.resource_type == resource_type)
    }
}
