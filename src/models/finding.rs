//! Finding value objects emitted by detection scenarios.

use super::resource::{Resource, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Graded suspicion level. Ordering matters: dedup promotes to the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Confidence {
    /// Scenario-signal upgrades never downgrade below what age implies.
    pub fn at_least(self, floor: Confidence) -> Confidence {
        self.max(floor)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
            Confidence::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Whether `estimated_monthly_cost` is the resource's absolute run rate or a
/// projected saving from an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    #[default]
    Absolute,
    Savings,
}

/// One sub-detection preserved through deduplication for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub scenario: String,
    pub reason: String,
    pub cost: f64,
    pub confidence: Confidence,
}

/// Evidence and classification attached to a finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingMetadata {
    /// Scenario identifier, from the closed orphan-type vocabulary.
    pub orphan_type: String,
    /// Human-readable explanation built from the measured values.
    pub orphan_reason: String,
    pub confidence: Confidence,
    pub age_days: i64,
    pub cost_kind: CostKind,
    /// Raw signals that drove the decision (measured values, thresholds).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub signals: serde_json::Map<String, serde_json::Value>,
    /// Set by the deduplicator: all scenarios that flagged this resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detection_scenarios: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub combined_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deduplicated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_detections: Vec<DetectionRecord>,
}

/// A single (resource, scenario) verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub resource_type: ResourceType,
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub region: String,
    pub estimated_monthly_cost: f64,
    pub metadata: FindingMetadata,
}

impl Finding {
    pub fn new(
        resource: &Resource,
        orphan_type: &str,
        cost: f64,
        cost_kind: CostKind,
        confidence: Confidence,
        age_days: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource.resource_type,
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            region: resource.region.clone(),
            // Cost estimates are never negative, whatever the calculator did.
            estimated_monthly_cost: cost.max(0.0),
            metadata: FindingMetadata {
                orphan_type: orphan_type.to_string(),
                orphan_reason: reason.into(),
                confidence,
                age_days,
                cost_kind,
                signals: serde_json::Map::new(),
                detection_scenarios: Vec::new(),
                combined_reasons: Vec::new(),
                is_deduplicated: false,
                duplicate_count: None,
                all_detections: Vec::new(),
            },
        }
    }

    /// Attach a raw signal value to the finding's evidence map.
    pub fn signal(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.signals.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resource::ResourceType;

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Critical > Confidence::High);
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::Low.at_least(Confidence::High), Confidence::High);
        assert_eq!(Confidence::Critical.at_least(Confidence::Low), Confidence::Critical);
    }

    #[test]
    fn test_negative_cost_is_clamped() {
        let r = Resource::new(ResourceType::Volume, "vol-1", "us-east-1");
        let f = Finding::new(&r, "type_downgrade", -3.5, CostKind::Savings, Confidence::Low, 0, "x");
        assert_eq!(f.estimated_monthly_cost, 0.0);
    }

    #[test]
    fn test_dedup_fields_skipped_in_serialization() {
        let r = Resource::new(ResourceType::Volume, "vol-1", "us-east-1");
        let f = Finding::new(&r, "unattached", 4.0, CostKind::Absolute, Confidence::Low, 3, "x");
        let json = serde_json::to_value(&f).unwrap();
        assert!(json["metadata"].get("is_deduplicated").is_none());
        assert!(json["metadata"].get("detection_scenarios").is_none());
    }
}
