//! Deduplication pass: merge overlapping detections on the same physical
//! resource into one canonical finding.
//!
//! Strategy (final, pure transform — no cloud calls):
//! - group by `(resource_id, region)`;
//! - keep the finding with the highest estimated monthly cost, which is the
//!   scenario that priced the resource itself rather than a marginal
//!   optimization, so the aggregate neither double-counts nor under-reports;
//! - union the scenario ids, promote confidence to the group maximum, and
//!   preserve every sub-detection for explainability.

use crate::models::{DetectionRecord, Finding};
use std::collections::BTreeMap;

pub fn deduplicate(findings: Vec<Finding>) -> Vec<Finding> {
    let before = findings.len();
    let mut grouped: BTreeMap<(String, String), Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        grouped
            .entry((finding.resource_id.clone(), finding.region.clone()))
            .or_default()
            .push(finding);
    }

    let mut out = Vec::with_capacity(grouped.len());
    let mut duplicates_removed = 0usize;
    for ((resource_id, region), mut group) in grouped {
        if group.len() == 1 {
            out.push(group.pop().expect("non-empty group"));
            continue;
        }
        duplicates_removed += group.len() - 1;

        let scenarios: Vec<String> = group
            .iter()
            .map(|f| f.metadata.orphan_type.clone())
            .collect();
        let reasons: Vec<String> = group
            .iter()
            .map(|f| f.metadata.orphan_reason.clone())
            .filter(|r| !r.is_empty())
            .collect();
        let records: Vec<DetectionRecord> = group
            .iter()
            .map(|f| DetectionRecord {
                scenario: f.metadata.orphan_type.clone(),
                reason: f.metadata.orphan_reason.clone(),
                cost: f.estimated_monthly_cost,
                confidence: f.metadata.confidence,
            })
            .collect();
        let best_confidence = group
            .iter()
            .map(|f| f.metadata.confidence)
            .max()
            .expect("non-empty group");

        let primary_index = group
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.estimated_monthly_cost.total_cmp(&b.estimated_monthly_cost)
            })
            .map(|(i, _)| i)
            .expect("non-empty group");
        let mut primary = group.swap_remove(primary_index);

        tracing::info!(
            resource_id = %resource_id,
            region = %region,
            duplicate_count = records.len(),
            scenarios = ?scenarios,
            final_cost = primary.estimated_monthly_cost,
            "merged overlapping detections"
        );

        primary.metadata.duplicate_count = Some(records.len());
        primary.metadata.detection_scenarios = scenarios;
        primary.metadata.combined_reasons = reasons;
        primary.metadata.confidence = best_confidence;
        primary.metadata.all_detections = records;
        primary.metadata.is_deduplicated = true;
        out.push(primary);
    }

    // Deterministic output order regardless of scan scheduling.
    out.sort_by(|a, b| {
        (a.resource_type, &a.region, &a.resource_id)
            .cmp(&(b.resource_type, &b.region, &b.resource_id))
    });

    if duplicates_removed > 0 {
        tracing::info!(
            resources_before = before,
            resources_after = out.len(),
            duplicates_removed,
            "deduplication complete"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, CostKind, Resource, ResourceType};

    fn finding(id: &str, region: &str, orphan_type: &str, cost: f64, confidence: Confidence) -> Finding {
        let r = Resource::new(ResourceType::Volume, id, region);
        Finding::new(&r, orphan_type, cost, CostKind::Absolute, confidence, 45, format!("{orphan_type} reason"))
    }

    #[test]
    fn test_singleton_passes_through_unchanged() {
        let out = deduplicate(vec![finding("vol-1", "us-east-1", "unattached", 40.0, Confidence::High)]);
        assert_eq!(out.len(), 1);
        assert!(!out[0].metadata.is_deduplicated);
        assert!(out[0].metadata.detection_scenarios.is_empty());
    }

    #[test]
    fn test_merge_keeps_max_cost_and_unions_scenarios() {
        let out = deduplicate(vec![
            finding("vol-1", "us-east-1", "unattached", 40.0, Confidence::High),
            finding("vol-1", "us-east-1", "overprovisioned_iops", 5.0, Confidence::Medium),
        ]);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert_eq!(merged.estimated_monthly_cost, 40.0);
        assert_eq!(merged.metadata.orphan_type, "unattached");
        assert_eq!(merged.metadata.confidence, Confidence::High);
        assert!(merged.metadata.is_deduplicated);
        assert_eq!(merged.metadata.duplicate_count, Some(2));
        let mut scenarios = merged.metadata.detection_scenarios.clone();
        scenarios.sort();
        assert_eq!(scenarios, vec!["overprovisioned_iops", "unattached"]);
        assert_eq!(merged.metadata.all_detections.len(), 2);
    }

    #[test]
    fn test_confidence_promoted_to_group_max() {
        let out = deduplicate(vec![
            finding("vol-1", "us-east-1", "unattached", 40.0, Confidence::Medium),
            finding("vol-1", "us-east-1", "attached_idle", 2.0, Confidence::Critical),
        ]);
        // Highest cost wins the body, highest confidence wins the label.
        assert_eq!(out[0].metadata.orphan_type, "unattached");
        assert_eq!(out[0].metadata.confidence, Confidence::Critical);
    }

    #[test]
    fn test_same_id_in_different_regions_not_merged() {
        let out = deduplicate(vec![
            finding("vol-1", "us-east-1", "unattached", 40.0, Confidence::High),
            finding("vol-1", "eu-west-1", "unattached", 40.0, Confidence::High),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_output_sorted_and_no_duplicate_ids() {
        let out = deduplicate(vec![
            finding("vol-2", "us-east-1", "unattached", 4.0, Confidence::Low),
            finding("vol-1", "us-east-1", "unattached", 4.0, Confidence::Low),
            finding("vol-1", "us-east-1", "attached_idle", 1.0, Confidence::Low),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].resource_id, "vol-1");
        assert_eq!(out[1].resource_id, "vol-2");
    }
}
