//! End-to-end scan tests against the in-memory provider.

use super::common::{MockProvider, daily_sample, days_ago, resource, scalar_sample};
use crate::engine::{ScanConfig, ScanError, Scanner, dedup};
use crate::models::{
    Attachment, AttachmentKind, Confidence, CostKind, Finding, MetricStat, Resource,
    ResourceState, ResourceType,
};
use crate::pricing::PricingCatalog;
use crate::rules::{RuleOverrides, RuleRegistry};
use std::sync::Arc;

fn scanner(provider: MockProvider) -> Scanner {
    Scanner::new(
        Arc::new(provider),
        RuleRegistry::built_in(),
        PricingCatalog::new(),
        ScanConfig::default(),
    )
}

fn overrides(resource_type: &str, value: serde_json::Value) -> RuleOverrides {
    let mut map = RuleOverrides::new();
    let serde_json::Value::Object(obj) = value else { panic!("object expected") };
    map.insert(resource_type.to_string(), obj);
    map
}

fn gp3_volume_500gb() -> Resource {
    let mut volume =
        resource(ResourceType::Volume, "vol-e1", "us-east-1", ResourceState::Available, 45);
    volume.sku = Some("gp3".to_string());
    volume.size_gb = Some(500.0);
    volume
}

#[tokio::test]
async fn test_e1_unattached_volume() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    provider.add_resource(gp3_volume_500gb());

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.metadata.orphan_type, "unattached");
    assert_eq!(finding.metadata.confidence, Confidence::High);
    assert_eq!(finding.metadata.age_days, 45);
    assert!((finding.estimated_monthly_cost - 40.0).abs() < 1e-9);
    assert_eq!(finding.metadata.cost_kind, CostKind::Absolute);
    assert!(report.region_errors.is_empty());
}

#[tokio::test]
async fn test_e2_dedup_merges_volume_detections() {
    let volume = gp3_volume_500gb();
    let unattached = Finding::new(
        &volume,
        "unattached",
        40.0,
        CostKind::Absolute,
        Confidence::High,
        45,
        "unattached",
    );
    let overprovisioned = Finding::new(
        &volume,
        "overprovisioned_iops",
        5.0,
        CostKind::Savings,
        Confidence::Medium,
        45,
        "iops",
    );

    let merged = dedup::deduplicate(vec![unattached, overprovisioned]);

    assert_eq!(merged.len(), 1);
    let finding = &merged[0];
    assert!((finding.estimated_monthly_cost - 40.0).abs() < 1e-9);
    assert!(finding.metadata.is_deduplicated);
    assert_eq!(finding.metadata.duplicate_count, Some(2));
    let mut scenarios = finding.metadata.detection_scenarios.clone();
    scenarios.sort();
    assert_eq!(scenarios, vec!["overprovisioned_iops", "unattached"]);
}

#[tokio::test]
async fn test_e3_unassociated_public_ip() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    let mut address =
        resource(ResourceType::PublicIp, "eipalloc-e3", "us-east-1", ResourceState::Available, 10);
    address.attributes.insert("public_ip".to_string(), "203.0.113.10".to_string());
    provider.add_resource(address);

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.metadata.orphan_type, "unassociated");
    assert_eq!(finding.metadata.confidence, Confidence::High);
    assert!((finding.estimated_monthly_cost - 3.60).abs() < 1e-9);
}

#[tokio::test]
async fn test_e4_nat_gateway_no_routes_and_zero_traffic() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    let nat =
        resource(ResourceType::NatGateway, "nat-e4", "us-east-1", ResourceState::Available, 120);
    provider.add_resource(nat);
    provider.add_metric("BytesOutToDestination", "nat-e4", MetricStat::Sum, daily_sample(30, 0.0));

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert!(finding.metadata.is_deduplicated);
    assert!((finding.estimated_monthly_cost - 32.40).abs() < 1e-9);
    assert_eq!(finding.metadata.confidence, Confidence::Critical);
    let scenarios = &finding.metadata.detection_scenarios;
    assert!(scenarios.contains(&"no_routes".to_string()));
    assert!(scenarios.contains(&"zero_traffic".to_string()));
}

#[tokio::test]
async fn test_e5_idle_running_instance() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    let mut instance =
        resource(ResourceType::Instance, "i-e5", "us-east-1", ResourceState::Running, 45);
    instance.sku = Some("m5.large".to_string());
    instance.tags.insert("Name".to_string(), "batch-runner".to_string());
    provider.add_resource(instance);
    provider.add_metric("CPUUtilization", "i-e5", MetricStat::Average, scalar_sample(3.2));
    provider.add_metric("NetworkIn", "i-e5", MetricStat::Sum, scalar_sample(400_000.0));

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    assert_eq!(report.findings.len(), 1, "findings: {:?}", report.findings);
    let finding = &report.findings[0];
    assert_eq!(finding.metadata.orphan_type, "idle_running");
    assert_eq!(finding.metadata.confidence, Confidence::High);
    // On-demand monthly cost of the shape.
    assert!((finding.estimated_monthly_cost - 0.096 * 720.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_e6_old_unused_snapshot() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    let mut snapshot =
        resource(ResourceType::Snapshot, "snap-e6", "us-east-1", ResourceState::Available, 400);
    snapshot.size_gb = Some(50.0);
    snapshot.tags.insert("Name".to_string(), "db-backup".to_string());
    snapshot.attachments.push(Attachment {
        kind: AttachmentKind::SourceVolume,
        target_id: "vol-live".to_string(),
    });
    provider.add_resource(snapshot);
    let mut live_volume =
        resource(ResourceType::Volume, "vol-live", "us-east-1", ResourceState::InUse, 500);
    live_volume.sku = Some("gp3".to_string());
    live_volume.size_gb = Some(50.0);
    live_volume
        .attachments
        .push(Attachment { kind: AttachmentKind::Instance, target_id: "i-live".to_string() });
    provider.add_resource(live_volume);

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    let snapshot_findings: Vec<_> = report.findings_for(ResourceType::Snapshot).collect();
    assert_eq!(snapshot_findings.len(), 1);
    let finding = snapshot_findings[0];
    assert_eq!(finding.metadata.orphan_type, "old_unused");
    assert_eq!(finding.metadata.confidence, Confidence::High);
    assert!((finding.estimated_monthly_cost - 50.0 * 0.05).abs() < 1e-9);
}

#[tokio::test]
async fn test_e7_scan_is_deterministic() {
    fn seeded_provider() -> MockProvider {
        let mut provider = MockProvider::new(&["us-east-1", "eu-west-1"]);
        provider.add_resource(gp3_volume_500gb());
        let mut address = resource(
            ResourceType::PublicIp,
            "eipalloc-1",
            "eu-west-1",
            ResourceState::Available,
            30,
        );
        address.attributes.insert("public_ip".to_string(), "203.0.113.9".to_string());
        provider.add_resource(address);
        provider
    }

    let first = scanner(seeded_provider()).scan(&[], &RuleOverrides::new()).await.unwrap();
    let second = scanner(seeded_provider()).scan(&[], &RuleOverrides::new()).await.unwrap();

    let first_json = serde_json::to_value(&first.findings).unwrap();
    let second_json = serde_json::to_value(&second.findings).unwrap();
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn test_global_bucket_scanned_once_across_regions() {
    let mut provider = MockProvider::new(&["us-east-1", "eu-west-1", "ap-south-1"]);
    let mut bucket = Resource::new(ResourceType::Bucket, "stale-artifacts", "global");
    bucket.state = ResourceState::Available;
    bucket.created_at = Some(days_ago(200));
    bucket.attributes.insert("object_count".to_string(), "0".to_string());
    bucket.attributes.insert("sample_truncated".to_string(), "false".to_string());
    bucket.attributes.insert("has_lifecycle_policy".to_string(), "true".to_string());
    provider.add_resource(bucket);

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    let bucket_findings: Vec<_> = report.findings_for(ResourceType::Bucket).collect();
    assert_eq!(bucket_findings.len(), 1);
    assert_eq!(bucket_findings[0].region, "global");
    assert_eq!(bucket_findings[0].metadata.orphan_type, "bucket_empty");
}

#[tokio::test]
async fn test_disabled_resource_type_yields_no_findings() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    provider.add_resource(gp3_volume_500gb());

    let report = scanner(provider)
        .scan(&[], &overrides("volume", serde_json::json!({"enabled": false})))
        .await
        .unwrap();

    assert!(report.findings.is_empty());
    assert!(report.region_errors.is_empty());
}

#[tokio::test]
async fn test_empty_region_list_yields_empty_report() {
    let provider = MockProvider::new(&[]);
    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();
    assert!(report.findings.is_empty());
    assert!(report.region_errors.is_empty());
    assert!(report.scanned_regions.is_empty());
}

#[tokio::test]
async fn test_credential_failure_aborts_scan() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    provider.reject_credentials = true;

    let result = scanner(provider).scan(&[], &RuleOverrides::new()).await;
    assert!(matches!(result, Err(ScanError::Credentials(_))));
}

#[tokio::test]
async fn test_denied_enumeration_skips_type_but_continues() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    provider.add_resource(gp3_volume_500gb());
    provider.deny("us-east-1", ResourceType::Snapshot);

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    // The volume finding survives the snapshot denial.
    assert_eq!(report.findings.len(), 1);
    assert!(report
        .skipped_scenarios
        .iter()
        .any(|s| s.resource_type == ResourceType::Snapshot && s.orphan_type.is_none()));
    assert!(report.region_errors.is_empty());
}

#[tokio::test]
async fn test_caller_regions_used_verbatim() {
    let mut provider = MockProvider::new(&["us-east-1", "eu-west-1"]);
    provider.add_resource(gp3_volume_500gb());

    let report = scanner(provider)
        .scan(&["eu-west-1".to_string()], &RuleOverrides::new())
        .await
        .unwrap();

    assert_eq!(report.scanned_regions, vec!["eu-west-1"]);
    // The volume lives in us-east-1, which was not asked for.
    assert!(report.findings.is_empty());
}

#[tokio::test]
async fn test_universal_invariants_hold_across_mixed_scan() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    provider.add_resource(gp3_volume_500gb());
    let mut stopped =
        resource(ResourceType::Instance, "i-stop", "us-east-1", ResourceState::Stopped, 200);
    stopped.sku = Some("m5.xlarge".to_string());
    stopped.state_since = Some(days_ago(60));
    provider.add_resource(stopped);
    let nat =
        resource(ResourceType::NatGateway, "nat-x", "us-east-1", ResourceState::Available, 15);
    provider.add_resource(nat);
    provider.add_metric("BytesOutToDestination", "nat-x", MetricStat::Sum, daily_sample(30, 0.0));

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    assert!(!report.findings.is_empty());
    let mut seen = std::collections::HashSet::new();
    for finding in &report.findings {
        assert!(finding.estimated_monthly_cost >= 0.0);
        assert!(!finding.metadata.orphan_reason.is_empty());
        // resource_id appears at most once post-dedup
        assert!(seen.insert((finding.resource_id.clone(), finding.region.clone())));
    }
    assert!(report.findings.len() <= 10);
}

#[tokio::test]
async fn test_stopped_instance_uses_state_transition_time() {
    let mut provider = MockProvider::new(&["us-east-1"]);
    let mut stopped =
        resource(ResourceType::Instance, "i-stop", "us-east-1", ResourceState::Stopped, 400);
    stopped.sku = Some("m5.large".to_string());
    stopped.tags.insert("Name".to_string(), "old-worker".to_string());
    stopped.state_since = Some(days_ago(35));
    provider.add_resource(stopped);

    let report = scanner(provider).scan(&[], &RuleOverrides::new()).await.unwrap();

    let finding = report
        .findings
        .iter()
        .find(|f| f.metadata.orphan_type == "stopped")
        .expect("stopped finding");
    // 35 days stopped, not the 400-day launch age: high, not critical.
    assert_eq!(finding.metadata.age_days, 35);
    assert_eq!(finding.metadata.confidence, Confidence::High);
    assert_eq!(
        finding.metadata.signals.get("stopped_since_source").and_then(|v| v.as_str()),
        Some("state_transition")
    );
}
