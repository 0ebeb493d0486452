//! Snapshot scenarios: orphaned, redundant, stale, broken, and duplicate
//! snapshots, plus snapshots kept alive by machine images nobody launches.

use super::support::{has_compliance_marker, is_nonprod, passes_min_age};
use super::{Scenario, ScenarioContext};
use crate::models::{
    AttachmentKind, Confidence, CostKind, Finding, Resource, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

static INSTANCE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"i-[0-9a-f]{8,17}").unwrap());

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(SourceDeleted),
        Arc::new(Redundant),
        Arc::new(OldUnused),
        Arc::new(DeletedInstanceReference),
        Arc::new(IncompleteFailed),
        Arc::new(Untagged),
        Arc::new(ExcessiveRetentionNonprod),
        Arc::new(Duplicate),
        Arc::new(UnusedImage),
    ]
}

fn snapshot_cost(ctx: &ScenarioContext<'_>, snapshot: &Resource) -> f64 {
    ctx.pricing.snapshot_monthly_cost(snapshot.size_gb.unwrap_or(0.0))
}

struct SourceDeleted;

#[async_trait]
impl Scenario for SourceDeleted {
    fn orphan_type(&self) -> &'static str {
        "source_deleted"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_source_deleted")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 90);
        let volumes = ctx.inventory(ResourceType::Volume).await?;
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            let Some(volume_id) = snapshot.attachment(AttachmentKind::SourceVolume) else {
                continue;
            };
            if !passes_min_age(snapshot, ctx.now, min_age) {
                continue;
            }
            let source = volumes.iter().find(|v| v.id == volume_id);
            let age = ctx.age_days(snapshot);
            let cost = snapshot_cost(ctx, snapshot);
            let (reason, orphan_kind) = match source {
                None => (
                    format!(
                        "snapshot of volume {} which no longer exists; {} days old, {:.0} GB (${:.2}/month)",
                        volume_id,
                        age,
                        snapshot.size_gb.unwrap_or(0.0),
                        cost
                    ),
                    "deleted",
                ),
                Some(volume) if volume.state == ResourceState::Available => (
                    format!(
                        "snapshot of volume {} which is itself unattached and going to waste; {} days old (${:.2}/month)",
                        volume_id, age, cost
                    ),
                    "orphaned",
                ),
                Some(_) => continue,
            };
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("source_volume_id", volume_id)
                .signal("source_state", orphan_kind),
            );
        }
        Ok(findings)
    }
}

struct Redundant;

#[async_trait]
impl Scenario for Redundant {
    fn orphan_type(&self) -> &'static str {
        "redundant"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_redundant")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let keep = ctx.rules.usize_or("max_snapshots_per_source", 7);
        let mut per_source: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
        for snapshot in ctx.resources {
            if let Some(volume_id) = snapshot.attachment(AttachmentKind::SourceVolume) {
                per_source.entry(volume_id).or_default().push(snapshot);
            }
        }

        let mut findings = Vec::new();
        for (volume_id, mut snapshots) in per_source {
            if snapshots.len() <= keep {
                continue;
            }
            // Newest first; everything past the retention allowance is surplus.
            snapshots.sort_by_key(|s| std::cmp::Reverse(s.created_at));
            for snapshot in snapshots.iter().skip(keep) {
                let age = ctx.age_days(snapshot);
                let cost = snapshot_cost(ctx, snapshot);
                let reason = format!(
                    "volume {} has {} snapshots; retention keeps the newest {}, this one is {} days old and surplus (${:.2}/month)",
                    volume_id,
                    snapshots.len(),
                    keep,
                    age,
                    cost
                );
                findings.push(
                    Finding::new(
                        snapshot,
                        self.orphan_type(),
                        cost,
                        CostKind::Absolute,
                        ctx.confidence_for_age(age),
                        age,
                        reason,
                    )
                    .signal("source_volume_id", volume_id)
                    .signal("snapshots_for_source", snapshots.len()),
                );
            }
        }
        Ok(findings)
    }
}

struct OldUnused;

#[async_trait]
impl Scenario for OldUnused {
    fn orphan_type(&self) -> &'static str {
        "old_unused"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_old_unused")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.i64_or("old_unused_age_days", 365);
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            let age = ctx.age_days(snapshot);
            if age < threshold {
                continue;
            }
            if has_compliance_marker(snapshot, ctx.rules) {
                continue;
            }
            let cost = snapshot_cost(ctx, snapshot);
            let reason = format!(
                "snapshot is {} days old with no retention or compliance tag; {:.0} GB accruing ${:.2}/month",
                age,
                snapshot.size_gb.unwrap_or(0.0),
                cost
            );
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("age_threshold_days", threshold),
            );
        }
        Ok(findings)
    }
}

struct DeletedInstanceReference;

#[async_trait]
impl Scenario for DeletedInstanceReference {
    fn orphan_type(&self) -> &'static str {
        "deleted_instance_reference"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_deleted_instance_reference")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 90);
        let instances = ctx.inventory(ResourceType::Instance).await?;
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            if !passes_min_age(snapshot, ctx.now, min_age) {
                continue;
            }
            let Some(description) = snapshot.attr("description") else { continue };
            let Some(reference) = INSTANCE_ID_RE.find(description) else { continue };
            let instance_id = reference.as_str();
            if instances.iter().any(|i| i.id == instance_id) {
                continue;
            }
            let age = ctx.age_days(snapshot);
            let cost = snapshot_cost(ctx, snapshot);
            let reason = format!(
                "snapshot description references instance {instance_id} which no longer exists; the backup serves nothing (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("referenced_instance_id", instance_id),
            );
        }
        Ok(findings)
    }
}

struct IncompleteFailed;

#[async_trait]
impl Scenario for IncompleteFailed {
    fn orphan_type(&self) -> &'static str {
        "incomplete_failed"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_incomplete_failed")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let max_pending = ctx.rules.i64_or("max_pending_days", 7);
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            let age = ctx.age_days(snapshot);
            let status = match snapshot.state {
                ResourceState::Error => "error",
                ResourceState::Pending if age > max_pending => "pending",
                _ => continue,
            };
            let cost = snapshot_cost(ctx, snapshot);
            let reason = match status {
                "error" => format!(
                    "snapshot is in error state and will never be restorable; storage still bills (${cost:.2}/month)"
                ),
                _ => format!(
                    "snapshot stuck in pending for {age} days (limit {max_pending}); the copy likely failed (${cost:.2}/month)"
                ),
            };
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    // A broken snapshot is waste regardless of age.
                    ctx.confidence_for_age(age).at_least(Confidence::High),
                    age,
                    reason,
                )
                .signal("status", status),
            );
        }
        Ok(findings)
    }
}

struct Untagged;

#[async_trait]
impl Scenario for Untagged {
    fn orphan_type(&self) -> &'static str {
        "untagged"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_untagged")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_untagged_age_days", 30);
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            if !snapshot.tags.is_empty() {
                continue;
            }
            let age = ctx.age_days(snapshot);
            if age < min_age {
                continue;
            }
            let cost = snapshot_cost(ctx, snapshot);
            let reason = format!(
                "snapshot carries no tags after {age} days; nobody can say what it belongs to (${cost:.2}/month)"
            );
            findings.push(Finding::new(
                snapshot,
                self.orphan_type(),
                cost,
                CostKind::Absolute,
                ctx.confidence_for_age(age),
                age,
                reason,
            ));
        }
        Ok(findings)
    }
}

struct ExcessiveRetentionNonprod;

#[async_trait]
impl Scenario for ExcessiveRetentionNonprod {
    fn orphan_type(&self) -> &'static str {
        "excessive_retention_nonprod"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_excessive_retention_nonprod")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let limit = ctx.rules.i64_or("nonprod_max_days", 90);
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            if !is_nonprod(snapshot, ctx.rules) {
                continue;
            }
            let age = ctx.age_days(snapshot);
            if age <= limit {
                continue;
            }
            let cost = snapshot_cost(ctx, snapshot);
            let environment = ctx
                .rules
                .str_list("nonprod_env_tags")
                .iter()
                .find_map(|k| snapshot.tag(k).map(str::to_string))
                .unwrap_or_else(|| "non-production".to_string());
            let reason = format!(
                "{environment} snapshot retained {age} days, past the {limit}-day non-production limit (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("environment", environment)
                .signal("nonprod_limit_days", limit),
            );
        }
        Ok(findings)
    }
}

struct Duplicate;

#[async_trait]
impl Scenario for Duplicate {
    fn orphan_type(&self) -> &'static str {
        "duplicate"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_duplicates")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let window_hours = ctx.rules.i64_or("duplicate_window_hours", 1);
        let mut per_source: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
        for snapshot in ctx.resources {
            if let Some(volume_id) = snapshot.attachment(AttachmentKind::SourceVolume) {
                per_source.entry(volume_id).or_default().push(snapshot);
            }
        }

        let mut findings = Vec::new();
        for (volume_id, mut snapshots) in per_source {
            snapshots.sort_by_key(|s| s.created_at);
            for pair in snapshots.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                let (Some(t0), Some(t1)) = (earlier.created_at, later.created_at) else {
                    continue;
                };
                if (t1 - t0) > chrono::Duration::hours(window_hours) {
                    continue;
                }
                if earlier.size_gb != later.size_gb {
                    continue;
                }
                let age = ctx.age_days(later);
                let cost = snapshot_cost(ctx, later);
                let minutes = (t1 - t0).num_minutes();
                let reason = format!(
                    "snapshot taken {minutes} minutes after {} of the same {:.0} GB volume {volume_id}; one of the pair is redundant (${cost:.2}/month)",
                    earlier.id,
                    later.size_gb.unwrap_or(0.0)
                );
                findings.push(
                    Finding::new(
                        later,
                        self.orphan_type(),
                        cost,
                        CostKind::Absolute,
                        ctx.confidence_for_age(age),
                        age,
                        reason,
                    )
                    .signal("earlier_snapshot_id", earlier.id.clone())
                    .signal("minutes_apart", minutes),
                );
            }
        }
        Ok(findings)
    }
}

struct UnusedImage;

#[async_trait]
impl Scenario for UnusedImage {
    fn orphan_type(&self) -> &'static str {
        "unused_image"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Snapshot
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unused_image")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_unused = ctx.rules.i64_or("min_image_unused_days", 180);
        let instances = ctx.inventory(ResourceType::Instance).await?;
        let mut findings = Vec::new();
        for snapshot in ctx.resources {
            let Some(image_id) = snapshot.attr("image_id") else { continue };
            if instances
                .iter()
                .any(|i| i.attr("image_id") == Some(image_id))
            {
                continue;
            }
            let image_age = snapshot
                .attr("image_creation_date")
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|t| (ctx.now - t.with_timezone(&chrono::Utc)).num_days())
                .unwrap_or_else(|| ctx.age_days(snapshot));
            if image_age < min_unused {
                continue;
            }
            let age = ctx.age_days(snapshot);
            let cost = snapshot_cost(ctx, snapshot);
            let reason = format!(
                "snapshot backs machine image {image_id}, which no running workload was launched from in {image_age} days (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    snapshot,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("image_id", image_id)
                .signal("image_unused_days", image_age),
            );
        }
        Ok(findings)
    }
}
