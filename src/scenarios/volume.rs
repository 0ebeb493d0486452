//! Block-storage volume scenarios.
//!
//! Portfolio: unattached, attached to a stopped instance, attached but idle,
//! previous-generation SKU migration, unnecessary max-durability SKU,
//! over-provisioned IOPS/throughput, low IOPS/throughput utilization, and
//! SKU downgrade opportunities.

use super::support::{has_compliance_marker, passes_min_age, stopped_duration_days};
use super::{Scenario, ScenarioContext};
use crate::models::{
    AttachmentKind, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState,
    ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Unattached),
        Arc::new(AttachedStoppedInstance),
        Arc::new(AttachedIdle),
        Arc::new(SkuMigration),
        Arc::new(UnnecessaryMaxDurability),
        Arc::new(OverprovisionedIops),
        Arc::new(OverprovisionedThroughput),
        Arc::new(LowIopsUtilization),
        Arc::new(LowThroughputUtilization),
        Arc::new(TypeDowngrade),
    ]
}

fn sku(volume: &Resource) -> &str {
    volume.sku.as_deref().unwrap_or("gp2")
}

fn absolute_cost(ctx: &ScenarioContext<'_>, volume: &Resource) -> f64 {
    ctx.pricing.volume_monthly_cost(
        sku(volume),
        volume.size_gb.unwrap_or(0.0),
        volume.provisioned_iops,
        volume.provisioned_throughput_mbps,
    )
}

/// Observed I/O operations per second over the window; `None` = no signal.
async fn observed_ops_per_sec(
    ctx: &ScenarioContext<'_>,
    volume: &Resource,
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let read = ctx
        .metric(
            MetricQuery::new("AWS/EBS", "VolumeReadOps")
                .dimension("VolumeId", &volume.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let write = ctx
        .metric(
            MetricQuery::new("AWS/EBS", "VolumeWriteOps")
                .dimension("VolumeId", &volume.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if read.is_empty() && write.is_empty() {
        return Ok(None);
    }
    let seconds = (lookback_days * 86_400) as f64;
    Ok(Some((read.sum() + write.sum()) / seconds))
}

/// Observed throughput in MB/s over the window; `None` = no signal.
async fn observed_throughput_mbps(
    ctx: &ScenarioContext<'_>,
    volume: &Resource,
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let read = ctx
        .metric(
            MetricQuery::new("AWS/EBS", "VolumeReadBytes")
                .dimension("VolumeId", &volume.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let write = ctx
        .metric(
            MetricQuery::new("AWS/EBS", "VolumeWriteBytes")
                .dimension("VolumeId", &volume.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if read.is_empty() && write.is_empty() {
        return Ok(None);
    }
    let seconds = (lookback_days * 86_400) as f64;
    Ok(Some((read.sum() + write.sum()) / seconds / (1024.0 * 1024.0)))
}

struct Unattached;

#[async_trait]
impl Scenario for Unattached {
    fn orphan_type(&self) -> &'static str {
        "unattached"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unattached")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if volume.state != ResourceState::Available {
                continue;
            }
            if !passes_min_age(volume, ctx.now, min_age) {
                continue;
            }
            let age = ctx.age_days(volume);
            let cost = absolute_cost(ctx, volume);
            let size = volume.size_gb.unwrap_or(0.0);
            let reason = format!(
                "{:.0} GB {} volume not attached to anything for {} days (${:.2}/month)",
                size,
                sku(volume),
                age,
                cost
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("size_gb", size)
                .signal("sku", sku(volume)),
            );
        }
        Ok(findings)
    }
}

struct AttachedStoppedInstance;

#[async_trait]
impl Scenario for AttachedStoppedInstance {
    fn orphan_type(&self) -> &'static str {
        "attached_stopped_instance"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_attached_stopped_instance")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_stopped = ctx.rules.i64_or("min_stopped_days", 30);
        let instances = ctx.inventory(ResourceType::Instance).await?;
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if volume.state != ResourceState::InUse {
                continue;
            }
            let Some(instance_id) = volume.attachment(AttachmentKind::Instance) else {
                continue;
            };
            let Some(instance) = instances.iter().find(|i| i.id == instance_id) else {
                continue;
            };
            if instance.state != ResourceState::Stopped {
                continue;
            }
            let (stopped_days, source) = stopped_duration_days(instance, ctx.now);
            if stopped_days < min_stopped {
                continue;
            }
            let cost = absolute_cost(ctx, volume);
            let reason = format!(
                "{:.0} GB {} volume attached to instance {} which has been stopped for {} days (${:.2}/month billed regardless)",
                volume.size_gb.unwrap_or(0.0),
                sku(volume),
                instance_id,
                stopped_days,
                cost
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(stopped_days),
                    stopped_days,
                    reason,
                )
                .signal("instance_id", instance_id)
                .signal("stopped_days", stopped_days)
                .signal("stopped_since_source", source),
            );
        }
        Ok(findings)
    }
}

struct AttachedIdle;

#[async_trait]
impl Scenario for AttachedIdle {
    fn orphan_type(&self) -> &'static str {
        "attached_idle"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_attached_idle")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_idle_days_attached", 30);
        let lookback = ctx.rules.i64_or("idle_lookback_days", 60);
        let max_ops = ctx.rules.f64_or("max_ops_threshold", 0.1);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if volume.state != ResourceState::InUse {
                continue;
            }
            if !passes_min_age(volume, ctx.now, min_age) {
                continue;
            }
            // Requires signal: absent telemetry emits nothing.
            let Some(ops) = observed_ops_per_sec(ctx, volume, lookback).await? else {
                continue;
            };
            if ops >= max_ops {
                continue;
            }
            let age = ctx.age_days(volume);
            let cost = absolute_cost(ctx, volume);
            let reason = format!(
                "attached volume averaged {:.3} I/O ops/sec over the last {} days (threshold {:.1}) — effectively unused (${:.2}/month)",
                ops, lookback, max_ops, cost
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("observed_ops_per_sec", ops)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct SkuMigration;

#[async_trait]
impl Scenario for SkuMigration {
    fn orphan_type(&self) -> &'static str {
        "sku_migration"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_sku_migration")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_size = ctx.rules.f64_or("min_size_gb", 100.0);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if sku(volume) != "gp2" {
                continue;
            }
            let size = volume.size_gb.unwrap_or(0.0);
            if size < min_size {
                continue;
            }
            let current = ctx.pricing.volume_monthly_cost("gp2", size, None, None);
            let migrated = ctx.pricing.volume_monthly_cost("gp3", size, None, None);
            let savings = current - migrated;
            let age = ctx.age_days(volume);
            let reason = format!(
                "{size:.0} GB gp2 volume can migrate to gp3 at identical baseline performance: ${current:.2} -> ${migrated:.2}/month ({:.0}% saving)",
                savings / current * 100.0
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("current_monthly_cost", current)
                .signal("recommended_monthly_cost", migrated)
                .signal("recommended_sku", "gp3"),
            );
        }
        Ok(findings)
    }
}

struct UnnecessaryMaxDurability;

#[async_trait]
impl Scenario for UnnecessaryMaxDurability {
    fn orphan_type(&self) -> &'static str {
        "unnecessary_max_durability"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unnecessary_max_durability")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if sku(volume) != "io2" {
                continue;
            }
            if has_compliance_marker(volume, ctx.rules) {
                continue;
            }
            let size = volume.size_gb.unwrap_or(0.0);
            let current =
                ctx.pricing.volume_monthly_cost("io2", size, volume.provisioned_iops, None);
            let alternative =
                ctx.pricing.volume_monthly_cost("gp3", size, volume.provisioned_iops, None);
            let savings = current - alternative;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(volume);
            let reason = format!(
                "io2 volume carries no compliance tag justifying 99.999% durability; gp3 equivalent costs ${alternative:.2} vs ${current:.2}/month"
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("current_monthly_cost", current)
                .signal("recommended_monthly_cost", alternative),
            );
        }
        Ok(findings)
    }
}

struct OverprovisionedIops;

#[async_trait]
impl Scenario for OverprovisionedIops {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_iops"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_iops")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let factor = ctx.rules.f64_or("iops_overprovisioning_factor", 2.0);
        let buffer = ctx.rules.f64_or("safety_buffer_factor", 1.5);
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            let Some(provisioned) = volume.provisioned_iops else { continue };
            let kind = sku(volume).to_string();
            let free_iops = if kind == "gp3" { 3000.0 } else { 0.0 };
            if provisioned <= free_iops {
                continue;
            }
            let Some(observed) = observed_ops_per_sec(ctx, volume, lookback).await? else {
                continue;
            };
            if provisioned <= observed * factor {
                continue;
            }
            let recommended = (observed * buffer).max(free_iops).ceil();
            let current = ctx.pricing.volume_monthly_cost(
                &kind,
                volume.size_gb.unwrap_or(0.0),
                Some(provisioned),
                volume.provisioned_throughput_mbps,
            );
            let reduced = ctx.pricing.volume_monthly_cost(
                &kind,
                volume.size_gb.unwrap_or(0.0),
                Some(recommended),
                volume.provisioned_throughput_mbps,
            );
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(volume);
            let utilization = observed / provisioned * 100.0;
            let reason = format!(
                "{kind} volume with {utilization:.1}% IOPS utilization ({observed:.0} avg vs {provisioned:.0} provisioned) — reduce to {recommended:.0} IOPS for ${savings:.2}/month savings"
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("provisioned_iops", provisioned)
                .signal("observed_iops", observed)
                .signal("recommended_iops", recommended)
                .signal("utilization_percent", utilization),
            );
        }
        Ok(findings)
    }
}

struct OverprovisionedThroughput;

#[async_trait]
impl Scenario for OverprovisionedThroughput {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_throughput"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_throughput")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let baseline = ctx.rules.f64_or("baseline_throughput_mbps", 125.0);
        let factor = ctx.rules.f64_or("iops_overprovisioning_factor", 2.0);
        let buffer = ctx.rules.f64_or("safety_buffer_factor", 1.5);
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let workload_tags = ctx.rules.str_list("high_throughput_workload_tags");
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if sku(volume) != "gp3" {
                continue;
            }
            let Some(provisioned) = volume.provisioned_throughput_mbps else { continue };
            if provisioned <= baseline {
                continue;
            }
            // High-throughput workloads justify the headroom.
            if volume.tag_marker_present(&workload_tags) {
                continue;
            }
            let Some(observed) = observed_throughput_mbps(ctx, volume, lookback).await? else {
                continue;
            };
            if provisioned <= observed * factor {
                continue;
            }
            let recommended = (observed * buffer).max(baseline).ceil();
            let savings = (provisioned - recommended).max(0.0) * 0.04;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(volume);
            let reason = format!(
                "gp3 volume provisioned for {provisioned:.0} MB/s but moving {observed:.1} MB/s on average — reduce to {recommended:.0} MB/s for ${savings:.2}/month savings"
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("provisioned_throughput_mbps", provisioned)
                .signal("observed_throughput_mbps", observed)
                .signal("recommended_throughput_mbps", recommended),
            );
        }
        Ok(findings)
    }
}

struct LowIopsUtilization;

#[async_trait]
impl Scenario for LowIopsUtilization {
    fn orphan_type(&self) -> &'static str {
        "low_iops_utilization"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_iops_utilization")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let max_utilization = ctx.rules.f64_or("max_iops_utilization_percent", 30.0);
        let buffer = ctx.rules.f64_or("safety_buffer_factor", 1.5);
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            let Some(provisioned) = volume.provisioned_iops else { continue };
            if provisioned <= 0.0 {
                continue;
            }
            let kind = sku(volume).to_string();
            let free_iops = if kind == "gp3" { 3000.0 } else { 0.0 };
            if provisioned <= free_iops {
                continue;
            }
            let Some(observed) = observed_ops_per_sec(ctx, volume, lookback).await? else {
                continue;
            };
            let utilization = observed / provisioned * 100.0;
            if utilization >= max_utilization {
                continue;
            }
            let recommended = (observed * buffer).max(free_iops).ceil();
            let current = ctx.pricing.volume_monthly_cost(
                &kind,
                volume.size_gb.unwrap_or(0.0),
                Some(provisioned),
                None,
            );
            let reduced = ctx.pricing.volume_monthly_cost(
                &kind,
                volume.size_gb.unwrap_or(0.0),
                Some(recommended),
                None,
            );
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(volume);
            let reason = format!(
                "IOPS utilization is {utilization:.1}% over {lookback} days ({observed:.0} used of {provisioned:.0} provisioned); right-size to {recommended:.0} IOPS for ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("utilization_percent", utilization)
                .signal("observed_iops", observed)
                .signal("provisioned_iops", provisioned),
            );
        }
        Ok(findings)
    }
}

struct LowThroughputUtilization;

#[async_trait]
impl Scenario for LowThroughputUtilization {
    fn orphan_type(&self) -> &'static str {
        "low_throughput_utilization"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_throughput_utilization")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let max_utilization = ctx.rules.f64_or("max_throughput_utilization_percent", 30.0);
        let baseline = ctx.rules.f64_or("baseline_throughput_mbps", 125.0);
        let buffer = ctx.rules.f64_or("safety_buffer_factor", 1.5);
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            if sku(volume) != "gp3" {
                continue;
            }
            let Some(provisioned) = volume.provisioned_throughput_mbps else { continue };
            if provisioned <= baseline {
                continue;
            }
            let Some(observed) = observed_throughput_mbps(ctx, volume, lookback).await? else {
                continue;
            };
            let utilization = observed / provisioned * 100.0;
            if utilization >= max_utilization {
                continue;
            }
            let recommended = (observed * buffer).max(baseline).ceil();
            let savings = (provisioned - recommended).max(0.0) * 0.04;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(volume);
            let reason = format!(
                "throughput utilization is {utilization:.1}% ({observed:.1} of {provisioned:.0} MB/s); right-size to {recommended:.0} MB/s for ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("utilization_percent", utilization)
                .signal("observed_throughput_mbps", observed)
                .signal("provisioned_throughput_mbps", provisioned),
            );
        }
        Ok(findings)
    }
}

struct TypeDowngrade;

#[async_trait]
impl Scenario for TypeDowngrade {
    fn orphan_type(&self) -> &'static str {
        "type_downgrade"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Volume
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_type_downgrade")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_savings_percent = ctx.rules.f64_or("min_savings_percent", 20.0);
        let margin = ctx.rules.f64_or("safety_margin_iops", 1.5);
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let mut findings = Vec::new();
        for volume in ctx.resources {
            let kind = sku(volume).to_string();
            // gp3 is already the cheapest general-purpose tier.
            if !matches!(kind.as_str(), "gp2" | "io1" | "io2") {
                continue;
            }
            let Some(observed) = observed_ops_per_sec(ctx, volume, lookback).await? else {
                continue;
            };
            let required_iops = observed * margin;
            // gp3's free baseline must cover the observed load with margin.
            if required_iops > 3000.0 {
                continue;
            }
            let size = volume.size_gb.unwrap_or(0.0);
            let current =
                ctx.pricing.volume_monthly_cost(&kind, size, volume.provisioned_iops, None);
            let downgraded = ctx.pricing.volume_monthly_cost("gp3", size, None, None);
            let savings = current - downgraded;
            if savings <= 0.0 || savings / current * 100.0 < min_savings_percent {
                continue;
            }
            let age = ctx.age_days(volume);
            let reason = format!(
                "{kind} volume sustains only {observed:.0} IOPS (x{margin:.1} margin = {required_iops:.0}), well within gp3 baseline: ${current:.2} -> ${downgraded:.2}/month ({:.0}% saving)",
                savings / current * 100.0
            );
            findings.push(
                Finding::new(
                    volume,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("observed_iops", observed)
                .signal("recommended_sku", "gp3")
                .signal("current_monthly_cost", current)
                .signal("recommended_monthly_cost", downgraded),
            );
        }
        Ok(findings)
    }
}
