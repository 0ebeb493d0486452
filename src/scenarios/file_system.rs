//! Managed file system scenarios: inactive shares and over-provisioned
//! storage, throughput, or redundancy.

use super::support::{fmt_gb, is_nonprod};
use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Inactive),
        Arc::new(OverprovisionedStorage),
        Arc::new(OverprovisionedThroughput),
        Arc::new(MultiAzNonprod),
    ]
}

fn file_system_cost(ctx: &ScenarioContext<'_>, fs: &Resource) -> f64 {
    ctx.pricing.file_system_monthly_cost(
        fs.attr("file_system_type").unwrap_or("WINDOWS"),
        fs.attr("storage_type").unwrap_or("SSD"),
        fs.size_gb.unwrap_or(0.0),
        fs.provisioned_throughput_mbps,
        fs.attr("deployment_type").map(|d| d.contains("MULTI_AZ")).unwrap_or(false),
    )
}

async fn data_bytes_moved(
    ctx: &ScenarioContext<'_>,
    fs: &Resource,
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let reads = ctx
        .metric(
            MetricQuery::new("AWS/FSx", "DataReadBytes")
                .dimension("FileSystemId", &fs.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let writes = ctx
        .metric(
            MetricQuery::new("AWS/FSx", "DataWriteBytes")
                .dimension("FileSystemId", &fs.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if reads.is_empty() && writes.is_empty() {
        return Ok(None);
    }
    Ok(Some(reads.sum() + writes.sum()))
}

struct Inactive;

#[async_trait]
impl Scenario for Inactive {
    fn orphan_type(&self) -> &'static str {
        "file_system_inactive"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::FileSystem
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_inactive")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("inactive_lookback_days", 30);
        let min_age = ctx.rules.i64_or("min_age_days", 3);
        let mut findings = Vec::new();
        for fs in ctx.resources {
            if fs.state != ResourceState::Available {
                continue;
            }
            let age = ctx.age_days(fs);
            if age < min_age {
                continue;
            }
            let Some(moved) = data_bytes_moved(ctx, fs, lookback).await? else { continue };
            if moved > 0.0 {
                continue;
            }
            let cost = file_system_cost(ctx, fs);
            let reason = format!(
                "file system transferred zero bytes in {lookback} days; {} of {} storage idles at ${cost:.2}/month",
                fmt_gb(fs.size_gb.unwrap_or(0.0)),
                fs.attr("storage_type").unwrap_or("SSD")
            );
            findings.push(
                Finding::new(
                    fs,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct OverprovisionedStorage;

#[async_trait]
impl Scenario for OverprovisionedStorage {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_storage"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::FileSystem
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_storage")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.f64_or("storage_usage_threshold_percent", 10.0);
        let lookback = ctx.rules.i64_or("storage_lookback_days", 7);
        let mut findings = Vec::new();
        for fs in ctx.resources {
            let utilization = ctx
                .metric(
                    MetricQuery::new("AWS/FSx", "StorageCapacityUtilization")
                        .dimension("FileSystemId", &fs.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some(used_percent) = utilization.mean() else { continue };
            if used_percent >= threshold {
                continue;
            }
            let size = fs.size_gb.unwrap_or(0.0);
            let used_gb = size * used_percent / 100.0;
            // Leave 2x headroom over what is actually stored.
            let recommended_gb = (used_gb * 2.0).max(32.0);
            let current = file_system_cost(ctx, fs);
            let savings = (current * (1.0 - recommended_gb / size.max(1.0))).max(0.0);
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(fs);
            let reason = format!(
                "only {used_percent:.1}% of {} is in use; {} would hold the data with headroom, saving ${savings:.2}/month",
                fmt_gb(size),
                fmt_gb(recommended_gb)
            );
            findings.push(
                Finding::new(
                    fs,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("storage_used_percent", used_percent)
                .signal("recommended_gb", recommended_gb),
            );
        }
        Ok(findings)
    }
}

struct OverprovisionedThroughput;

#[async_trait]
impl Scenario for OverprovisionedThroughput {
    fn orphan_type(&self) -> &'static str {
        "file_system_overprovisioned_throughput"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::FileSystem
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_throughput")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.f64_or("throughput_utilization_threshold_percent", 10.0);
        let lookback = ctx.rules.i64_or("throughput_lookback_days", 7);
        let mut findings = Vec::new();
        for fs in ctx.resources {
            let Some(provisioned) = fs.provisioned_throughput_mbps else { continue };
            if provisioned <= 0.0 {
                continue;
            }
            let Some(moved) = data_bytes_moved(ctx, fs, lookback).await? else { continue };
            let observed_mbps = moved / (lookback * 86_400) as f64 / (1024.0 * 1024.0);
            let utilization = observed_mbps / provisioned * 100.0;
            if utilization >= threshold {
                continue;
            }
            let recommended = (observed_mbps * 2.0).max(8.0).ceil();
            let savings = (provisioned - recommended).max(0.0)
                * crate::pricing::tables::FILE_SYSTEM_THROUGHPUT_MBPS_MONTH;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(fs);
            let reason = format!(
                "throughput capacity of {provisioned:.0} MB/s sees {observed_mbps:.2} MB/s of traffic ({utilization:.1}%); {recommended:.0} MB/s saves ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    fs,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("provisioned_throughput_mbps", provisioned)
                .signal("observed_throughput_mbps", observed_mbps),
            );
        }
        Ok(findings)
    }
}

struct MultiAzNonprod;

#[async_trait]
impl Scenario for MultiAzNonprod {
    fn orphan_type(&self) -> &'static str {
        "multi_az_nonprod"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::FileSystem
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_multi_az_nonprod")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for fs in ctx.resources {
            let multi_az =
                fs.attr("deployment_type").map(|d| d.contains("MULTI_AZ")).unwrap_or(false);
            if !multi_az || !is_nonprod(fs, ctx.rules) {
                continue;
            }
            let current = file_system_cost(ctx, fs);
            // Dropping the standby replica halves the bill.
            let savings = current / 2.0;
            let age = ctx.age_days(fs);
            let reason = format!(
                "non-production file system runs multi-AZ ({}); a single-AZ deployment halves the ${current:.2}/month bill",
                fs.attr("deployment_type").unwrap_or("MULTI_AZ_1")
            );
            findings.push(
                Finding::new(
                    fs,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("deployment_type", fs.attr("deployment_type").unwrap_or("MULTI_AZ_1"))
                .signal("current_monthly_cost", current),
            );
        }
        Ok(findings)
    }
}
