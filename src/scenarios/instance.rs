//! Compute instance scenarios: stopped, idle, over-provisioned, obsolete,
//! untagged, schedulable, and spot-eligible workloads.

use super::support::{is_nonprod, stopped_duration_days};
use super::{Scenario, ScenarioContext};
use crate::models::{
    AttachmentKind, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState,
    ResourceType, TelemetrySample,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use chrono::Timelike;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Stopped),
        Arc::new(Oversized),
        Arc::new(OldGeneration),
        Arc::new(BurstableCreditWaste),
        Arc::new(DevTest24x7),
        Arc::new(Untagged),
        Arc::new(IdleRunning),
        Arc::new(RightSizing),
        Arc::new(SpotEligible),
        Arc::new(ScheduledUnused),
    ]
}

const SIZE_LADDER: [&str; 12] = [
    "nano", "micro", "small", "medium", "large", "xlarge", "2xlarge", "4xlarge", "8xlarge",
    "12xlarge", "16xlarge", "24xlarge",
];

fn shape(instance: &Resource) -> &str {
    instance.sku.as_deref().unwrap_or("m5.large")
}

fn split_shape(shape: &str) -> Option<(&str, &str)> {
    shape.split_once('.')
}

/// One size down the ladder, e.g. "m5.xlarge" -> "m5.large".
fn downsized(shape: &str) -> Option<String> {
    let (family, size) = split_shape(shape)?;
    let index = SIZE_LADDER.iter().position(|s| *s == size)?;
    if index == 0 {
        return None;
    }
    Some(format!("{family}.{}", SIZE_LADDER[index - 1]))
}

/// Rank of the size within the ladder, for "xlarge and above" gates.
fn size_rank(shape: &str) -> Option<usize> {
    let (_, size) = split_shape(shape)?;
    SIZE_LADDER.iter().position(|s| *s == size)
}

/// Maximum credit balance for burstable families, keyed by shape.
fn burstable_max_credits(shape: &str) -> Option<f64> {
    let credits = match shape {
        "t2.micro" => 144.0,
        "t2.small" => 288.0,
        "t2.medium" => 576.0,
        "t2.large" => 864.0,
        "t3.micro" | "t4g.micro" => 288.0,
        "t3.small" | "t4g.small" => 576.0,
        "t3.medium" | "t4g.medium" => 576.0,
        "t3.large" | "t4g.large" => 864.0,
        "t3.xlarge" | "t4g.xlarge" => 2304.0,
        _ => return None,
    };
    Some(credits)
}

async fn cpu_average(
    ctx: &ScenarioContext<'_>,
    instance_id: &str,
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let sample = ctx
        .metric(
            MetricQuery::new("AWS/EC2", "CPUUtilization")
                .dimension("InstanceId", instance_id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Average),
        )
        .await?;
    Ok(sample.mean())
}

async fn network_total(
    ctx: &ScenarioContext<'_>,
    instance_id: &str,
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let network_in = ctx
        .metric(
            MetricQuery::new("AWS/EC2", "NetworkIn")
                .dimension("InstanceId", instance_id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let network_out = ctx
        .metric(
            MetricQuery::new("AWS/EC2", "NetworkOut")
                .dimension("InstanceId", instance_id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if network_in.is_empty() && network_out.is_empty() {
        return Ok(None);
    }
    Ok(Some(network_in.sum() + network_out.sum()))
}

struct Stopped;

#[async_trait]
impl Scenario for Stopped {
    fn orphan_type(&self) -> &'static str {
        "stopped"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_stopped")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_stopped = ctx.rules.i64_or("min_stopped_days", 30);
        let volumes = ctx.inventory(ResourceType::Volume).await?;
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Stopped {
                continue;
            }
            let (stopped_days, source) = stopped_duration_days(instance, ctx.now);
            if stopped_days < min_stopped {
                continue;
            }
            // A stopped instance bills only for its attached storage.
            let storage_cost: f64 = volumes
                .iter()
                .filter(|v| v.attachment(AttachmentKind::Instance) == Some(instance.id.as_str()))
                .map(|v| {
                    ctx.pricing.volume_monthly_cost(
                        v.sku.as_deref().unwrap_or("gp2"),
                        v.size_gb.unwrap_or(0.0),
                        v.provisioned_iops,
                        v.provisioned_throughput_mbps,
                    )
                })
                .sum();
            let reason = format!(
                "{} instance stopped for {} days; its attached storage keeps billing ${:.2}/month",
                shape(instance),
                stopped_days,
                storage_cost
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    storage_cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(stopped_days),
                    stopped_days,
                    reason,
                )
                .signal("stopped_days", stopped_days)
                .signal("stopped_since_source", source),
            );
        }
        Ok(findings)
    }
}

struct Oversized;

#[async_trait]
impl Scenario for Oversized {
    fn orphan_type(&self) -> &'static str {
        "oversized"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_oversized")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let cpu_threshold = ctx.rules.f64_or("oversized_cpu_threshold", 30.0);
        let lookback = ctx.rules.i64_or("oversized_lookback_days", 30);
        let min_size = ctx.rules.str_or("oversized_min_size", "xlarge");
        let min_rank = SIZE_LADDER.iter().position(|s| *s == min_size).unwrap_or(5);
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let current_shape = shape(instance).to_string();
            if size_rank(&current_shape).map(|r| r < min_rank).unwrap_or(true) {
                continue;
            }
            let Some(cpu) = cpu_average(ctx, &instance.id, lookback).await? else { continue };
            if cpu >= cpu_threshold {
                continue;
            }
            let Some(smaller) = downsized(&current_shape) else { continue };
            let current = ctx.pricing.instance_monthly_cost(&current_shape);
            let reduced = ctx.pricing.instance_monthly_cost(&smaller);
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(instance);
            let reason = format!(
                "{current_shape} averaged {cpu:.1}% CPU over {lookback} days; {smaller} would cover the load at ${reduced:.2} vs ${current:.2}/month"
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("average_cpu_percent", cpu)
                .signal("recommended_shape", smaller)
                .signal("current_monthly_cost", current),
            );
        }
        Ok(findings)
    }
}

struct OldGeneration;

#[async_trait]
impl Scenario for OldGeneration {
    fn orphan_type(&self) -> &'static str {
        "old_generation"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_old_generation")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let old_generations = ctx.rules.str_list("old_generations");
        let upgrades = ctx.rules.str_map("generation_upgrades");
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let current_shape = shape(instance).to_string();
            let Some((family, size)) = split_shape(&current_shape) else { continue };
            if !old_generations.iter().any(|g| g == family) {
                continue;
            }
            let Some(target_family) = upgrades.get(family) else { continue };
            let target_shape = format!("{target_family}.{size}");
            let current = ctx.pricing.instance_monthly_cost(&current_shape);
            let upgraded = ctx.pricing.instance_monthly_cost(&target_shape);
            let savings = (current - upgraded).max(0.0);
            let age = ctx.age_days(instance);
            let reason = format!(
                "{family} is a previous generation; {target_shape} offers better price/performance than {current_shape} (${upgraded:.2} vs ${current:.2}/month)"
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("current_shape", current_shape.clone())
                .signal("recommended_shape", target_shape),
            );
        }
        Ok(findings)
    }
}

struct BurstableCreditWaste;

#[async_trait]
impl Scenario for BurstableCreditWaste {
    fn orphan_type(&self) -> &'static str {
        "burstable_credit_waste"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_burstable_credit_waste")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.f64_or("burstable_credit_threshold", 0.9);
        let lookback = ctx.rules.i64_or("burstable_lookback_days", 30);
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let current_shape = shape(instance).to_string();
            let Some(max_credits) = burstable_max_credits(&current_shape) else { continue };
            let balance = ctx
                .metric(
                    MetricQuery::new("AWS/EC2", "CPUCreditBalance")
                        .dimension("InstanceId", &instance.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some(average_balance) = balance.mean() else { continue };
            let ratio = average_balance / max_credits;
            if ratio < threshold {
                continue;
            }
            let Some(smaller) = downsized(&current_shape) else { continue };
            let current = ctx.pricing.instance_monthly_cost(&current_shape);
            let reduced = ctx.pricing.instance_monthly_cost(&smaller);
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(instance);
            let reason = format!(
                "burstable {current_shape} holds {:.0}% of its CPU credits ({average_balance:.0} of {max_credits:.0}) — it never bursts, so {smaller} suffices (${savings:.2}/month saving)",
                ratio * 100.0
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("credit_balance", average_balance)
                .signal("credit_balance_ratio", ratio)
                .signal("recommended_shape", smaller),
            );
        }
        Ok(findings)
    }
}

struct DevTest24x7;

#[async_trait]
impl Scenario for DevTest24x7 {
    fn orphan_type(&self) -> &'static str {
        "dev_test_24_7"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_dev_test_24_7")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("nonprod_min_age_days", 7);
        let start = ctx.rules.i64_or("business_hours_start", 9);
        let end = ctx.rules.i64_or("business_hours_end", 18);
        let days = ctx.rules.u32_list("business_days");
        let weekly_hours = (end - start).max(0) * days.len() as i64;
        let off_fraction = 1.0 - weekly_hours as f64 / 168.0;
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            if !is_nonprod(instance, ctx.rules) {
                continue;
            }
            let age = ctx.age_days(instance);
            if age < min_age {
                continue;
            }
            let monthly = ctx.pricing.instance_monthly_cost(shape(instance));
            let savings = monthly * off_fraction;
            let reason = format!(
                "non-production {} runs 24/7; a {}h x {}-day schedule would cut ${:.2} of its ${:.2}/month",
                shape(instance),
                end - start,
                days.len(),
                savings,
                monthly
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("monthly_cost", monthly)
                .signal("schedulable_fraction", off_fraction),
            );
        }
        Ok(findings)
    }
}

struct Untagged;

#[async_trait]
impl Scenario for Untagged {
    fn orphan_type(&self) -> &'static str {
        "untagged_instance"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_untagged")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("untagged_min_age_days", 30);
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running || !instance.tags.is_empty() {
                continue;
            }
            let age = ctx.age_days(instance);
            if age < min_age {
                continue;
            }
            let cost = ctx.pricing.instance_monthly_cost(shape(instance));
            let reason = format!(
                "{} instance has run untagged for {} days; no owner, project, or environment is attributable (${:.2}/month)",
                shape(instance),
                age,
                cost
            );
            findings.push(Finding::new(
                instance,
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

struct IdleRunning;

#[async_trait]
impl Scenario for IdleRunning {
    fn orphan_type(&self) -> &'static str {
        "idle_running"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_running")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let cpu_threshold = ctx.rules.f64_or("cpu_threshold_percent", 5.0);
        let network_threshold = ctx.rules.f64_or("network_threshold_bytes", 1_000_000.0);
        let min_idle = ctx.rules.i64_or("min_idle_days", 7);
        let lookback = ctx.rules.i64_or("idle_lookback_days", 30);
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let age = ctx.age_days(instance);
            if age < min_idle {
                continue;
            }
            let Some(cpu) = cpu_average(ctx, &instance.id, lookback).await? else { continue };
            if cpu >= cpu_threshold {
                continue;
            }
            let Some(network) = network_total(ctx, &instance.id, lookback).await? else {
                continue;
            };
            if network >= network_threshold {
                continue;
            }
            let cost = ctx.pricing.instance_monthly_cost(shape(instance));
            let reason = format!(
                "{} running with {cpu:.1}% average CPU and {} of network traffic over {lookback} days — idle but billing ${cost:.2}/month",
                shape(instance),
                super::support::fmt_bytes(network)
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("average_cpu_percent", cpu)
                .signal("network_bytes", network)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct RightSizing;

#[async_trait]
impl Scenario for RightSizing {
    fn orphan_type(&self) -> &'static str {
        "right_sizing"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_right_sizing")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let avg_threshold = ctx.rules.f64_or("right_sizing_cpu_threshold", 40.0);
        let peak_threshold = ctx.rules.f64_or("right_sizing_max_cpu_threshold", 75.0);
        let lookback = ctx.rules.i64_or("right_sizing_lookback_days", 30);
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let Some(average) = cpu_average(ctx, &instance.id, lookback).await? else { continue };
            if average >= avg_threshold {
                continue;
            }
            let peaks = ctx
                .metric(
                    MetricQuery::new("AWS/EC2", "CPUUtilization")
                        .dimension("InstanceId", &instance.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            let Some(peak) = peaks.max() else { continue };
            // Peaks near capacity mean a smaller shape would throttle them.
            if peak >= peak_threshold {
                continue;
            }
            let current_shape = shape(instance).to_string();
            let Some(smaller) = downsized(&current_shape) else { continue };
            let current = ctx.pricing.instance_monthly_cost(&current_shape);
            let reduced = ctx.pricing.instance_monthly_cost(&smaller);
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(instance);
            let reason = format!(
                "{current_shape} shows {average:.1}% average / {peak:.1}% peak CPU over {lookback} days; one size down ({smaller}) saves ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("average_cpu_percent", average)
                .signal("peak_cpu_percent", peak)
                .signal("recommended_shape", smaller),
            );
        }
        Ok(findings)
    }
}

struct SpotEligible;

#[async_trait]
impl Scenario for SpotEligible {
    fn orphan_type(&self) -> &'static str {
        "spot_eligible"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_spot_eligible")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let variance_threshold = ctx.rules.f64_or("spot_cpu_variance_threshold", 20.0);
        let min_uptime = ctx.rules.i64_or("spot_min_uptime_days", 7);
        let excluded = ctx.rules.str_list("spot_excluded_types");
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let age = ctx.age_days(instance);
            if age < min_uptime {
                continue;
            }
            if instance.tag_marker_present(&excluded) {
                continue;
            }
            let sample = ctx
                .metric(
                    MetricQuery::new("AWS/EC2", "CPUUtilization")
                        .dimension("InstanceId", &instance.id)
                        .lookback_days(min_uptime.max(7))
                        .stat(MetricStat::Average),
                )
                .await?;
            let stddev = crate::telemetry::window_stddev(&sample);
            if !stddev.hint.is_measured() || stddev.value >= variance_threshold {
                continue;
            }
            let on_demand = ctx.pricing.instance_monthly_cost(shape(instance));
            // Spot capacity typically clears around 70% under on-demand.
            let savings = on_demand * 0.70;
            let reason = format!(
                "{} shows stable CPU (stddev {:.1} over {} days) with no stateful-workload marker; spot pricing would save about ${:.2} of ${:.2}/month",
                shape(instance),
                stddev.value,
                min_uptime.max(7),
                savings,
                on_demand
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("cpu_stddev", stddev.value)
                .signal("on_demand_monthly_cost", on_demand),
            );
        }
        Ok(findings)
    }
}

struct ScheduledUnused;

#[async_trait]
impl Scenario for ScheduledUnused {
    fn orphan_type(&self) -> &'static str {
        "scheduled_unused"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_scheduled_unused")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let cpu_threshold = ctx.rules.f64_or("scheduled_cpu_threshold", 10.0);
        let lookback = ctx.rules.i64_or("scheduled_lookback_days", 14);
        let start = ctx.rules.i64_or("business_hours_start", 9) as u32;
        let end = ctx.rules.i64_or("business_hours_end", 18) as u32;
        let days = ctx.rules.u32_list("business_days");
        let weekly_hours = (end.saturating_sub(start)) as i64 * days.len() as i64;
        let off_fraction = 1.0 - weekly_hours as f64 / 168.0;
        let mut findings = Vec::new();
        for instance in ctx.resources {
            if instance.state != ResourceState::Running {
                continue;
            }
            let hourly = ctx
                .metric(
                    MetricQuery::new("AWS/EC2", "CPUUtilization")
                        .dimension("InstanceId", &instance.id)
                        .lookback_days(lookback)
                        .period_secs(3600)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some((in_hours_avg, out_hours_avg)) =
                hourly_bucket_means(&hourly, &days, start, end)
            else {
                continue;
            };
            // Quiet off-hours with real in-hours activity = schedulable.
            if out_hours_avg >= cpu_threshold || in_hours_avg <= out_hours_avg * 2.0 {
                continue;
            }
            let age = ctx.age_days(instance);
            let monthly = ctx.pricing.instance_monthly_cost(shape(instance));
            let savings = monthly * off_fraction;
            let reason = format!(
                "{} averages {in_hours_avg:.1}% CPU in business hours but {out_hours_avg:.1}% outside them over {lookback} days; stopping it off-hours saves ${savings:.2}/month",
                shape(instance)
            );
            findings.push(
                Finding::new(
                    instance,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("in_hours_cpu_percent", in_hours_avg)
                .signal("out_hours_cpu_percent", out_hours_avg),
            );
        }
        Ok(findings)
    }
}

/// Mean CPU inside vs outside business hours; `None` when either bucket has
/// no datapoints.
fn hourly_bucket_means(
    sample: &TelemetrySample,
    business_days: &[u32],
    start_hour: u32,
    end_hour: u32,
) -> Option<(f64, f64)> {
    use chrono::Datelike;
    let mut in_sum = 0.0;
    let mut in_count = 0usize;
    let mut out_sum = 0.0;
    let mut out_count = 0usize;
    for (ts, value) in &sample.points {
        let weekday = ts.weekday().num_days_from_monday();
        let hour = ts.hour();
        if business_days.contains(&weekday) && hour >= start_hour && hour < end_hour {
            in_sum += value;
            in_count += 1;
        } else {
            out_sum += value;
            out_count += 1;
        }
    }
    if in_count == 0 || out_count == 0 {
        return None;
    }
    Some((in_sum / in_count as f64, out_sum / out_count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsized_walks_the_ladder() {
        assert_eq!(downsized("m5.xlarge").as_deref(), Some("m5.large"));
        assert_eq!(downsized("t3.micro").as_deref(), Some("t3.nano"));
        assert_eq!(downsized("m5.nano"), None);
        assert_eq!(downsized("weird"), None);
    }

    #[test]
    fn test_burstable_table_covers_families() {
        assert!(burstable_max_credits("t3.medium").is_some());
        assert!(burstable_max_credits("m5.large").is_none());
    }
}
