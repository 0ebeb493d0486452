//! Load balancer scenarios: empty or broken topologies, dead traffic,
//! legacy SKUs, and schedulable idle patterns.

use super::support::passes_min_age;
use super::{Scenario, ScenarioContext};
use crate::models::{
    Confidence, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceType,
};
use crate::providers::ProviderError;
use crate::telemetry::business_hours_split;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(NoTargets),
        Arc::new(AllTargetsUnhealthy),
        Arc::new(NoListeners),
        Arc::new(ZeroRequests),
        Arc::new(LegacySku),
        Arc::new(CrossZoneDisabled),
        Arc::new(IdleBusinessHours),
        Arc::new(NeverUsed),
    ]
}

fn sku(lb: &Resource) -> &str {
    lb.sku.as_deref().unwrap_or("application")
}

fn monthly_cost(ctx: &ScenarioContext<'_>, lb: &Resource) -> f64 {
    ctx.pricing.load_balancer_monthly_cost(sku(lb))
}

/// Request-volume query using the namespace/dimension the adapter resolved.
/// Network balancers have no request metric, so bytes stand in.
fn activity_query(lb: &Resource, lookback_days: i64, period_secs: i32) -> Option<MetricQuery> {
    let namespace = lb.attr("metric_namespace")?;
    let dimension_name = lb.attr("metric_dimension_name")?;
    let dimension_value = lb.attr("metric_dimension_value")?;
    let metric = if namespace == "AWS/NetworkELB" { "ProcessedBytes" } else { "RequestCount" };
    Some(
        MetricQuery::new(namespace, metric)
            .dimension(dimension_name, dimension_value)
            .lookback_days(lookback_days)
            .period_secs(period_secs)
            .stat(MetricStat::Sum),
    )
}

struct NoTargets;

#[async_trait]
impl Scenario for NoTargets {
    fn orphan_type(&self) -> &'static str {
        "no_targets"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_targets")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let mut findings = Vec::new();
        for lb in ctx.resources {
            if lb.attr_u64("target_count").unwrap_or(0) > 0 {
                continue;
            }
            if lb.attr_u64("listener_count").unwrap_or(0) == 0 {
                // Fully empty balancers belong to no_listeners/never_used.
                continue;
            }
            if !passes_min_age(lb, ctx.now, min_age) {
                continue;
            }
            let age = ctx.age_days(lb);
            let cost = monthly_cost(ctx, lb);
            let reason = format!(
                "{} load balancer has listeners but no registered targets — every request would fail (${:.2}/month)",
                sku(lb),
                cost
            );
            findings.push(Finding::new(
                lb,
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

struct AllTargetsUnhealthy;

#[async_trait]
impl Scenario for AllTargetsUnhealthy {
    fn orphan_type(&self) -> &'static str {
        "all_targets_unhealthy"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_all_targets_unhealthy")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for lb in ctx.resources {
            let targets = lb.attr_u64("target_count").unwrap_or(0);
            let healthy = lb.attr_u64("healthy_target_count").unwrap_or(0);
            if targets == 0 || healthy > 0 {
                continue;
            }
            let age = ctx.age_days(lb);
            let cost = monthly_cost(ctx, lb);
            let reason = format!(
                "all {targets} targets behind this {} load balancer are unhealthy; it serves nothing while billing ${cost:.2}/month",
                sku(lb)
            );
            findings.push(
                Finding::new(
                    lb,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    // A balancer with a fully dead backend is waste now.
                    ctx.confidence_for_age(age).at_least(Confidence::High),
                    age,
                    reason,
                )
                .signal("target_count", targets),
            );
        }
        Ok(findings)
    }
}

struct NoListeners;

#[async_trait]
impl Scenario for NoListeners {
    fn orphan_type(&self) -> &'static str {
        "no_listeners"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_listeners")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let mut findings = Vec::new();
        for lb in ctx.resources {
            if lb.attr_u64("listener_count").unwrap_or(0) > 0 {
                continue;
            }
            if !passes_min_age(lb, ctx.now, min_age) {
                continue;
            }
            let age = ctx.age_days(lb);
            let cost = monthly_cost(ctx, lb);
            let reason = format!(
                "{} load balancer has no listeners configured; no traffic can even arrive (${:.2}/month)",
                sku(lb),
                cost
            );
            findings.push(Finding::new(
                lb,
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

struct ZeroRequests;

#[async_trait]
impl Scenario for ZeroRequests {
    fn orphan_type(&self) -> &'static str {
        "zero_requests"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_zero_requests")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("requests_lookback_days", 30);
        let min_requests = ctx.rules.f64_or("min_requests_30d", 100.0);
        let mut findings = Vec::new();
        for lb in ctx.resources {
            let Some(query) = activity_query(lb, lookback, 86_400) else { continue };
            let metric_name = query.metric.clone();
            let sample = ctx.metric(query).await?;
            if sample.is_empty() {
                continue;
            }
            let total = sample.sum();
            if total >= min_requests {
                continue;
            }
            let age = ctx.age_days(lb);
            let cost = monthly_cost(ctx, lb);
            let reason = format!(
                "{} load balancer recorded {total:.0} {metric_name} in {lookback} days (minimum {min_requests:.0}) — nobody is using it (${cost:.2}/month)",
                sku(lb)
            );
            findings.push(
                Finding::new(
                    lb,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("request_total", total)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct LegacySku;

#[async_trait]
impl Scenario for LegacySku {
    fn orphan_type(&self) -> &'static str {
        "legacy_sku"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_legacy_sku")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for lb in ctx.resources {
            if sku(lb) != "classic" {
                continue;
            }
            let age = ctx.age_days(lb);
            let current = ctx.pricing.load_balancer_monthly_cost("classic");
            let modern = ctx.pricing.load_balancer_monthly_cost("application");
            let savings = (current - modern).max(0.0);
            let reason = format!(
                "classic load balancer is a retired generation; an application load balancer costs ${modern:.2} vs ${current:.2}/month and unlocks current features"
            );
            findings.push(
                Finding::new(
                    lb,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("current_monthly_cost", current)
                .signal("recommended_sku", "application"),
            );
        }
        Ok(findings)
    }
}

struct CrossZoneDisabled;

#[async_trait]
impl Scenario for CrossZoneDisabled {
    fn orphan_type(&self) -> &'static str {
        "cross_zone_disabled"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_cross_zone_disabled")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for lb in ctx.resources {
            let Some(cross_zone) = lb.attr_bool("cross_zone_enabled") else { continue };
            if cross_zone || lb.attr_u64("availability_zone_count").unwrap_or(0) < 2 {
                continue;
            }
            // Without cross-zone, uneven backend placement drives inter-zone
            // hops from clients; price the observed volume at transfer rates.
            let savings = match activity_query(lb, 30, 86_400) {
                Some(query) if query.metric == "ProcessedBytes" => {
                    let sample = ctx.metric(query).await?;
                    sample.sum() / (1024.0 * 1024.0 * 1024.0) * 0.01 * 0.5
                }
                _ => 0.0,
            };
            let age = ctx.age_days(lb);
            let reason = format!(
                "cross-zone load balancing is disabled on this {} load balancer spanning {} zones; uneven zone placement turns into paid inter-zone transfer",
                sku(lb),
                lb.attr_u64("availability_zone_count").unwrap_or(0)
            );
            findings.push(
                Finding::new(
                    lb,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("availability_zones", lb.attr_u64("availability_zone_count").unwrap_or(0)),
            );
        }
        Ok(findings)
    }
}

struct IdleBusinessHours;

#[async_trait]
impl Scenario for IdleBusinessHours {
    fn orphan_type(&self) -> &'static str {
        "idle_business_hours"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_business_hours")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("idle_pattern_lookback_days", 14);
        let threshold = ctx.rules.f64_or("business_hours_traffic_threshold", 90.0);
        let start = ctx.rules.i64_or("business_hours_start", 9) as u32;
        let end = ctx.rules.i64_or("business_hours_end", 18) as u32;
        let days = ctx.rules.u32_list("business_days");
        let weekly_hours = (end.saturating_sub(start)) as i64 * days.len() as i64;
        let off_fraction = 1.0 - weekly_hours as f64 / 168.0;
        let mut findings = Vec::new();
        for lb in ctx.resources {
            let Some(query) = activity_query(lb, lookback, 3600) else { continue };
            let sample = ctx.metric(query).await?;
            let split = business_hours_split(&sample, &days, start, end);
            if !split.hint.is_measured() || split.in_hours_percent < threshold {
                continue;
            }
            let age = ctx.age_days(lb);
            let monthly = monthly_cost(ctx, lb);
            let savings = monthly * off_fraction;
            let reason = format!(
                "{:.1}% of this {} load balancer's traffic lands inside business hours; scheduling the stack off-hours saves ${savings:.2} of ${monthly:.2}/month",
                split.in_hours_percent,
                sku(lb)
            );
            findings.push(
                Finding::new(
                    lb,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("in_hours_traffic_percent", split.in_hours_percent),
            );
        }
        Ok(findings)
    }
}

struct NeverUsed;

#[async_trait]
impl Scenario for NeverUsed {
    fn orphan_type(&self) -> &'static str {
        "never_used"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_used")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("never_used_min_age_days", 30);
        let mut findings = Vec::new();
        for lb in ctx.resources {
            if lb.attr_u64("listener_count").unwrap_or(0) > 0
                || lb.attr_u64("target_count").unwrap_or(0) > 0
            {
                continue;
            }
            let age = ctx.age_days(lb);
            if age < min_age {
                continue;
            }
            let cost = monthly_cost(ctx, lb);
            let reason = format!(
                "{} load balancer created {age} days ago still has neither listeners nor targets — it was never put into service (${cost:.2}/month)",
                sku(lb)
            );
            findings.push(Finding::new(
                lb,
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
