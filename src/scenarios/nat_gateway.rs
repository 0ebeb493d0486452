//! NAT gateway scenarios: dead routing, dead traffic, misconfiguration,
//! redundancy, and migration leftovers.

use super::support::{fmt_bytes, is_nonprod, passes_min_age};
use super::{Scenario, ScenarioContext};
use crate::models::{
    AttachmentKind, Confidence, CostKind, Finding, MetricQuery, MetricStat, Resource,
    ResourceType, TelemetrySample,
};
use crate::providers::{ProviderError, RelationKind};
use crate::telemetry::{business_hours_split, trend_ratio};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;
/// Per-GB data processing rate, used to price traffic that endpoints would
/// absorb.
const NAT_PROCESSING_PER_GB: f64 = 0.045;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(NoRoutes),
        Arc::new(ZeroTraffic),
        Arc::new(RoutesWithoutSubnet),
        Arc::new(NoInternetGateway),
        Arc::new(PublicSubnet),
        Arc::new(RedundantSameAz),
        Arc::new(LowTraffic),
        Arc::new(VpcEndpointCandidate),
        Arc::new(DevTestBusinessHours),
        Arc::new(ObsoleteAfterMigration),
    ]
}

async fn bytes_out(
    ctx: &ScenarioContext<'_>,
    nat: &Resource,
    lookback_days: i64,
) -> Result<TelemetrySample, ProviderError> {
    ctx.metric(
        MetricQuery::new("AWS/NATGateway", "BytesOutToDestination")
            .dimension("NatGatewayId", &nat.id)
            .lookback_days(lookback_days)
            .stat(MetricStat::Sum),
    )
    .await
}

struct NoRoutes;

#[async_trait]
impl Scenario for NoRoutes {
    fn orphan_type(&self) -> &'static str {
        "no_routes"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_routes")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            if !passes_min_age(nat, ctx.now, min_age) {
                continue;
            }
            let routes = ctx.related(RelationKind::NatRouteTables, &nat.id).await?;
            if !routes.is_empty() {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "no route table references NAT gateway {} — nothing can send traffic through it (${:.2}/month)",
                nat.id, cost
            );
            findings.push(Finding::new(
                nat,
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

struct ZeroTraffic;

#[async_trait]
impl Scenario for ZeroTraffic {
    fn orphan_type(&self) -> &'static str {
        "zero_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_zero_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let lookback = ctx.rules.i64_or("traffic_lookback_days", 30);
        let threshold = ctx.rules.f64_or("max_bytes_30d", 1_000_000.0);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            if !passes_min_age(nat, ctx.now, min_age) {
                continue;
            }
            let traffic = bytes_out(ctx, nat, lookback).await?;
            if traffic.is_empty() {
                continue;
            }
            let total = traffic.sum();
            if total >= threshold {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "NAT gateway {} pushed {} to destinations in the last {} days (threshold {}) — zero-traffic (${:.2}/month)",
                nat.id,
                fmt_bytes(total),
                lookback,
                fmt_bytes(threshold),
                cost
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("bytes_out", total)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct RoutesWithoutSubnet;

#[async_trait]
impl Scenario for RoutesWithoutSubnet {
    fn orphan_type(&self) -> &'static str {
        "routes_without_subnet"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_routes_without_subnet")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 7);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            if !passes_min_age(nat, ctx.now, min_age) {
                continue;
            }
            let routes = ctx.related(RelationKind::NatRouteTables, &nat.id).await?;
            if routes.is_empty() {
                continue;
            }
            if routes.iter().any(|rt| rt.attr_u64("subnet_association_count").unwrap_or(0) > 0) {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "{} route table(s) point at NAT gateway {} but none is associated with a subnet — the routes are dead (${:.2}/month)",
                routes.len(),
                nat.id,
                cost
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("route_table_count", routes.len()),
            );
        }
        Ok(findings)
    }
}

struct NoInternetGateway;

#[async_trait]
impl Scenario for NoInternetGateway {
    fn orphan_type(&self) -> &'static str {
        "no_internet_gateway"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_internet_gateway")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for nat in ctx.resources {
            let Some(vpc_id) = nat.attachment(AttachmentKind::Vpc) else { continue };
            let gateways = ctx.related(RelationKind::InternetGateways, vpc_id).await?;
            if !gateways.is_empty() {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "VPC {vpc_id} has no internet gateway, so NAT gateway {} cannot reach anything — broken configuration (${cost:.2}/month)",
                nat.id
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    // Functionally dead hardware earns high confidence outright.
                    ctx.confidence_for_age(age).at_least(Confidence::High),
                    age,
                    reason,
                )
                .signal("vpc_id", vpc_id),
            );
        }
        Ok(findings)
    }
}

struct PublicSubnet;

#[async_trait]
impl Scenario for PublicSubnet {
    fn orphan_type(&self) -> &'static str {
        "public_subnet"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_public_subnet")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut findings = Vec::new();
        for nat in ctx.resources {
            let Some(subnet_id) = nat.attachment(AttachmentKind::Subnet) else { continue };
            let tables = ctx.related(RelationKind::SubnetRouteTables, subnet_id).await?;
            if tables.is_empty() {
                continue;
            }
            // The hosting subnet must route to an internet gateway for the
            // NAT to function; a NAT parked in a private subnet is inert.
            if tables.iter().any(|t| t.attr_bool("has_igw_route")) {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "subnet {subnet_id} hosting NAT gateway {} has no internet-gateway route; the gateway is misplaced and cannot serve traffic (${cost:.2}/month)",
                nat.id
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age).at_least(Confidence::High),
                    age,
                    reason,
                )
                .signal("subnet_id", subnet_id),
            );
        }
        Ok(findings)
    }
}

struct RedundantSameAz;

#[async_trait]
impl Scenario for RedundantSameAz {
    fn orphan_type(&self) -> &'static str {
        "redundant_same_az"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_redundant_same_az")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let mut per_subnet: BTreeMap<(&str, &str), Vec<&Resource>> = BTreeMap::new();
        for nat in ctx.resources {
            let (Some(vpc), Some(subnet)) = (
                nat.attachment(AttachmentKind::Vpc),
                nat.attachment(AttachmentKind::Subnet),
            ) else {
                continue;
            };
            per_subnet.entry((vpc, subnet)).or_default().push(nat);
        }

        let mut findings = Vec::new();
        for ((vpc, subnet), mut gateways) in per_subnet {
            if gateways.len() <= 1 {
                continue;
            }
            // Keep the oldest; younger siblings are the redundancy.
            gateways.sort_by_key(|n| n.created_at);
            for nat in gateways.iter().skip(1) {
                let age = ctx.age_days(nat);
                let cost = ctx.pricing.nat_gateway_monthly_cost();
                let reason = format!(
                    "{} NAT gateways share subnet {subnet} in VPC {vpc}; one per availability zone is enough (${cost:.2}/month each)",
                    gateways.len()
                );
                findings.push(
                    Finding::new(
                        nat,
                        self.orphan_type(),
                        cost,
                        CostKind::Absolute,
                        ctx.confidence_for_age(age),
                        age,
                        reason,
                    )
                    .signal("vpc_id", vpc)
                    .signal("subnet_id", subnet)
                    .signal("gateways_in_subnet", gateways.len()),
                );
            }
        }
        Ok(findings)
    }
}

struct LowTraffic;

#[async_trait]
impl Scenario for LowTraffic {
    fn orphan_type(&self) -> &'static str {
        "nat_low_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("traffic_lookback_days", 30);
        let zero_ceiling = ctx.rules.f64_or("max_bytes_30d", 1_000_000.0);
        let threshold_gb = ctx.rules.f64_or("low_traffic_threshold_gb", 10.0);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            let traffic = bytes_out(ctx, nat, lookback).await?;
            if traffic.is_empty() {
                continue;
            }
            let total = traffic.sum();
            // Below the zero band belongs to zero_traffic.
            if total < zero_ceiling || total >= threshold_gb * GB {
                continue;
            }
            let age = ctx.age_days(nat);
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let gb_moved = total / GB;
            let reason = format!(
                "NAT gateway {} moved only {gb_moved:.2} GB in {lookback} days (threshold {threshold_gb:.0} GB); a public IP on the workload would be cheaper than ${cost:.2}/month",
                nat.id
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("traffic_gb", gb_moved),
            );
        }
        Ok(findings)
    }
}

struct VpcEndpointCandidate;

#[async_trait]
impl Scenario for VpcEndpointCandidate {
    fn orphan_type(&self) -> &'static str {
        "vpc_endpoint_candidate"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_vpc_endpoint_candidate")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("traffic_lookback_days", 30);
        let traffic_ceiling_gb = ctx.rules.f64_or("vpc_endpoint_traffic_threshold_gb", 50.0);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            let Some(vpc_id) = nat.attachment(AttachmentKind::Vpc) else { continue };
            let endpoints = ctx.related(RelationKind::VpcEndpoints, vpc_id).await?;
            let mut missing = Vec::new();
            for service in ["s3", "dynamodb"] {
                let present = endpoints.iter().any(|e| {
                    e.attr("service_name")
                        .map(|s| s.ends_with(&format!(".{service}")))
                        .unwrap_or(false)
                });
                if !present {
                    missing.push(service);
                }
            }
            if missing.is_empty() {
                continue;
            }
            let traffic = bytes_out(ctx, nat, lookback).await?;
            if traffic.is_empty() {
                continue;
            }
            let gb_moved = traffic.sum() / GB;
            if gb_moved >= traffic_ceiling_gb {
                continue;
            }
            let savings = gb_moved * NAT_PROCESSING_PER_GB;
            let age = ctx.age_days(nat);
            let reason = format!(
                "VPC {vpc_id} lacks gateway endpoints for {}; routing that traffic through NAT gateway {} costs ${NAT_PROCESSING_PER_GB:.3}/GB — about ${savings:.2}/month at the observed {gb_moved:.1} GB",
                missing.join(" and "),
                nat.id
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("missing_endpoints", missing.join(","))
                .signal("traffic_gb", gb_moved),
            );
        }
        Ok(findings)
    }
}

struct DevTestBusinessHours;

#[async_trait]
impl Scenario for DevTestBusinessHours {
    fn orphan_type(&self) -> &'static str {
        "dev_test_business_hours"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_dev_test_business_hours")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("dev_test_pattern_lookback_days", 7);
        let threshold = ctx.rules.f64_or("business_hours_traffic_threshold", 90.0);
        let start = ctx.rules.i64_or("business_hours_start", 8) as u32;
        let end = ctx.rules.i64_or("business_hours_end", 18) as u32;
        let days = ctx.rules.u32_list("business_days");
        let weekly_hours = (end.saturating_sub(start)) as i64 * days.len() as i64;
        let off_fraction = 1.0 - weekly_hours as f64 / 168.0;
        let mut findings = Vec::new();
        for nat in ctx.resources {
            if !is_nonprod(nat, ctx.rules) {
                continue;
            }
            let hourly = ctx
                .metric(
                    MetricQuery::new("AWS/NATGateway", "BytesOutToDestination")
                        .dimension("NatGatewayId", &nat.id)
                        .lookback_days(lookback)
                        .period_secs(3600)
                        .stat(MetricStat::Sum),
                )
                .await?;
            let split = business_hours_split(&hourly, &days, start, end);
            if !split.hint.is_measured() || split.in_hours_percent < threshold {
                continue;
            }
            let age = ctx.age_days(nat);
            let monthly = ctx.pricing.nat_gateway_monthly_cost();
            let savings = monthly * off_fraction;
            let reason = format!(
                "dev/test NAT gateway {} sees {:.1}% of its traffic inside business hours; tearing it down off-hours saves ${savings:.2} of ${monthly:.2}/month",
                nat.id, split.in_hours_percent
            );
            findings.push(
                Finding::new(
                    nat,
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

struct ObsoleteAfterMigration;

#[async_trait]
impl Scenario for ObsoleteAfterMigration {
    fn orphan_type(&self) -> &'static str {
        "obsolete_after_migration"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_obsolete_after_migration")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("migration_min_age_days", 90);
        let baseline_days = ctx.rules.i64_or("migration_baseline_days", 90);
        let drop_threshold = ctx.rules.f64_or("traffic_drop_threshold_percent", 90.0);
        let mut findings = Vec::new();
        for nat in ctx.resources {
            let age = ctx.age_days(nat);
            if age < min_age {
                continue;
            }
            let series = bytes_out(ctx, nat, baseline_days).await?;
            if series.is_empty() {
                continue;
            }
            // Baseline: the window's oldest third. Current: the last week.
            let baseline_cutoff = ctx.now - chrono::Duration::days(baseline_days * 2 / 3);
            let current_cutoff = ctx.now - chrono::Duration::days(7);
            let baseline = TelemetrySample::from_points(
                series.points.iter().filter(|(t, _)| *t < baseline_cutoff).cloned().collect(),
            );
            let current = TelemetrySample::from_points(
                series.points.iter().filter(|(t, _)| *t >= current_cutoff).cloned().collect(),
            );
            let trend = trend_ratio(&baseline, &current);
            if !trend.hint.is_measured() || trend.change_percent > -drop_threshold {
                continue;
            }
            let cost = ctx.pricing.nat_gateway_monthly_cost();
            let reason = format!(
                "traffic through NAT gateway {} dropped {:.1}% ({} -> {} per day) over the last {baseline_days} days — likely obsolete after a migration (${cost:.2}/month)",
                nat.id,
                -trend.change_percent,
                fmt_bytes(trend.baseline_mean),
                fmt_bytes(trend.current_mean)
            );
            findings.push(
                Finding::new(
                    nat,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("traffic_drop_percent", -trend.change_percent)
                .signal("baseline_daily_bytes", trend.baseline_mean)
                .signal("current_daily_bytes", trend.current_mean),
            );
        }
        Ok(findings)
    }
}
