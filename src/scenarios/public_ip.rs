//! Routable public IP scenarios.
//!
//! The idle/low-traffic boundary is deliberately explicit: `idle_traffic`
//! fires below `idle_network_threshold_bytes`, `low_traffic` fires from that
//! threshold up to `low_traffic_threshold_gb`; above the band neither fires.

use super::support::{fmt_bytes, passes_min_age, stopped_duration_days};
use super::{Scenario, ScenarioContext};
use crate::models::{
    AttachmentKind, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState,
    ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Unassociated),
        Arc::new(OnStoppedInstance),
        Arc::new(MultiplePerInstance),
        Arc::new(OnDetachedInterface),
        Arc::new(NeverAssociated),
        Arc::new(OnUnusedNatGateway),
        Arc::new(IdleTraffic),
        Arc::new(LowTraffic),
        Arc::new(NatZeroConnections),
        Arc::new(OnFailedInstance),
    ]
}

fn ip_label(address: &Resource) -> &str {
    address.attr("public_ip").unwrap_or(&address.id)
}

/// Total network bytes moved by the attached instance over the window;
/// `None` = no signal.
async fn instance_network_bytes(
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

struct Unassociated;

#[async_trait]
impl Scenario for Unassociated {
    fn orphan_type(&self) -> &'static str {
        "unassociated"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unassociated")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 3);
        let mut findings = Vec::new();
        for address in ctx.resources {
            if address.state != ResourceState::Available {
                continue;
            }
            if !passes_min_age(address, ctx.now, min_age) {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} allocated {} days ago is not associated with any resource (${:.2}/month)",
                ip_label(address),
                age,
                cost
            );
            findings.push(Finding::new(
                address,
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

struct OnStoppedInstance;

#[async_trait]
impl Scenario for OnStoppedInstance {
    fn orphan_type(&self) -> &'static str {
        "on_stopped_instance"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_on_stopped_instance")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_stopped = ctx.rules.i64_or("min_stopped_days", 30);
        let instances = ctx.inventory(ResourceType::Instance).await?;
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(instance_id) = address.attachment(AttachmentKind::Instance) else {
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
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} is held by instance {} which has been stopped for {} days; the address bills while idle (${:.2}/month)",
                ip_label(address),
                instance_id,
                stopped_days,
                cost
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(stopped_days),
                    stopped_days,
                    reason,
                )
                .signal("instance_id", instance_id)
                .signal("stopped_since_source", source),
            );
        }
        Ok(findings)
    }
}

struct MultiplePerInstance;

#[async_trait]
impl Scenario for MultiplePerInstance {
    fn orphan_type(&self) -> &'static str {
        "multiple_per_instance"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_multiple_per_instance")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let max_per_instance = ctx.rules.usize_or("max_ips_per_instance", 1);
        let allow_tags = ctx.rules.str_list("allow_multiple_tags");
        let instances = ctx.inventory(ResourceType::Instance).await?;

        let mut per_instance: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
        for address in ctx.resources {
            if let Some(instance_id) = address.attachment(AttachmentKind::Instance) {
                per_instance.entry(instance_id).or_default().push(address);
            }
        }

        let mut findings = Vec::new();
        for (instance_id, addresses) in per_instance {
            if addresses.len() <= max_per_instance {
                continue;
            }
            let instance = instances.iter().find(|i| i.id == instance_id);
            let ha_justified = addresses.iter().any(|a| a.tag_marker_present(&allow_tags))
                || instance.map(|i| i.tag_marker_present(&allow_tags)).unwrap_or(false);
            if ha_justified {
                continue;
            }
            // Every address beyond the allowance is surplus.
            for address in addresses.iter().skip(max_per_instance) {
                let age = ctx.age_days(address);
                let cost = ctx.pricing.public_ip_monthly_cost();
                let reason = format!(
                    "instance {} holds {} public IPs (limit {}) with no high-availability marker; {} is surplus (${:.2}/month)",
                    instance_id,
                    addresses.len(),
                    max_per_instance,
                    ip_label(address),
                    cost
                );
                findings.push(
                    Finding::new(
                        address,
                        self.orphan_type(),
                        cost,
                        CostKind::Absolute,
                        ctx.confidence_for_age(age),
                        age,
                        reason,
                    )
                    .signal("instance_id", instance_id)
                    .signal("addresses_on_instance", addresses.len()),
                );
            }
        }
        Ok(findings)
    }
}

struct OnDetachedInterface;

#[async_trait]
impl Scenario for OnDetachedInterface {
    fn orphan_type(&self) -> &'static str {
        "on_detached_interface"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_on_detached_interface")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_days = ctx.rules.i64_or("detached_interface_min_days", 7);
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(interface_id) = address.attachment(AttachmentKind::NetworkInterface) else {
                continue;
            };
            if address.attachment(AttachmentKind::Instance).is_some() {
                continue;
            }
            if address.attr_bool("interface_attached").unwrap_or(true) {
                continue;
            }
            if !passes_min_age(address, ctx.now, min_days) {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} rides network interface {} which is attached to nothing (${:.2}/month)",
                ip_label(address),
                interface_id,
                cost
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("network_interface_id", interface_id),
            );
        }
        Ok(findings)
    }
}

struct NeverAssociated;

#[async_trait]
impl Scenario for NeverAssociated {
    fn orphan_type(&self) -> &'static str {
        "never_associated"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_associated")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_days = ctx.rules.i64_or("min_never_used_days", 7);
        let mut findings = Vec::new();
        for address in ctx.resources {
            if address.state != ResourceState::Available {
                continue;
            }
            // Association history is only available when the adapter could
            // establish it; absence of the marker is no signal.
            if address.attr("ever_associated") != Some("false") {
                continue;
            }
            if !passes_min_age(address, ctx.now, min_days) {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} has never been associated with any resource since allocation {} days ago (${:.2}/month)",
                ip_label(address),
                age,
                cost
            );
            findings.push(Finding::new(
                address,
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

struct OnUnusedNatGateway;

#[async_trait]
impl Scenario for OnUnusedNatGateway {
    fn orphan_type(&self) -> &'static str {
        "on_unused_nat_gateway"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_on_unused_nat_gateway")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("nat_gateway_min_idle_days", 30);
        let threshold_gb = ctx.rules.f64_or("nat_gateway_traffic_threshold_gb", 0.1);
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(nat_id) = address.attachment(AttachmentKind::NatGateway) else {
                continue;
            };
            let traffic = ctx
                .metric(
                    MetricQuery::new("AWS/NATGateway", "BytesOutToDestination")
                        .dimension("NatGatewayId", nat_id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            if traffic.is_empty() {
                continue;
            }
            let gb = traffic.sum() / (1024.0 * 1024.0 * 1024.0);
            if gb >= threshold_gb {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} fronts NAT gateway {} which pushed only {:.2} GB in {} days (threshold {:.1} GB)",
                ip_label(address),
                nat_id,
                gb,
                lookback,
                threshold_gb
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("nat_gateway_id", nat_id)
                .signal("traffic_gb", gb),
            );
        }
        Ok(findings)
    }
}

struct IdleTraffic;

#[async_trait]
impl Scenario for IdleTraffic {
    fn orphan_type(&self) -> &'static str {
        "idle_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let threshold = ctx.rules.f64_or("idle_network_threshold_bytes", 1_000_000.0);
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(instance_id) = address.attachment(AttachmentKind::Instance) else {
                continue;
            };
            let Some(bytes) = instance_network_bytes(ctx, instance_id, lookback).await? else {
                continue;
            };
            if bytes >= threshold {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} sits on instance {} which moved {} in {} days — effectively idle",
                ip_label(address),
                instance_id,
                fmt_bytes(bytes),
                lookback
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("instance_id", instance_id)
                .signal("network_bytes", bytes),
            );
        }
        Ok(findings)
    }
}

struct LowTraffic;

#[async_trait]
impl Scenario for LowTraffic {
    fn orphan_type(&self) -> &'static str {
        "low_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("min_observation_days", 30);
        let idle_floor = ctx.rules.f64_or("idle_network_threshold_bytes", 1_000_000.0);
        let ceiling_bytes =
            ctx.rules.f64_or("low_traffic_threshold_gb", 1.0) * 1024.0 * 1024.0 * 1024.0;
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(instance_id) = address.attachment(AttachmentKind::Instance) else {
                continue;
            };
            let Some(bytes) = instance_network_bytes(ctx, instance_id, lookback).await? else {
                continue;
            };
            // Below the floor belongs to idle_traffic; above the ceiling is
            // legitimate use.
            if bytes < idle_floor || bytes >= ceiling_bytes {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} carried only {} in {} days (band {} - {}), suggesting it is barely used",
                ip_label(address),
                fmt_bytes(bytes),
                lookback,
                fmt_bytes(idle_floor),
                fmt_bytes(ceiling_bytes)
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("instance_id", instance_id)
                .signal("network_bytes", bytes),
            );
        }
        Ok(findings)
    }
}

struct NatZeroConnections;

#[async_trait]
impl Scenario for NatZeroConnections {
    fn orphan_type(&self) -> &'static str {
        "nat_zero_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_nat_zero_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("nat_gateway_zero_connections_days", 30);
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(nat_id) = address.attachment(AttachmentKind::NatGateway) else {
                continue;
            };
            let connections = ctx
                .metric(
                    MetricQuery::new("AWS/NATGateway", "ActiveConnectionCount")
                        .dimension("NatGatewayId", nat_id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            if connections.is_empty() || connections.max().unwrap_or(0.0) > 0.0 {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} fronts NAT gateway {} which held zero active connections for {} days",
                ip_label(address),
                nat_id,
                lookback
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("nat_gateway_id", nat_id),
            );
        }
        Ok(findings)
    }
}

struct OnFailedInstance;

#[async_trait]
impl Scenario for OnFailedInstance {
    fn orphan_type(&self) -> &'static str {
        "on_failed_instance"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIp
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_on_failed_instance")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_failed_days = ctx.rules.i64_or("min_failed_days", 7);
        let mut findings = Vec::new();
        for address in ctx.resources {
            let Some(instance_id) = address.attachment(AttachmentKind::Instance) else {
                continue;
            };
            let checks = ctx
                .metric(
                    MetricQuery::new("AWS/EC2", "StatusCheckFailed")
                        .dimension("InstanceId", instance_id)
                        .lookback_days(min_failed_days)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            if checks.is_empty() {
                continue;
            }
            let failing_days = checks.points.iter().filter(|(_, v)| *v >= 1.0).count() as i64;
            if failing_days < min_failed_days {
                continue;
            }
            let age = ctx.age_days(address);
            let cost = ctx.pricing.public_ip_monthly_cost();
            let reason = format!(
                "public IP {} points at instance {} which has failed status checks for {} consecutive days",
                ip_label(address),
                instance_id,
                failing_days
            );
            findings.push(
                Finding::new(
                    address,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    // A dead endpoint is waste no matter how young the address.
                    ctx.confidence_for_age(age).at_least(crate::models::Confidence::High),
                    age,
                    reason,
                )
                .signal("instance_id", instance_id)
                .signal("failing_days", failing_days),
            );
        }
        Ok(findings)
    }
}
