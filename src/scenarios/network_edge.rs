//! Network edge scenarios: VPN connections and transit attachments carrying
//! no traffic, and endpoints wired to nothing.

use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(VpnNoTraffic),
        Arc::new(TransitNoTraffic),
        Arc::new(EndpointNoInterfaces),
    ]
}

struct VpnNoTraffic;

#[async_trait]
impl Scenario for VpnNoTraffic {
    fn orphan_type(&self) -> &'static str {
        "vpn_no_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::VpnConnection
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("traffic_lookback_days", 30);
        let mut findings = Vec::new();
        for vpn in ctx.resources {
            if vpn.state != ResourceState::Available {
                continue;
            }
            let inbound = ctx
                .metric(
                    MetricQuery::new("AWS/VPN", "TunnelDataIn")
                        .dimension("VpnId", &vpn.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            let outbound = ctx
                .metric(
                    MetricQuery::new("AWS/VPN", "TunnelDataOut")
                        .dimension("VpnId", &vpn.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            if inbound.is_empty() && outbound.is_empty() {
                continue;
            }
            if inbound.sum() + outbound.sum() > 0.0 {
                continue;
            }
            let age = ctx.age_days(vpn);
            let cost = ctx.pricing.vpn_connection_monthly_cost();
            let reason = format!(
                "VPN connection moved zero bytes through its tunnels in {lookback} days; the far side is likely gone (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    vpn,
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

struct TransitNoTraffic;

#[async_trait]
impl Scenario for TransitNoTraffic {
    fn orphan_type(&self) -> &'static str {
        "transit_no_traffic"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::TransitAttachment
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_traffic")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("traffic_lookback_days", 30);
        let mut findings = Vec::new();
        for attachment in ctx.resources {
            if attachment.state != ResourceState::Available {
                continue;
            }
            let bytes_in = ctx
                .metric(
                    MetricQuery::new("AWS/TransitGateway", "BytesIn")
                        .dimension("TransitGatewayAttachment", &attachment.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            if bytes_in.is_empty() || bytes_in.sum() > 0.0 {
                continue;
            }
            let age = ctx.age_days(attachment);
            let cost = ctx.pricing.transit_attachment_monthly_cost();
            let reason = format!(
                "transit attachment received zero bytes in {lookback} days; the attached {} network no longer talks through it (${cost:.2}/month)",
                attachment.attr("attached_resource_type").unwrap_or("vpc")
            );
            findings.push(
                Finding::new(
                    attachment,
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

struct EndpointNoInterfaces;

#[async_trait]
impl Scenario for EndpointNoInterfaces {
    fn orphan_type(&self) -> &'static str {
        "no_network_interfaces"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::VpcEndpoint
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_network_interfaces")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 3);
        let mut findings = Vec::new();
        for endpoint in ctx.resources {
            // Gateway endpoints are free and have no interfaces by design.
            if endpoint.attr("endpoint_type") != Some("Interface") {
                continue;
            }
            if endpoint.attr_u64("network_interface_count").unwrap_or(1) > 0 {
                continue;
            }
            if !super::support::passes_min_age(endpoint, ctx.now, min_age) {
                continue;
            }
            let age = ctx.age_days(endpoint);
            let cost = ctx.pricing.vpc_endpoint_monthly_cost();
            let reason = format!(
                "interface endpoint for {} has no network interfaces left; nothing can use it (${cost:.2}/month)",
                endpoint.attr("service_name").unwrap_or("a service")
            );
            findings.push(Finding::new(
                endpoint,
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
