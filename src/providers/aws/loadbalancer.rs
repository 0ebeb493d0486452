//! Load balancer inventory, merging the current and the legacy API.
//!
//! Each entry carries its monitoring namespace/dimension as attributes so
//! scenarios never have to parse provider ARNs.

use super::{RegionClients, classify, from_smithy_time};
use crate::models::{Attachment, AttachmentKind, Resource, ResourceState, ResourceType};
use crate::providers::ProviderError;

pub(crate) async fn list_load_balancers(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = list_v2(clients, region).await?;
    out.extend(list_classic(clients, region).await?);
    Ok(out)
}

async fn list_v2(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.elbv2.describe_load_balancers().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let lb = item.map_err(|e| classify("elasticloadbalancing:DescribeLoadBalancers", e))?;
        let Some(arn) = lb.load_balancer_arn() else { continue };
        let mut r = Resource::new(ResourceType::LoadBalancer, arn, region);
        r.name = lb.load_balancer_name().map(str::to_string);
        r.created_at = lb.created_time().and_then(from_smithy_time);
        r.sku = lb.r#type().map(|t| t.as_str().to_string());
        r.state = match lb.state().and_then(|s| s.code()).map(|c| c.as_str()) {
            Some("active") => ResourceState::Available,
            Some("provisioning") => ResourceState::Pending,
            Some("failed") => ResourceState::Error,
            _ => ResourceState::Unknown,
        };
        if let Some(vpc) = lb.vpc_id() {
            r.attachments.push(Attachment { kind: AttachmentKind::Vpc, target_id: vpc.to_string() });
        }
        r.attributes.insert(
            "availability_zone_count".to_string(),
            lb.availability_zones().len().to_string(),
        );

        let namespace = match r.sku.as_deref() {
            Some("network") => "AWS/NetworkELB",
            Some("gateway") => "AWS/GatewayELB",
            _ => "AWS/ApplicationELB",
        };
        r.attributes.insert("metric_namespace".to_string(), namespace.to_string());
        r.attributes.insert("metric_dimension_name".to_string(), "LoadBalancer".to_string());
        if let Some(suffix) = arn.split("loadbalancer/").nth(1) {
            r.attributes.insert("metric_dimension_value".to_string(), suffix.to_string());
        }

        annotate_v2_topology(clients, arn, &mut r).await?;
        out.push(r);
    }
    Ok(out)
}

/// Attach listener/target counts and the cross-zone setting.
async fn annotate_v2_topology(
    clients: &RegionClients,
    arn: &str,
    r: &mut Resource,
) -> Result<(), ProviderError> {
    let listeners = clients
        .elbv2
        .describe_listeners()
        .load_balancer_arn(arn)
        .send()
        .await
        .map_err(|e| classify("elasticloadbalancing:DescribeListeners", e))?;
    r.attributes
        .insert("listener_count".to_string(), listeners.listeners().len().to_string());

    let target_groups = clients
        .elbv2
        .describe_target_groups()
        .load_balancer_arn(arn)
        .send()
        .await
        .map_err(|e| classify("elasticloadbalancing:DescribeTargetGroups", e))?;
    let mut targets = 0usize;
    let mut healthy = 0usize;
    for tg in target_groups.target_groups() {
        let Some(tg_arn) = tg.target_group_arn() else { continue };
        let health = clients
            .elbv2
            .describe_target_health()
            .target_group_arn(tg_arn)
            .send()
            .await
            .map_err(|e| classify("elasticloadbalancing:DescribeTargetHealth", e))?;
        for description in health.target_health_descriptions() {
            targets += 1;
            if description
                .target_health()
                .and_then(|h| h.state())
                .map(|s| s.as_str() == "healthy")
                .unwrap_or(false)
            {
                healthy += 1;
            }
        }
    }
    r.attributes
        .insert("target_group_count".to_string(), target_groups.target_groups().len().to_string());
    r.attributes.insert("target_count".to_string(), targets.to_string());
    r.attributes.insert("healthy_target_count".to_string(), healthy.to_string());

    let attributes = clients
        .elbv2
        .describe_load_balancer_attributes()
        .load_balancer_arn(arn)
        .send()
        .await
        .map_err(|e| classify("elasticloadbalancing:DescribeLoadBalancerAttributes", e))?;
    for attribute in attributes.attributes() {
        if attribute.key() == Some("load_balancing.cross_zone.enabled") {
            r.attributes.insert(
                "cross_zone_enabled".to_string(),
                attribute.value().unwrap_or("false").to_string(),
            );
        }
    }
    Ok(())
}

async fn list_classic(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .elb
        .describe_load_balancers()
        .send()
        .await
        .map_err(|e| classify("elasticloadbalancing:DescribeLoadBalancers", e))?;

    let mut out = Vec::new();
    for lb in resp.load_balancer_descriptions() {
        let Some(name) = lb.load_balancer_name() else { continue };
        let mut r = Resource::new(ResourceType::LoadBalancer, name, region);
        r.name = Some(name.to_string());
        r.sku = Some("classic".to_string());
        r.state = ResourceState::Available;
        r.created_at = lb.created_time().and_then(from_smithy_time);
        r.attributes
            .insert("listener_count".to_string(), lb.listener_descriptions().len().to_string());
        r.attributes.insert("target_count".to_string(), lb.instances().len().to_string());
        r.attributes.insert(
            "availability_zone_count".to_string(),
            lb.availability_zones().len().to_string(),
        );
        r.attributes.insert("metric_namespace".to_string(), "AWS/ELB".to_string());
        r.attributes.insert("metric_dimension_name".to_string(), "LoadBalancerName".to_string());
        r.attributes.insert("metric_dimension_value".to_string(), name.to_string());

        let health = clients
            .elb
            .describe_instance_health()
            .load_balancer_name(name)
            .send()
            .await
            .map_err(|e| classify("elasticloadbalancing:DescribeInstanceHealth", e))?;
        let healthy = health
            .instance_states()
            .iter()
            .filter(|s| s.state() == Some("InService"))
            .count();
        r.attributes.insert("healthy_target_count".to_string(), healthy.to_string());

        let attributes = clients
            .elb
            .describe_load_balancer_attributes()
            .load_balancer_name(name)
            .send()
            .await
            .map_err(|e| classify("elasticloadbalancing:DescribeLoadBalancerAttributes", e))?;
        if let Some(cross_zone) = attributes
            .load_balancer_attributes()
            .and_then(|a| a.cross_zone_load_balancing())
        {
            r.attributes
                .insert("cross_zone_enabled".to_string(), cross_zone.enabled().to_string());
        }
        out.push(r);
    }
    Ok(out)
}
