//! VPC-side inventory and relations: NAT gateways, VPN connections, transit
//! attachments, VPC endpoints, route tables, internet gateways.

use super::{RegionClients, classify, ec2_tags, from_smithy_time, name_from_tags};
use crate::models::{Attachment, AttachmentKind, Resource, ResourceState, ResourceType};
use crate::providers::{ProviderError, Related};
use aws_sdk_ec2::types::Filter;

pub(crate) async fn list_nat_gateways(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.ec2.describe_nat_gateways().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let nat = item.map_err(|e| classify("ec2:DescribeNatGateways", e))?;
        let Some(id) = nat.nat_gateway_id() else { continue };
        let state = match nat.state().map(|s| s.as_str()) {
            Some("available") => ResourceState::Available,
            Some("pending") => ResourceState::Pending,
            Some("failed") => ResourceState::Error,
            Some("deleted" | "deleting") => continue,
            _ => ResourceState::Unknown,
        };
        let mut r = Resource::new(ResourceType::NatGateway, id, region);
        r.state = state;
        r.tags = ec2_tags(nat.tags());
        r.name = name_from_tags(&r.tags);
        r.created_at = nat.create_time().and_then(from_smithy_time);
        if let Some(subnet) = nat.subnet_id() {
            r.attachments.push(Attachment {
                kind: AttachmentKind::Subnet,
                target_id: subnet.to_string(),
            });
        }
        if let Some(vpc) = nat.vpc_id() {
            r.attachments.push(Attachment { kind: AttachmentKind::Vpc, target_id: vpc.to_string() });
        }
        if let Some(address) = nat.nat_gateway_addresses().first() {
            if let Some(ip) = address.public_ip() {
                r.attributes.insert("public_ip".to_string(), ip.to_string());
            }
        }
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_vpn_connections(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .ec2
        .describe_vpn_connections()
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeVpnConnections", e))?;
    let mut out = Vec::new();
    for vpn in resp.vpn_connections() {
        let Some(id) = vpn.vpn_connection_id() else { continue };
        let mut r = Resource::new(ResourceType::VpnConnection, id, region);
        r.state = match vpn.state().map(|s| s.as_str()) {
            Some("available") => ResourceState::Available,
            Some("pending") => ResourceState::Pending,
            Some("deleted" | "deleting") => continue,
            _ => ResourceState::Unknown,
        };
        r.tags = ec2_tags(vpn.tags());
        r.name = name_from_tags(&r.tags);
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_transit_attachments(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients
        .ec2
        .describe_transit_gateway_attachments()
        .into_paginator()
        .items()
        .send();
    while let Some(item) = pages.next().await {
        let attachment = item.map_err(|e| classify("ec2:DescribeTransitGatewayAttachments", e))?;
        let Some(id) = attachment.transit_gateway_attachment_id() else { continue };
        let mut r = Resource::new(ResourceType::TransitAttachment, id, region);
        r.state = match attachment.state().map(|s| s.as_str()) {
            Some("available") => ResourceState::Available,
            Some("pending" | "pendingAcceptance" | "initiating") => ResourceState::Pending,
            Some("deleted" | "deleting") => continue,
            _ => ResourceState::Unknown,
        };
        r.tags = ec2_tags(attachment.tags());
        r.name = name_from_tags(&r.tags);
        r.created_at = attachment.creation_time().and_then(from_smithy_time);
        if let Some(kind) = attachment.resource_type() {
            r.attributes.insert("attached_resource_type".to_string(), kind.as_str().to_string());
        }
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_vpc_endpoints(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.ec2.describe_vpc_endpoints().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let endpoint = item.map_err(|e| classify("ec2:DescribeVpcEndpoints", e))?;
        let Some(id) = endpoint.vpc_endpoint_id() else { continue };
        let mut r = Resource::new(ResourceType::VpcEndpoint, id, region);
        r.state = match endpoint.state().map(|s| s.as_str()) {
            Some("available" | "Available") => ResourceState::Available,
            Some("pending" | "pendingAcceptance" | "Pending" | "PendingAcceptance") => {
                ResourceState::Pending
            }
            Some("deleted" | "deleting" | "Deleted" | "Deleting") => continue,
            Some("failed" | "rejected" | "expired" | "Failed" | "Rejected" | "Expired") => {
                ResourceState::Error
            }
            _ => ResourceState::Unknown,
        };
        r.tags = ec2_tags(endpoint.tags());
        r.name = name_from_tags(&r.tags);
        r.created_at = endpoint.creation_timestamp().and_then(from_smithy_time);
        if let Some(service) = endpoint.service_name() {
            r.attributes.insert("service_name".to_string(), service.to_string());
        }
        if let Some(kind) = endpoint.vpc_endpoint_type() {
            r.attributes.insert("endpoint_type".to_string(), kind.as_str().to_string());
        }
        r.attributes.insert(
            "network_interface_count".to_string(),
            endpoint.network_interface_ids().len().to_string(),
        );
        if let Some(vpc) = endpoint.vpc_id() {
            r.attachments.push(Attachment { kind: AttachmentKind::Vpc, target_id: vpc.to_string() });
        }
        out.push(r);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

pub(crate) async fn route_tables_for_nat(
    clients: &RegionClients,
    nat_id: &str,
) -> Result<Vec<Related>, ProviderError> {
    let resp = clients
        .ec2
        .describe_route_tables()
        .filters(Filter::builder().name("route.nat-gateway-id").values(nat_id).build())
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeRouteTables", e))?;
    Ok(resp
        .route_tables()
        .iter()
        .filter_map(|rt| {
            let id = rt.route_table_id()?.to_string();
            let mut related = Related { id, ..Default::default() };
            let subnet_associations = rt
                .associations()
                .iter()
                .filter(|a| a.subnet_id().is_some())
                .count();
            related
                .attributes
                .insert("subnet_association_count".to_string(), subnet_associations.to_string());
            if let Some(vpc) = rt.vpc_id() {
                related.attributes.insert("vpc_id".to_string(), vpc.to_string());
            }
            Some(related)
        })
        .collect())
}

pub(crate) async fn route_tables_for_subnet(
    clients: &RegionClients,
    subnet_id: &str,
) -> Result<Vec<Related>, ProviderError> {
    let resp = clients
        .ec2
        .describe_route_tables()
        .filters(Filter::builder().name("association.subnet-id").values(subnet_id).build())
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeRouteTables", e))?;
    Ok(resp
        .route_tables()
        .iter()
        .filter_map(|rt| {
            let id = rt.route_table_id()?.to_string();
            let has_igw_route = rt.routes().iter().any(|route| {
                route.gateway_id().map(|g| g.starts_with("igw-")).unwrap_or(false)
            });
            let mut related = Related { id, ..Default::default() };
            related
                .attributes
                .insert("has_igw_route".to_string(), has_igw_route.to_string());
            Some(related)
        })
        .collect())
}

pub(crate) async fn internet_gateways_for_vpc(
    clients: &RegionClients,
    vpc_id: &str,
) -> Result<Vec<Related>, ProviderError> {
    let resp = clients
        .ec2
        .describe_internet_gateways()
        .filters(Filter::builder().name("attachment.vpc-id").values(vpc_id).build())
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeInternetGateways", e))?;
    Ok(resp
        .internet_gateways()
        .iter()
        .filter_map(|igw| {
            Some(Related { id: igw.internet_gateway_id()?.to_string(), ..Default::default() })
        })
        .collect())
}

pub(crate) async fn vpc_endpoints_for_vpc(
    clients: &RegionClients,
    vpc_id: &str,
) -> Result<Vec<Related>, ProviderError> {
    let resp = clients
        .ec2
        .describe_vpc_endpoints()
        .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeVpcEndpoints", e))?;
    Ok(resp
        .vpc_endpoints()
        .iter()
        .filter_map(|endpoint| {
            let id = endpoint.vpc_endpoint_id()?.to_string();
            let mut related = Related { id, ..Default::default() };
            if let Some(service) = endpoint.service_name() {
                related.attributes.insert("service_name".to_string(), service.to_string());
            }
            Some(related)
        })
        .collect())
}
