//! EC2-family inventory: instances, volumes, snapshots, routable addresses.

use super::{RegionClients, classify, ec2_tags, from_smithy_time, name_from_tags};
use crate::models::{Attachment, AttachmentKind, Resource, ResourceState, ResourceType};
use crate::providers::ProviderError;
use aws_sdk_ec2::types::Filter;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// EC2 embeds the stop/terminate time in the state transition reason, e.g.
/// "User initiated (2025-04-01 12:30:45 GMT)".
static TRANSITION_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) GMT\)").unwrap()
});

/// NAT gateway ids referenced from network-interface descriptions.
static NAT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"nat-[0-9a-f]+").unwrap());

pub(crate) fn parse_transition_time(reason: &str) -> Option<DateTime<Utc>> {
    let caps = TRANSITION_TIME_RE.captures(reason)?;
    chrono::NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) async fn list_instances(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.ec2.describe_instances().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let reservation = item.map_err(|e| classify("ec2:DescribeInstances", e))?;
        for instance in reservation.instances() {
            let Some(id) = instance.instance_id() else { continue };
            let state = match instance.state().and_then(|s| s.name()).map(|n| n.as_str()) {
                Some("running") => ResourceState::Running,
                Some("stopped" | "stopping" | "shutting-down") => ResourceState::Stopped,
                Some("pending") => ResourceState::Pending,
                // Terminated instances are on their way out, not waste.
                Some("terminated") => continue,
                _ => ResourceState::Unknown,
            };
            let mut r = Resource::new(ResourceType::Instance, id, region);
            r.state = state;
            r.tags = ec2_tags(instance.tags());
            r.name = name_from_tags(&r.tags);
            r.created_at = instance.launch_time().and_then(from_smithy_time);
            r.state_since = instance
                .state_transition_reason()
                .and_then(parse_transition_time);
            r.sku = instance.instance_type().map(|t| t.as_str().to_string());
            if let Some(image) = instance.image_id() {
                r.attributes.insert("image_id".to_string(), image.to_string());
            }
            if let Some(az) = instance.placement().and_then(|p| p.availability_zone()) {
                r.attributes.insert("availability_zone".to_string(), az.to_string());
            }
            if let Some(ip) = instance.public_ip_address() {
                r.attributes.insert("public_ip".to_string(), ip.to_string());
            }
            out.push(r);
        }
    }
    Ok(out)
}

pub(crate) async fn list_volumes(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.ec2.describe_volumes().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let volume = item.map_err(|e| classify("ec2:DescribeVolumes", e))?;
        let Some(id) = volume.volume_id() else { continue };
        let state = match volume.state().map(|s| s.as_str()) {
            Some("available") => ResourceState::Available,
            Some("in-use") => ResourceState::InUse,
            Some("error") => ResourceState::Error,
            Some("creating") => ResourceState::Pending,
            Some("deleted" | "deleting") => continue,
            _ => ResourceState::Unknown,
        };
        let mut r = Resource::new(ResourceType::Volume, id, region);
        r.state = state;
        r.tags = ec2_tags(volume.tags());
        r.name = name_from_tags(&r.tags);
        r.created_at = volume.create_time().and_then(from_smithy_time);
        r.sku = volume.volume_type().map(|t| t.as_str().to_string());
        r.size_gb = volume.size().map(f64::from);
        r.provisioned_iops = volume.iops().map(f64::from);
        r.provisioned_throughput_mbps = volume.throughput().map(f64::from);
        if let Some(az) = volume.availability_zone() {
            r.attributes.insert("availability_zone".to_string(), az.to_string());
        }
        for attachment in volume.attachments() {
            if let Some(instance_id) = attachment.instance_id() {
                r.attachments.push(Attachment {
                    kind: AttachmentKind::Instance,
                    target_id: instance_id.to_string(),
                });
            }
        }
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_snapshots(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients
        .ec2
        .describe_snapshots()
        .owner_ids("self")
        .into_paginator()
        .items()
        .send();
    while let Some(item) = pages.next().await {
        let snapshot = item.map_err(|e| classify("ec2:DescribeSnapshots", e))?;
        let Some(id) = snapshot.snapshot_id() else { continue };
        let state = match snapshot.state().map(|s| s.as_str()) {
            Some("completed") => ResourceState::Available,
            Some("pending") => ResourceState::Pending,
            Some("error") => ResourceState::Error,
            _ => ResourceState::Unknown,
        };
        let mut r = Resource::new(ResourceType::Snapshot, id, region);
        r.state = state;
        r.tags = ec2_tags(snapshot.tags());
        r.name = name_from_tags(&r.tags);
        r.created_at = snapshot.start_time().and_then(from_smithy_time);
        r.size_gb = snapshot.volume_size().map(f64::from);
        if let Some(desc) = snapshot.description() {
            if !desc.is_empty() {
                r.attributes.insert("description".to_string(), desc.to_string());
            }
        }
        // The magic all-f volume id marks snapshots copied from images.
        if let Some(volume_id) = snapshot.volume_id() {
            if !volume_id.ends_with("ffffffff") {
                r.attachments.push(Attachment {
                    kind: AttachmentKind::SourceVolume,
                    target_id: volume_id.to_string(),
                });
            }
        }
        out.push(r);
    }

    annotate_image_snapshots(clients, &mut out).await?;
    Ok(out)
}

/// Mark snapshots that back self-owned machine images so the unused-image
/// scenario can cross-reference them against instance launches.
async fn annotate_image_snapshots(
    clients: &RegionClients,
    snapshots: &mut [Resource],
) -> Result<(), ProviderError> {
    let resp = clients
        .ec2
        .describe_images()
        .owners("self")
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeImages", e))?;
    for image in resp.images() {
        let Some(image_id) = image.image_id() else { continue };
        for mapping in image.block_device_mappings() {
            let Some(snapshot_id) = mapping.ebs().and_then(|e| e.snapshot_id()) else {
                continue;
            };
            if let Some(snapshot) = snapshots.iter_mut().find(|s| s.id == snapshot_id) {
                snapshot
                    .attributes
                    .insert("image_id".to_string(), image_id.to_string());
                if let Some(created) = image.creation_date() {
                    snapshot
                        .attributes
                        .insert("image_creation_date".to_string(), created.to_string());
                }
                snapshot.attachments.push(Attachment {
                    kind: AttachmentKind::SourceImage,
                    target_id: image_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

pub(crate) async fn list_addresses(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .ec2
        .describe_addresses()
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeAddresses", e))?;

    let mut out = Vec::new();
    let mut interface_ids = Vec::new();
    for address in resp.addresses() {
        let Some(id) = address.allocation_id() else { continue };
        let mut r = Resource::new(ResourceType::PublicIp, id, region);
        // Address allocations expose no creation time.
        r.state = if address.association_id().is_some() {
            ResourceState::InUse
        } else {
            ResourceState::Available
        };
        r.tags = ec2_tags(address.tags());
        r.name = name_from_tags(&r.tags);
        if let Some(ip) = address.public_ip() {
            r.attributes.insert("public_ip".to_string(), ip.to_string());
        }
        if let Some(instance_id) = address.instance_id() {
            r.attachments.push(Attachment {
                kind: AttachmentKind::Instance,
                target_id: instance_id.to_string(),
            });
        }
        if let Some(eni) = address.network_interface_id() {
            interface_ids.push(eni.to_string());
            r.attachments.push(Attachment {
                kind: AttachmentKind::NetworkInterface,
                target_id: eni.to_string(),
            });
        }
        out.push(r);
    }

    annotate_interfaces(clients, &interface_ids, &mut out).await?;
    Ok(out)
}

/// Enrich addresses with the status of the network interface they point at:
/// whether the interface is itself attached, and the NAT gateway behind it.
async fn annotate_interfaces(
    clients: &RegionClients,
    interface_ids: &[String],
    addresses: &mut [Resource],
) -> Result<(), ProviderError> {
    if interface_ids.is_empty() {
        return Ok(());
    }
    let resp = clients
        .ec2
        .describe_network_interfaces()
        .filters(
            Filter::builder()
                .name("network-interface-id")
                .set_values(Some(interface_ids.to_vec()))
                .build(),
        )
        .send()
        .await
        .map_err(|e| classify("ec2:DescribeNetworkInterfaces", e))?;

    for interface in resp.network_interfaces() {
        let Some(eni_id) = interface.network_interface_id() else { continue };
        let attached = interface
            .attachment()
            .and_then(|a| a.instance_id())
            .is_some()
            || interface
                .interface_type()
                .map(|t| t.as_str() != "interface")
                .unwrap_or(false);
        let nat_id = interface
            .description()
            .and_then(|d| NAT_ID_RE.find(d))
            .map(|m| m.as_str().to_string());
        for address in addresses.iter_mut() {
            if address.attachment(AttachmentKind::NetworkInterface) == Some(eni_id) {
                address
                    .attributes
                    .insert("interface_attached".to_string(), attached.to_string());
                if let Some(nat) = &nat_id {
                    address.attachments.push(Attachment {
                        kind: AttachmentKind::NatGateway,
                        target_id: nat.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transition_time() {
        let reason = "User initiated (2025-04-01 12:30:45 GMT)";
        let parsed = parse_transition_time(reason).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-04-01T12:30:45+00:00");
    }

    #[test]
    fn test_parse_transition_time_absent() {
        assert!(parse_transition_time("Client.UserInitiatedShutdown").is_none());
    }
}
