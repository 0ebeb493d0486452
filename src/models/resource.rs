//! Resource inventory value objects.
//!
//! A `Resource` is one entry of the per-region, per-type inventory the
//! orchestrator materializes before scenarios run. The shape is deliberately
//! provider-agnostic: identity, lifecycle, shape/SKU, tags, and attachment
//! pointers, with a string attribute map for per-type details that have no
//! universal field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel region for account-scoped resources (object store buckets).
pub const GLOBAL_REGION: &str = "global";

/// Closed vocabulary of resource categories the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Volume,
    PublicIp,
    Snapshot,
    Instance,
    NatGateway,
    LoadBalancer,
    Database,
    GraphDatabase,
    DocumentDatabase,
    CacheCluster,
    WarehouseCluster,
    SearchDomain,
    Stream,
    Bucket,
    Function,
    ServerlessTable,
    FileSystem,
    VpnConnection,
    TransitAttachment,
    VpcEndpoint,
}

impl ResourceType {
    /// Every resource type, in scan order. Types that other scenarios
    /// cross-reference (instances, volumes) come first so their inventories
    /// are already cached when dependents run.
    pub const ALL: [ResourceType; 20] = [
        ResourceType::Instance,
        ResourceType::Volume,
        ResourceType::Snapshot,
        ResourceType::PublicIp,
        ResourceType::NatGateway,
        ResourceType::LoadBalancer,
        ResourceType::Database,
        ResourceType::GraphDatabase,
        ResourceType::DocumentDatabase,
        ResourceType::CacheCluster,
        ResourceType::WarehouseCluster,
        ResourceType::SearchDomain,
        ResourceType::Stream,
        ResourceType::Function,
        ResourceType::ServerlessTable,
        ResourceType::FileSystem,
        ResourceType::VpnConnection,
        ResourceType::TransitAttachment,
        ResourceType::VpcEndpoint,
        ResourceType::Bucket,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Volume => "volume",
            ResourceType::PublicIp => "public_ip",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Instance => "instance",
            ResourceType::NatGateway => "nat_gateway",
            ResourceType::LoadBalancer => "load_balancer",
            ResourceType::Database => "database",
            ResourceType::GraphDatabase => "graph_database",
            ResourceType::DocumentDatabase => "document_database",
            ResourceType::CacheCluster => "cache_cluster",
            ResourceType::WarehouseCluster => "warehouse_cluster",
            ResourceType::SearchDomain => "search_domain",
            ResourceType::Stream => "stream",
            ResourceType::Bucket => "bucket",
            ResourceType::Function => "function",
            ResourceType::ServerlessTable => "serverless_table",
            ResourceType::FileSystem => "file_system",
            ResourceType::VpnConnection => "vpn_connection",
            ResourceType::TransitAttachment => "transit_attachment",
            ResourceType::VpcEndpoint => "vpc_endpoint",
        }
    }

    pub fn parse(s: &str) -> Option<ResourceType> {
        ResourceType::ALL.iter().copied().find(|rt| rt.as_str() == s)
    }

    /// Account-scoped types are enumerated once per scan, not once per region.
    pub fn is_global(self) -> bool {
        matches!(self, ResourceType::Bucket)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized lifecycle state across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Exists but is not attached/serving (e.g. an available volume).
    Available,
    InUse,
    Running,
    Stopped,
    Pending,
    Error,
    #[default]
    Unknown,
}

/// What an attachment pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Instance,
    NetworkInterface,
    NatGateway,
    Vpc,
    Subnet,
    SourceVolume,
    SourceImage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub target_id: String,
}

/// One live resource, as enumerated by the provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub region: String,
    pub state: ResourceState,
    /// Creation time when the provider exposes one; some resources
    /// (e.g. routable addresses) have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the resource entered its current state, parsed from the
    /// provider's state-transition reason where available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_since: Option<DateTime<Utc>>,
    /// Shape / SKU / instance class ("gp3", "m5.large", "application").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_iops: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput_mbps: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Per-type details without a universal field (availability zone, VPC id,
    /// engine version, listener counts, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(resource_type: ResourceType, id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
            name: None,
            region: region.into(),
            state: ResourceState::Unknown,
            created_at: None,
            state_since: None,
            sku: None,
            size_gb: None,
            provisioned_iops: None,
            provisioned_throughput_mbps: None,
            tags: BTreeMap::new(),
            attachments: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Case-insensitive tag lookup.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// First attachment of the given kind, if any.
    pub fn attachment(&self, kind: AttachmentKind) -> Option<&str> {
        self.attachments
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.target_id.as_str())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attr(key).and_then(|v| v.parse().ok())
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attr(key).and_then(|v| v.parse().ok())
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attr(key).map(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Age in whole days; zero when the provider exposes no creation time.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        self.created_at
            .map(|c| (now - c).num_days().max(0))
            .unwrap_or(0)
    }

    /// Days spent in the current state, when the transition time is known.
    pub fn state_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.state_since.map(|s| (now - s).num_days().max(0))
    }

    /// True when any of the given tag keys carries any of the given values
    /// (both sides case-insensitive). Used for environment markers.
    pub fn tag_value_in(&self, keys: &[String], values: &[String]) -> bool {
        keys.iter().any(|key| {
            self.tag(key)
                .map(|v| values.iter().any(|want| want.eq_ignore_ascii_case(v)))
                .unwrap_or(false)
        })
    }

    /// True when any tag key or value matches one of the markers
    /// (case-insensitive substring on keys, exact on values).
    pub fn tag_marker_present(&self, markers: &[String]) -> bool {
        self.tags.iter().any(|(k, v)| {
            markers.iter().any(|m| {
                k.to_ascii_lowercase().contains(&m.to_ascii_lowercase())
                    || m.eq_ignore_ascii_case(v)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_round_trip() {
        for rt in ResourceType::ALL {
            assert_eq!(ResourceType::parse(rt.as_str()), Some(rt));
        }
    }

    #[test]
    fn test_tag_lookup_is_case_insensitive() {
        let mut r = Resource::new(ResourceType::Volume, "vol-1", "us-east-1");
        r.tags.insert("Environment".to_string(), "Dev".to_string());
        assert_eq!(r.tag("environment"), Some("Dev"));
        assert!(r.tag_value_in(
            &["Environment".to_string()],
            &["dev".to_string(), "qa".to_string()]
        ));
    }

    #[test]
    fn test_age_days_without_creation_time() {
        let r = Resource::new(ResourceType::PublicIp, "eipalloc-1", "us-east-1");
        assert_eq!(r.age_days(Utc::now()), 0);
    }
}
