// Provider Adapter Module
// Purpose: narrow, provider-agnostic contract over one cloud's SDK
// Design: scenarios never see raw SDK errors; everything surfaces as typed values

pub mod aws;

pub use aws::AwsProvider;

use crate::models::{AccountIdentity, MetricQuery, Resource, ResourceType, TelemetrySample};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Typed adapter failures. Diagnostic kinds are deliberately distinct:
/// the operator messages for "bad key", "no permission", and "cannot reach
/// the endpoint" differ materially.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credentials rejected: {0}")]
    Auth(String),
    #[error("not authorized to {operation}: {message}")]
    Authorization { operation: String, message: String },
    #[error("throttled on {operation}: {message}")]
    Throttled { operation: String, message: String },
    #[error("timed out on {0}")]
    Timeout(String),
    #[error("dns resolution failed: {0}")]
    Dns(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("tls negotiation failed: {0}")]
    Tls(String),
    #[error("unexpected response shape from {operation}: {message}")]
    Malformed { operation: String, message: String },
    #[error("provider api error on {operation}: {message}")]
    Api { operation: String, message: String },
}

impl ProviderError {
    /// Only credential failures abort a whole scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }

    /// Authorization misses skip one resource type in one region.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ProviderError::Authorization { .. })
    }
}

/// Connection behavior for a provider adapter. Retries use the SDK's
/// standard exponential backoff, bounded by `max_attempts`.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_attempts: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

/// Relations that scenarios can traverse from a resource. Results are
/// cached per (region, scan) by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Route tables whose routes reference the given NAT gateway.
    NatRouteTables,
    /// Route tables associated with the given subnet.
    SubnetRouteTables,
    /// Internet gateways attached to the given VPC.
    InternetGateways,
    /// Gateway endpoints present in the given VPC.
    VpcEndpoints,
    /// Open shards/partitions of the given stream.
    Shards,
}

/// A related entity: identity plus the attributes the relation exposes.
#[derive(Debug, Clone, Default)]
pub struct Related {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

impl Related {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attr(key).and_then(|v| v.parse().ok())
    }

    pub fn attr_bool(&self, key: &str) -> bool {
        self.attr(key).map(|v| v == "true").unwrap_or(false)
    }
}

/// Unified interface every cloud backend implements. Paging, regional
/// endpoints, timeouts, and bounded retry live behind this boundary.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Probe a low-cost identity endpoint to verify the credentials.
    async fn validate_credentials(&self) -> Result<AccountIdentity, ProviderError>;

    /// Every region the account can address.
    async fn list_regions(&self) -> Result<Vec<String>, ProviderError>;

    /// Fully-materialized enumeration of one resource type in one region.
    async fn list_resources(
        &self,
        region: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, ProviderError>;

    /// Windowed metric query against the monitoring subsystem. Absent data
    /// yields the zero sample, never an error.
    async fn get_metric(
        &self,
        region: &str,
        query: &MetricQuery,
    ) -> Result<TelemetrySample, ProviderError>;

    /// Entities related to `key` under the given relation (see
    /// `RelationKind` for what `key` means per relation).
    async fn list_related(
        &self,
        region: &str,
        key: &str,
        relation: RelationKind,
    ) -> Result<Vec<Related>, ProviderError>;
}
