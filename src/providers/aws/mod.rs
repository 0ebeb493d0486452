//! AWS adapter: thin, typed façade over the AWS SDK.
//!
//! One `AwsProvider` serves every region; per-region service clients are
//! built lazily from the shared base config and cached for the lifetime of
//! the provider. Timeouts and bounded retry are configured once on the base
//! config, so every SDK call inherits them.

mod compute;
mod datastores;
mod loadbalancer;
mod metrics;
mod network;
mod serverless;
mod storage;

use crate::models::{
    AccountIdentity, GLOBAL_REGION, MetricQuery, Resource, ResourceType, TelemetrySample,
};
use crate::providers::{
    AdapterConfig, CloudProvider, ProviderError, Related, RelationKind,
};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::config::Credentials;
use aws_sdk_sts::error::{ProvideErrorMetadata, SdkError};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Home region for account-scoped calls (identity, region enumeration,
/// bucket listing).
const HOME_REGION: &str = "us-east-1";

/// Already-resolved static credentials handed in by the caller. `None`
/// falls back to the ambient credential chain.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Per-region service clients, built once and cached.
pub(crate) struct RegionClients {
    pub ec2: aws_sdk_ec2::Client,
    pub cloudwatch: aws_sdk_cloudwatch::Client,
    pub elb: aws_sdk_elasticloadbalancing::Client,
    pub elbv2: aws_sdk_elasticloadbalancingv2::Client,
    pub rds: aws_sdk_rds::Client,
    pub neptune: aws_sdk_neptune::Client,
    pub docdb: aws_sdk_docdb::Client,
    pub elasticache: aws_sdk_elasticache::Client,
    pub redshift: aws_sdk_redshift::Client,
    pub opensearch: aws_sdk_opensearch::Client,
    pub kinesis: aws_sdk_kinesis::Client,
    pub fsx: aws_sdk_fsx::Client,
    pub lambda: aws_sdk_lambda::Client,
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub s3: aws_sdk_s3::Client,
}

pub struct AwsProvider {
    shared: SdkConfig,
    clients: DashMap<String, Arc<RegionClients>>,
}

impl AwsProvider {
    /// Build the provider from resolved credentials and adapter settings.
    pub async fn connect(
        credentials: Option<StaticCredentials>,
        adapter: AdapterConfig,
    ) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(adapter.connect_timeout)
            .read_timeout(adapter.read_timeout)
            .build();
        let retries = RetryConfig::standard().with_max_attempts(adapter.max_attempts);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(timeouts)
            .retry_config(retries);
        if let Some(creds) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                creds.session_token,
                None,
                "cloudsweep",
            ));
        }
        let shared = loader.load().await;
        Self { shared, clients: DashMap::new() }
    }

    pub(crate) fn region(&self, region: &str) -> Arc<RegionClients> {
        if let Some(existing) = self.clients.get(region) {
            return existing.clone();
        }
        let r = Region::new(region.to_string());
        let clients = Arc::new(RegionClients {
            ec2: aws_sdk_ec2::Client::from_conf(
                aws_sdk_ec2::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            cloudwatch: aws_sdk_cloudwatch::Client::from_conf(
                aws_sdk_cloudwatch::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            elb: aws_sdk_elasticloadbalancing::Client::from_conf(
                aws_sdk_elasticloadbalancing::config::Builder::from(&self.shared)
                    .region(r.clone())
                    .build(),
            ),
            elbv2: aws_sdk_elasticloadbalancingv2::Client::from_conf(
                aws_sdk_elasticloadbalancingv2::config::Builder::from(&self.shared)
                    .region(r.clone())
                    .build(),
            ),
            rds: aws_sdk_rds::Client::from_conf(
                aws_sdk_rds::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            neptune: aws_sdk_neptune::Client::from_conf(
                aws_sdk_neptune::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            docdb: aws_sdk_docdb::Client::from_conf(
                aws_sdk_docdb::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            elasticache: aws_sdk_elasticache::Client::from_conf(
                aws_sdk_elasticache::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            redshift: aws_sdk_redshift::Client::from_conf(
                aws_sdk_redshift::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            opensearch: aws_sdk_opensearch::Client::from_conf(
                aws_sdk_opensearch::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            kinesis: aws_sdk_kinesis::Client::from_conf(
                aws_sdk_kinesis::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            fsx: aws_sdk_fsx::Client::from_conf(
                aws_sdk_fsx::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            lambda: aws_sdk_lambda::Client::from_conf(
                aws_sdk_lambda::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            dynamodb: aws_sdk_dynamodb::Client::from_conf(
                aws_sdk_dynamodb::config::Builder::from(&self.shared).region(r.clone()).build(),
            ),
            s3: aws_sdk_s3::Client::from_conf(
                aws_sdk_s3::config::Builder::from(&self.shared).region(r).build(),
            ),
        });
        self.clients.insert(region.to_string(), clients.clone());
        clients
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn validate_credentials(&self) -> Result<AccountIdentity, ProviderError> {
        let sts = aws_sdk_sts::Client::from_conf(
            aws_sdk_sts::config::Builder::from(&self.shared)
                .region(Region::new(HOME_REGION))
                .build(),
        );
        let resp = sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| classify("sts:GetCallerIdentity", e))?;
        Ok(AccountIdentity {
            account_id: resp.account().unwrap_or_default().to_string(),
            principal: resp.arn().map(str::to_string),
        })
    }

    async fn list_regions(&self) -> Result<Vec<String>, ProviderError> {
        let clients = self.region(HOME_REGION);
        let resp = clients
            .ec2
            .describe_regions()
            .send()
            .await
            .map_err(|e| classify("ec2:DescribeRegions", e))?;
        let mut regions: Vec<String> = resp
            .regions()
            .iter()
            .filter_map(|r| r.region_name().map(str::to_string))
            .collect();
        regions.sort();
        Ok(regions)
    }

    async fn list_resources(
        &self,
        region: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, ProviderError> {
        let clients = if resource_type.is_global() {
            self.region(HOME_REGION)
        } else {
            self.region(region)
        };
        match resource_type {
            ResourceType::Instance => compute::list_instances(&clients, region).await,
            ResourceType::Volume => compute::list_volumes(&clients, region).await,
            ResourceType::Snapshot => compute::list_snapshots(&clients, region).await,
            ResourceType::PublicIp => compute::list_addresses(&clients, region).await,
            ResourceType::NatGateway => network::list_nat_gateways(&clients, region).await,
            ResourceType::VpnConnection => network::list_vpn_connections(&clients, region).await,
            ResourceType::TransitAttachment => {
                network::list_transit_attachments(&clients, region).await
            }
            ResourceType::VpcEndpoint => network::list_vpc_endpoints(&clients, region).await,
            ResourceType::LoadBalancer => {
                loadbalancer::list_load_balancers(&clients, region).await
            }
            ResourceType::Database => datastores::list_databases(&clients, region).await,
            ResourceType::GraphDatabase => {
                datastores::list_graph_databases(&clients, region).await
            }
            ResourceType::DocumentDatabase => {
                datastores::list_document_databases(&clients, region).await
            }
            ResourceType::CacheCluster => datastores::list_cache_clusters(&clients, region).await,
            ResourceType::WarehouseCluster => {
                datastores::list_warehouse_clusters(&clients, region).await
            }
            ResourceType::SearchDomain => datastores::list_search_domains(&clients, region).await,
            ResourceType::Stream => datastores::list_streams(&clients, region).await,
            ResourceType::FileSystem => datastores::list_file_systems(&clients, region).await,
            ResourceType::Function => serverless::list_functions(&clients, region).await,
            ResourceType::ServerlessTable => serverless::list_tables(&clients, region).await,
            ResourceType::Bucket => storage::list_buckets(&clients, GLOBAL_REGION).await,
        }
    }

    async fn get_metric(
        &self,
        region: &str,
        query: &MetricQuery,
    ) -> Result<TelemetrySample, ProviderError> {
        metrics::get_metric(&self.region(region), query).await
    }

    async fn list_related(
        &self,
        region: &str,
        key: &str,
        relation: RelationKind,
    ) -> Result<Vec<Related>, ProviderError> {
        let clients = self.region(region);
        match relation {
            RelationKind::NatRouteTables => {
                network::route_tables_for_nat(&clients, key).await
            }
            RelationKind::SubnetRouteTables => {
                network::route_tables_for_subnet(&clients, key).await
            }
            RelationKind::InternetGateways => {
                network::internet_gateways_for_vpc(&clients, key).await
            }
            RelationKind::VpcEndpoints => network::vpc_endpoints_for_vpc(&clients, key).await,
            RelationKind::Shards => datastores::shards_for_stream(&clients, key).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared mapping helpers
// ---------------------------------------------------------------------------

/// Map an SDK failure onto the adapter error taxonomy. DNS, TCP, TLS,
/// authentication, and authorization failures each yield a distinct kind.
pub(crate) fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
    R: std::fmt::Debug,
{
    let op = operation.to_string();
    match err {
        SdkError::TimeoutError(_) => ProviderError::Timeout(op),
        SdkError::DispatchFailure(failure) => {
            if failure.is_timeout() {
                return ProviderError::Timeout(op);
            }
            let message = failure
                .as_connector_error()
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("{failure:?}"));
            let lower = message.to_ascii_lowercase();
            if lower.contains("dns") || lower.contains("resolve") {
                ProviderError::Dns(message)
            } else if lower.contains("tls")
                || lower.contains("certificate")
                || lower.contains("handshake")
            {
                ProviderError::Tls(message)
            } else {
                ProviderError::Connect(message)
            }
        }
        SdkError::ServiceError(ctx) => {
            let code = ctx.err().code().unwrap_or_default().to_string();
            let message = ctx.err().message().unwrap_or_default().to_string();
            match code.as_str() {
                "AuthFailure" | "InvalidClientTokenId" | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch" | "UnrecognizedClientException" | "ExpiredToken"
                | "ExpiredTokenException" => {
                    ProviderError::Auth(format!("{code}: {message}"))
                }
                "UnauthorizedOperation" | "AccessDenied" | "AccessDeniedException"
                | "NotAuthorized" | "AuthorizationError" | "OptInRequired" => {
                    ProviderError::Authorization { operation: op, message: format!("{code}: {message}") }
                }
                "Throttling" | "ThrottlingException" | "RequestLimitExceeded"
                | "TooManyRequestsException" | "SlowDown"
                | "ProvisionedThroughputExceededException" => {
                    ProviderError::Throttled { operation: op, message: format!("{code}: {message}") }
                }
                "RequestTimeout" | "RequestTimeoutException" => ProviderError::Timeout(op),
                _ => ProviderError::Api { operation: op, message: format!("{code}: {message}") },
            }
        }
        other => ProviderError::Api { operation: op, message: format!("{other:?}") },
    }
}

pub(crate) fn to_smithy_time(t: chrono::DateTime<chrono::Utc>) -> aws_sdk_cloudwatch::primitives::DateTime {
    aws_sdk_cloudwatch::primitives::DateTime::from_millis(t.timestamp_millis())
}

pub(crate) fn from_smithy_time(
    t: &aws_sdk_cloudwatch::primitives::DateTime,
) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::<chrono::Utc>::from_timestamp(t.secs(), t.subsec_nanos())
}

/// Collect EC2-style tags into the resource tag map.
pub(crate) fn ec2_tags(tags: &[aws_sdk_ec2::types::Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|t| match (t.key(), t.value()) {
            (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}

/// The `Name` tag, when present.
pub(crate) fn name_from_tags(tags: &BTreeMap<String, String>) -> Option<String> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("name"))
        .map(|(_, v)| v.clone())
}
