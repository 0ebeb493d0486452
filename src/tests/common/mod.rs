// Common test utilities: a deterministic in-memory cloud provider and
// fixture builders.

use crate::models::{
    AccountIdentity, GLOBAL_REGION, MetricQuery, MetricStat, Resource, ResourceState,
    ResourceType, TelemetrySample,
};
use crate::providers::{CloudProvider, ProviderError, Related, RelationKind};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// In-memory provider: inventories, metric samples, and relations are seeded
/// up front; every call is deterministic.
#[derive(Default)]
pub struct MockProvider {
    pub regions: Vec<String>,
    pub reject_credentials: bool,
    resources: HashMap<(String, ResourceType), Vec<Resource>>,
    metrics: HashMap<String, TelemetrySample>,
    related: HashMap<(RelationKind, String), Vec<Related>>,
    denied: HashSet<(String, ResourceType)>,
}

impl MockProvider {
    pub fn new(regions: &[&str]) -> Self {
        Self {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn add_resource(&mut self, resource: Resource) {
        let region = if resource.resource_type.is_global() {
            GLOBAL_REGION.to_string()
        } else {
            resource.region.clone()
        };
        self.resources
            .entry((region, resource.resource_type))
            .or_default()
            .push(resource);
    }

    /// Seed a metric sample, keyed the way `get_metric` resolves queries:
    /// metric name, last dimension value, and statistic.
    pub fn add_metric(
        &mut self,
        metric: &str,
        dimension_value: &str,
        stat: MetricStat,
        sample: TelemetrySample,
    ) {
        self.metrics
            .insert(metric_key(metric, dimension_value, stat), sample);
    }

    pub fn add_related(&mut self, relation: RelationKind, key: &str, items: Vec<Related>) {
        self.related.insert((relation, key.to_string()), items);
    }

    /// Make enumeration of one resource type in one region fail with an
    /// authorization error.
    pub fn deny(&mut self, region: &str, resource_type: ResourceType) {
        self.denied.insert((region.to_string(), resource_type));
    }
}

fn metric_key(metric: &str, dimension_value: &str, stat: MetricStat) -> String {
    format!("{metric}:{dimension_value}:{}", stat.as_str())
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn validate_credentials(&self) -> Result<AccountIdentity, ProviderError> {
        if self.reject_credentials {
            return Err(ProviderError::Auth("InvalidClientTokenId: key unknown".to_string()));
        }
        Ok(AccountIdentity {
            account_id: "123456789012".to_string(),
            principal: Some("arn:aws:iam::123456789012:user/scanner".to_string()),
        })
    }

    async fn list_regions(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.regions.clone())
    }

    async fn list_resources(
        &self,
        region: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<Resource>, ProviderError> {
        if self.denied.contains(&(region.to_string(), resource_type)) {
            return Err(ProviderError::Authorization {
                operation: format!("list {resource_type}"),
                message: "AccessDenied: not allowed".to_string(),
            });
        }
        let region = if resource_type.is_global() { GLOBAL_REGION } else { region };
        Ok(self
            .resources
            .get(&(region.to_string(), resource_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_metric(
        &self,
        _region: &str,
        query: &MetricQuery,
    ) -> Result<TelemetrySample, ProviderError> {
        let dimension_value = query
            .dimensions
            .last()
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        Ok(self
            .metrics
            .get(&metric_key(&query.metric, dimension_value, query.stat))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_related(
        &self,
        _region: &str,
        key: &str,
        relation: RelationKind,
    ) -> Result<Vec<Related>, ProviderError> {
        Ok(self
            .related
            .get(&(relation, key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// One datapoint per day over the window, all carrying `value`.
pub fn daily_sample(days: i64, value: f64) -> TelemetrySample {
    TelemetrySample::from_points(
        (1..=days).map(|d| (days_ago(d), value)).collect(),
    )
}

/// A single datapoint from yesterday.
pub fn scalar_sample(value: f64) -> TelemetrySample {
    TelemetrySample::from_points(vec![(days_ago(1), value)])
}

pub fn resource(
    resource_type: ResourceType,
    id: &str,
    region: &str,
    state: ResourceState,
    age_days: i64,
) -> Resource {
    let mut r = Resource::new(resource_type, id, region);
    r.state = state;
    r.created_at = Some(days_ago(age_days));
    r
}
