//! Waste-detection scenario catalog.
//!
//! A scenario is a named detector for one class of waste on one resource
//! type. Its contract: honor `rules.enabled` and its own `detect_*` flag,
//! short-circuit on insufficient age, consult telemetry only when its rules
//! require it, and emit one finding per affected resource. It must not
//! mutate inventory, retry network calls (the adapter does that), or raise
//! on "no signal" — it returns an empty list.

pub mod bucket;
pub mod cache;
pub mod database;
pub mod file_system;
pub mod function;
pub mod instance;
pub mod load_balancer;
pub mod nat_gateway;
pub mod network_edge;
pub mod public_ip;
pub mod snapshot;
pub mod stream;
pub mod support;
pub mod table;
pub mod volume;
pub mod warehouse;

use crate::engine::confidence;
use crate::engine::orchestrator::RegionData;
use crate::models::{
    Confidence, Finding, MetricQuery, Resource, ResourceType, TelemetrySample,
};
use crate::pricing::PricingCatalog;
use crate::providers::{ProviderError, Related, RelationKind};
use crate::rules::ResolvedRules;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Everything a scenario can see while it runs: the materialized inventory
/// of its own resource type, its resolved rules, pricing, and the shared
/// per-region caches for telemetry, relations, and sibling inventories.
pub struct ScenarioContext<'a> {
    pub region: &'a str,
    pub resources: &'a [Resource],
    pub rules: &'a ResolvedRules,
    pub pricing: &'a PricingCatalog,
    pub now: DateTime<Utc>,
    pub(crate) data: &'a RegionData,
}

impl ScenarioContext<'_> {
    pub fn age_days(&self, resource: &Resource) -> i64 {
        resource.age_days(self.now)
    }

    /// Ladder lookup against this resource type's thresholds.
    pub fn confidence_for_age(&self, age_days: i64) -> Confidence {
        confidence::for_age(age_days, self.rules)
    }

    /// Cached metric query; the zero sample means "no data".
    pub async fn metric(&self, query: MetricQuery) -> Result<TelemetrySample, ProviderError> {
        self.data.metric(&query).await
    }

    /// Cached inventory of another resource type in this region.
    pub async fn inventory(
        &self,
        resource_type: ResourceType,
    ) -> Result<Arc<Vec<Resource>>, ProviderError> {
        self.data.inventory(resource_type).await
    }

    /// Cached relation traversal.
    pub async fn related(
        &self,
        relation: RelationKind,
        key: &str,
    ) -> Result<Arc<Vec<Related>>, ProviderError> {
        self.data.related(relation, key).await
    }
}

/// A registered waste detector.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Globally-unique scenario identifier (the finding's `orphan_type`).
    fn orphan_type(&self) -> &'static str;

    /// The single resource type this scenario belongs to.
    fn resource_type(&self) -> ResourceType;

    /// Rule key of the per-scenario feature flag, if it has one.
    fn flag(&self) -> Option<&'static str> {
        None
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError>;
}

/// Assemble the full catalog.
pub fn catalog() -> Vec<Arc<dyn Scenario>> {
    let mut scenarios: Vec<Arc<dyn Scenario>> = Vec::new();
    scenarios.extend(volume::scenarios());
    scenarios.extend(public_ip::scenarios());
    scenarios.extend(snapshot::scenarios());
    scenarios.extend(instance::scenarios());
    scenarios.extend(nat_gateway::scenarios());
    scenarios.extend(load_balancer::scenarios());
    scenarios.extend(database::scenarios());
    scenarios.extend(cache::scenarios());
    scenarios.extend(warehouse::scenarios());
    scenarios.extend(stream::scenarios());
    scenarios.extend(bucket::scenarios());
    scenarios.extend(function::scenarios());
    scenarios.extend(table::scenarios());
    scenarios.extend(file_system::scenarios());
    scenarios.extend(network_edge::scenarios());
    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_orphan_types_are_unique() {
        let catalog = catalog();
        let mut seen = HashSet::new();
        for scenario in &catalog {
            assert!(
                seen.insert(scenario.orphan_type()),
                "duplicate orphan_type {}",
                scenario.orphan_type()
            );
        }
        assert!(catalog.len() >= 90, "catalog unexpectedly small: {}", catalog.len());
    }

    #[test]
    fn test_every_scenario_belongs_to_a_known_type() {
        for scenario in catalog() {
            assert!(ResourceType::ALL.contains(&scenario.resource_type()));
        }
    }
}
