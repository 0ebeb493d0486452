//! Per-region scan execution.
//!
//! A region-scan materializes each resource type's inventory once, then runs
//! every enabled scenario for that type against the shared caches. Scenario
//! failures are recorded and skipped; only the region deadline or a
//! mid-scan credential failure degrades the whole region.

use crate::models::{
    Finding, MetricQuery, Resource, ResourceType, SkippedScenario, TelemetrySample,
};
use crate::pricing::PricingCatalog;
use crate::providers::{CloudProvider, ProviderError, Related, RelationKind};
use crate::rules::RuleSet;
use crate::scenarios::{Scenario, ScenarioContext};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout};

/// Shared per-region state: provider handle, in-flight call bound, and the
/// inventory/telemetry/relation caches. Scoped to one region-scan and
/// discarded with it.
pub(crate) struct RegionData {
    region: String,
    provider: Arc<dyn CloudProvider>,
    api_permits: Semaphore,
    inventories: DashMap<ResourceType, Arc<Vec<Resource>>>,
    metrics: DashMap<String, TelemetrySample>,
    related: DashMap<(RelationKind, String), Arc<Vec<Related>>>,
}

impl RegionData {
    pub(crate) fn new(
        region: String,
        provider: Arc<dyn CloudProvider>,
        max_concurrent_api_calls: usize,
    ) -> Self {
        Self {
            region,
            provider,
            api_permits: Semaphore::new(max_concurrent_api_calls.max(1)),
            inventories: DashMap::new(),
            metrics: DashMap::new(),
            related: DashMap::new(),
        }
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, ProviderError> {
        self.api_permits.acquire().await.map_err(|_| ProviderError::Api {
            operation: "scheduler".to_string(),
            message: "api permit pool closed".to_string(),
        })
    }

    pub(crate) async fn inventory(
        &self,
        resource_type: ResourceType,
    ) -> Result<Arc<Vec<Resource>>, ProviderError> {
        if let Some(cached) = self.inventories.get(&resource_type) {
            return Ok(cached.clone());
        }
        let listed = {
            let _permit = self.permit().await?;
            self.provider.list_resources(&self.region, resource_type).await?
        };
        let listed = Arc::new(listed);
        self.inventories.insert(resource_type, listed.clone());
        Ok(listed)
    }

    pub(crate) async fn metric(&self, query: &MetricQuery) -> Result<TelemetrySample, ProviderError> {
        let key = query.cache_key();
        if let Some(cached) = self.metrics.get(&key) {
            return Ok(cached.clone());
        }
        let sample = {
            let _permit = self.permit().await?;
            self.provider.get_metric(&self.region, query).await?
        };
        self.metrics.insert(key, sample.clone());
        Ok(sample)
    }

    pub(crate) async fn related(
        &self,
        relation: RelationKind,
        key: &str,
    ) -> Result<Arc<Vec<Related>>, ProviderError> {
        let cache_key = (relation, key.to_string());
        if let Some(cached) = self.related.get(&cache_key) {
            return Ok(cached.clone());
        }
        let listed = {
            let _permit = self.permit().await?;
            self.provider.list_related(&self.region, key, relation).await?
        };
        let listed = Arc::new(listed);
        self.related.insert(cache_key, listed.clone());
        Ok(listed)
    }
}

/// Result of scanning one region, partial failures included.
pub(crate) struct RegionOutcome {
    pub region: String,
    pub findings: Vec<Finding>,
    pub errors: Vec<String>,
    pub skipped: Vec<SkippedScenario>,
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn scan_region(
    provider: Arc<dyn CloudProvider>,
    region: String,
    scan_global: bool,
    rules: Arc<RuleSet>,
    pricing: PricingCatalog,
    scenarios: Arc<Vec<Arc<dyn Scenario>>>,
    region_timeout: Duration,
    max_concurrent_api_calls: usize,
    now: DateTime<Utc>,
) -> RegionOutcome {
    let deadline = Instant::now() + region_timeout;
    let data = RegionData::new(region.clone(), provider, max_concurrent_api_calls);
    let mut outcome = RegionOutcome {
        region: region.clone(),
        findings: Vec::new(),
        errors: Vec::new(),
        skipped: Vec::new(),
    };

    tracing::info!(region = %region, "starting region scan");

    'types: for resource_type in ResourceType::ALL {
        if resource_type.is_global() && !scan_global {
            continue;
        }
        let type_rules = rules.for_type(resource_type);
        if !type_rules.enabled() {
            continue;
        }
        if Instant::now() >= deadline {
            outcome
                .errors
                .push(format!("region deadline exceeded before scanning {resource_type}"));
            break;
        }

        let inventory = match data.inventory(resource_type).await {
            Ok(inventory) => inventory,
            Err(err) if err.is_access_denied() => {
                tracing::warn!(region = %region, %resource_type, error = %err, "enumeration not authorized; skipping resource type");
                outcome.skipped.push(SkippedScenario {
                    region: region.clone(),
                    resource_type,
                    orphan_type: None,
                    reason: err.to_string(),
                });
                continue;
            }
            Err(err) => {
                tracing::error!(region = %region, %resource_type, error = %err, "enumeration failed");
                outcome.errors.push(format!("{resource_type}: {err}"));
                continue;
            }
        };
        if inventory.is_empty() {
            continue;
        }
        tracing::debug!(region = %region, %resource_type, count = inventory.len(), "inventory materialized");

        for scenario in scenarios.iter().filter(|s| s.resource_type() == resource_type) {
            if let Some(flag) = scenario.flag() {
                if !type_rules.flag(flag) {
                    continue;
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                outcome.errors.push(format!(
                    "region deadline exceeded at scenario {}",
                    scenario.orphan_type()
                ));
                break 'types;
            }
            let ctx = ScenarioContext {
                region: &region,
                resources: inventory.as_slice(),
                rules: type_rules,
                pricing: &pricing,
                now,
                data: &data,
            };
            match timeout(remaining, scenario.detect(&ctx)).await {
                Ok(Ok(mut findings)) => {
                    if !findings.is_empty() {
                        tracing::debug!(
                            region = %region,
                            scenario = scenario.orphan_type(),
                            count = findings.len(),
                            "scenario produced findings"
                        );
                    }
                    outcome.findings.append(&mut findings);
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        region = %region,
                        scenario = scenario.orphan_type(),
                        error = %err,
                        "scenario skipped"
                    );
                    outcome.skipped.push(SkippedScenario {
                        region: region.clone(),
                        resource_type,
                        orphan_type: Some(scenario.orphan_type().to_string()),
                        reason: err.to_string(),
                    });
                }
                Err(_) => {
                    outcome.skipped.push(SkippedScenario {
                        region: region.clone(),
                        resource_type,
                        orphan_type: Some(scenario.orphan_type().to_string()),
                        reason: "scenario deadline exceeded".to_string(),
                    });
                    outcome
                        .errors
                        .push(format!("deadline exceeded in {}", scenario.orphan_type()));
                    break 'types;
                }
            }
        }
    }

    tracing::info!(
        region = %region,
        findings = outcome.findings.len(),
        errors = outcome.errors.len(),
        skipped = outcome.skipped.len(),
        "region scan complete"
    );
    outcome
}
