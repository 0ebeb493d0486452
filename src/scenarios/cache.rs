//! Cache cluster scenarios: caches nobody hits, nobody connects to, or that
//! hold far more memory than they use.

use super::{Scenario, ScenarioContext};
use crate::models::{
    Confidence, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(ZeroCacheHits),
        Arc::new(LowHitRate),
        Arc::new(NoConnections),
        Arc::new(OverprovisionedMemory),
    ]
}

fn cluster_cost(ctx: &ScenarioContext<'_>, cluster: &Resource) -> f64 {
    ctx.pricing.cache_cluster_monthly_cost(
        cluster.sku.as_deref().unwrap_or("cache.m5.large"),
        cluster.attr_u64("node_count").unwrap_or(1) as u32,
    )
}

async fn hits_and_misses(
    ctx: &ScenarioContext<'_>,
    cluster: &Resource,
    lookback_days: i64,
) -> Result<Option<(f64, f64)>, ProviderError> {
    let hits = ctx
        .metric(
            MetricQuery::new("AWS/ElastiCache", "CacheHits")
                .dimension("CacheClusterId", &cluster.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let misses = ctx
        .metric(
            MetricQuery::new("AWS/ElastiCache", "CacheMisses")
                .dimension("CacheClusterId", &cluster.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if hits.is_empty() && misses.is_empty() {
        return Ok(None);
    }
    Ok(Some((hits.sum(), misses.sum())))
}

struct ZeroCacheHits;

#[async_trait]
impl Scenario for ZeroCacheHits {
    fn orphan_type(&self) -> &'static str {
        "zero_cache_hits"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::CacheCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_zero_cache_hits")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("zero_hits_lookback_days", 7);
        let min_age = ctx.rules.i64_or("min_age_days", 3);
        let mut findings = Vec::new();
        for cluster in ctx.resources {
            if cluster.state != ResourceState::Available {
                continue;
            }
            let age = ctx.age_days(cluster);
            if age < min_age {
                continue;
            }
            let Some((hits, _)) = hits_and_misses(ctx, cluster, lookback).await? else {
                continue;
            };
            if hits > 0.0 {
                continue;
            }
            let cost = cluster_cost(ctx, cluster);
            let reason = format!(
                "cache served zero hits over {lookback} days; nothing reads from it (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    cluster,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("cache_hits", hits)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct LowHitRate;

#[async_trait]
impl Scenario for LowHitRate {
    fn orphan_type(&self) -> &'static str {
        "low_hit_rate"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::CacheCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_hit_rate")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("hit_rate_lookback_days", 7);
        let threshold = ctx.rules.f64_or("hit_rate_threshold", 50.0);
        let critical = ctx.rules.f64_or("critical_hit_rate", 10.0);
        let mut findings = Vec::new();
        for cluster in ctx.resources {
            if cluster.state != ResourceState::Available {
                continue;
            }
            let Some((hits, misses)) = hits_and_misses(ctx, cluster, lookback).await? else {
                continue;
            };
            let total = hits + misses;
            if total <= 0.0 {
                // All-quiet caches belong to zero_cache_hits.
                continue;
            }
            let hit_rate = hits / total * 100.0;
            if hit_rate >= threshold {
                continue;
            }
            let age = ctx.age_days(cluster);
            let cost = cluster_cost(ctx, cluster);
            let confidence = if hit_rate < critical {
                ctx.confidence_for_age(age).at_least(Confidence::High)
            } else {
                ctx.confidence_for_age(age)
            };
            let reason = format!(
                "cache hit rate is {hit_rate:.1}% over {lookback} days ({hits:.0} hits / {misses:.0} misses); the working set does not fit the access pattern (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    cluster,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    confidence,
                    age,
                    reason,
                )
                .signal("hit_rate_percent", hit_rate)
                .signal("hits", hits)
                .signal("misses", misses),
            );
        }
        Ok(findings)
    }
}

struct NoConnections;

#[async_trait]
impl Scenario for NoConnections {
    fn orphan_type(&self) -> &'static str {
        "cache_no_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::CacheCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("no_connections_lookback_days", 7);
        let mut findings = Vec::new();
        for cluster in ctx.resources {
            if cluster.state != ResourceState::Available {
                continue;
            }
            let connections = ctx
                .metric(
                    MetricQuery::new("AWS/ElastiCache", "CurrConnections")
                        .dimension("CacheClusterId", &cluster.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            if connections.is_empty() || connections.max().unwrap_or(0.0) > 0.0 {
                continue;
            }
            let age = ctx.age_days(cluster);
            let cost = cluster_cost(ctx, cluster);
            let reason = format!(
                "no client connected to this cache for {lookback} days (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    cluster,
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

struct OverprovisionedMemory;

#[async_trait]
impl Scenario for OverprovisionedMemory {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_memory"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::CacheCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_memory")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("memory_lookback_days", 7);
        let threshold = ctx.rules.f64_or("memory_usage_threshold", 20.0);
        let mut findings = Vec::new();
        for cluster in ctx.resources {
            if cluster.state != ResourceState::Available {
                continue;
            }
            let usage = ctx
                .metric(
                    MetricQuery::new("AWS/ElastiCache", "DatabaseMemoryUsagePercentage")
                        .dimension("CacheClusterId", &cluster.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some(used_percent) = usage.mean() else { continue };
            if used_percent >= threshold {
                continue;
            }
            let node_type = cluster.sku.as_deref().unwrap_or("cache.m5.large");
            let current = cluster_cost(ctx, cluster);
            // Half the node size roughly halves the bill.
            let savings = current / 2.0;
            let age = ctx.age_days(cluster);
            let reason = format!(
                "cache uses {used_percent:.1}% of {node_type} memory over {lookback} days; one node size down saves about ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    cluster,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("memory_used_percent", used_percent)
                .signal("current_monthly_cost", current),
            );
        }
        Ok(findings)
    }
}
