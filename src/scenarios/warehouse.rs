//! Warehouse cluster and search domain scenarios: heavyweight analytics
//! infrastructure nobody queries.

use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(WarehouseNoConnections),
        Arc::new(WarehouseLowUtilization),
        Arc::new(SearchNoRequests),
        Arc::new(SearchLowUtilization),
    ]
}

fn warehouse_cost(ctx: &ScenarioContext<'_>, cluster: &Resource) -> f64 {
    ctx.pricing.warehouse_cluster_monthly_cost(
        cluster.sku.as_deref().unwrap_or("dc2.large"),
        cluster.attr_u64("node_count").unwrap_or(1) as u32,
    )
}

fn search_cost(ctx: &ScenarioContext<'_>, domain: &Resource) -> f64 {
    ctx.pricing.search_domain_monthly_cost(
        domain.sku.as_deref().unwrap_or("m5.large.search"),
        domain.attr_u64("instance_count").unwrap_or(1) as u32,
    )
}

struct WarehouseNoConnections;

#[async_trait]
impl Scenario for WarehouseNoConnections {
    fn orphan_type(&self) -> &'static str {
        "warehouse_no_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::WarehouseCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("no_connections_lookback_days", 7);
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
            let connections = ctx
                .metric(
                    MetricQuery::new("AWS/Redshift", "DatabaseConnections")
                        .dimension("ClusterIdentifier", &cluster.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            if connections.is_empty() || connections.max().unwrap_or(0.0) > 0.0 {
                continue;
            }
            let nodes = cluster.attr_u64("node_count").unwrap_or(1);
            let cost = warehouse_cost(ctx, cluster);
            let reason = format!(
                "warehouse cluster of {nodes} x {} nodes had zero database connections for {lookback} days (${cost:.2}/month)",
                cluster.sku.as_deref().unwrap_or("dc2.large")
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
                .signal("node_count", nodes)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct WarehouseLowUtilization;

#[async_trait]
impl Scenario for WarehouseLowUtilization {
    fn orphan_type(&self) -> &'static str {
        "warehouse_low_utilization"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::WarehouseCluster
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_utilization")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("utilization_lookback_days", 7);
        let threshold = ctx.rules.f64_or("cpu_threshold_percent", 5.0);
        let mut findings = Vec::new();
        for cluster in ctx.resources {
            if cluster.state != ResourceState::Available {
                continue;
            }
            let cpu = ctx
                .metric(
                    MetricQuery::new("AWS/Redshift", "CPUUtilization")
                        .dimension("ClusterIdentifier", &cluster.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some(average) = cpu.mean() else { continue };
            if average >= threshold {
                continue;
            }
            let current = warehouse_cost(ctx, cluster);
            // Pausing the cluster keeps only storage billing.
            let savings = current * 0.75;
            let age = ctx.age_days(cluster);
            let reason = format!(
                "warehouse cluster averaged {average:.1}% CPU over {lookback} days; pausing it between loads would recover about ${savings:.2} of ${current:.2}/month"
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
                .signal("average_cpu_percent", average),
            );
        }
        Ok(findings)
    }
}

struct SearchNoRequests;

#[async_trait]
impl Scenario for SearchNoRequests {
    fn orphan_type(&self) -> &'static str {
        "no_search_requests"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::SearchDomain
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_search_requests")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("search_lookback_days", 7);
        let mut findings = Vec::new();
        for domain in ctx.resources {
            if domain.state != ResourceState::Available {
                continue;
            }
            let rate = ctx
                .metric(
                    MetricQuery::new("AWS/ES", "SearchRate")
                        .dimension("DomainName", &domain.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            if rate.is_empty() || rate.sum() > 0.0 {
                continue;
            }
            let age = ctx.age_days(domain);
            let cost = search_cost(ctx, domain);
            let reason = format!(
                "search domain answered zero queries in {lookback} days across {} data node(s) (${cost:.2}/month)",
                domain.attr_u64("instance_count").unwrap_or(1)
            );
            findings.push(
                Finding::new(
                    domain,
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

struct SearchLowUtilization;

#[async_trait]
impl Scenario for SearchLowUtilization {
    fn orphan_type(&self) -> &'static str {
        "search_low_utilization"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::SearchDomain
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_low_utilization")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("utilization_lookback_days", 7);
        let threshold = ctx.rules.f64_or("cpu_threshold_percent", 10.0);
        let mut findings = Vec::new();
        for domain in ctx.resources {
            if domain.state != ResourceState::Available {
                continue;
            }
            let cpu = ctx
                .metric(
                    MetricQuery::new("AWS/ES", "CPUUtilization")
                        .dimension("DomainName", &domain.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let Some(average) = cpu.mean() else { continue };
            if average >= threshold {
                continue;
            }
            let current = search_cost(ctx, domain);
            let savings = current / 2.0;
            let age = ctx.age_days(domain);
            let reason = format!(
                "search domain averaged {average:.1}% CPU over {lookback} days; smaller or fewer data nodes would save about ${savings:.2} of ${current:.2}/month"
            );
            findings.push(
                Finding::new(
                    domain,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("average_cpu_percent", average),
            );
        }
        Ok(findings)
    }
}
