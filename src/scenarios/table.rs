//! Serverless table scenarios: provisioned capacity and indexes with no
//! traffic to justify them, and tables nobody ever wrote to.

use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(OverprovisionedCapacity),
        Arc::new(UnusedSecondaryIndex),
        Arc::new(NeverUsedProvisioned),
        Arc::new(NeverUsedOnDemand),
        Arc::new(EmptyTable),
    ]
}

fn provisioned_units(table: &Resource) -> (u64, u64) {
    (
        table.attr_u64("read_capacity_units").unwrap_or(0),
        table.attr_u64("write_capacity_units").unwrap_or(0),
    )
}

fn is_provisioned(table: &Resource) -> bool {
    table.attr("billing_mode").map(|m| m == "PROVISIONED").unwrap_or(true)
}

async fn consumed_units(
    ctx: &ScenarioContext<'_>,
    table: &Resource,
    lookback_days: i64,
) -> Result<Option<(f64, f64)>, ProviderError> {
    let reads = ctx
        .metric(
            MetricQuery::new("AWS/DynamoDB", "ConsumedReadCapacityUnits")
                .dimension("TableName", &table.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    let writes = ctx
        .metric(
            MetricQuery::new("AWS/DynamoDB", "ConsumedWriteCapacityUnits")
                .dimension("TableName", &table.id)
                .lookback_days(lookback_days)
                .stat(MetricStat::Sum),
        )
        .await?;
    if reads.is_empty() && writes.is_empty() {
        return Ok(None);
    }
    Ok(Some((reads.sum(), writes.sum())))
}

struct OverprovisionedCapacity;

#[async_trait]
impl Scenario for OverprovisionedCapacity {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_capacity"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessTable
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_capacity")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.f64_or("provisioned_utilization_threshold", 10.0);
        let lookback = ctx.rules.i64_or("provisioned_lookback_days", 7);
        let mut findings = Vec::new();
        for table in ctx.resources {
            if !is_provisioned(table) {
                continue;
            }
            let (rcu, wcu) = provisioned_units(table);
            if rcu + wcu == 0 {
                continue;
            }
            let Some((read_sum, write_sum)) = consumed_units(ctx, table, lookback).await? else {
                continue;
            };
            let seconds = (lookback * 86_400) as f64;
            let consumed_per_sec = (read_sum + write_sum) / seconds;
            let provisioned_per_sec = (rcu + wcu) as f64;
            let utilization = consumed_per_sec / provisioned_per_sec * 100.0;
            if utilization >= threshold {
                continue;
            }
            let current = ctx.pricing.serverless_table_monthly_cost(rcu, wcu, 0.0);
            let recommended_rcu = ((read_sum / seconds) * 1.5).ceil().max(1.0) as u64;
            let recommended_wcu = ((write_sum / seconds) * 1.5).ceil().max(1.0) as u64;
            let reduced =
                ctx.pricing.serverless_table_monthly_cost(recommended_rcu, recommended_wcu, 0.0);
            let savings = current - reduced;
            if savings <= 0.0 {
                continue;
            }
            let age = ctx.age_days(table);
            let reason = format!(
                "table consumes {utilization:.1}% of its provisioned {rcu} RCU / {wcu} WCU; {recommended_rcu} RCU / {recommended_wcu} WCU covers the load for ${savings:.2}/month less"
            );
            findings.push(
                Finding::new(
                    table,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("utilization_percent", utilization)
                .signal("provisioned_rcu", rcu)
                .signal("provisioned_wcu", wcu),
            );
        }
        Ok(findings)
    }
}

struct UnusedSecondaryIndex;

#[async_trait]
impl Scenario for UnusedSecondaryIndex {
    fn orphan_type(&self) -> &'static str {
        "unused_secondary_index"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessTable
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unused_secondary_index")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("index_lookback_days", 14);
        let mut findings = Vec::new();
        for table in ctx.resources {
            let Some(index_names) = table.attr("index_names") else { continue };
            for index in index_names.split(',').filter(|s| !s.is_empty()) {
                let reads = ctx
                    .metric(
                        MetricQuery::new("AWS/DynamoDB", "ConsumedReadCapacityUnits")
                            .dimension("TableName", &table.id)
                            .dimension("GlobalSecondaryIndexName", index)
                            .lookback_days(lookback)
                            .stat(MetricStat::Sum),
                    )
                    .await?;
                if reads.is_empty() || reads.sum() > 0.0 {
                    continue;
                }
                // An index replicates every write; its keep-alive cost is
                // roughly the table's own capacity bill again.
                let (rcu, wcu) = provisioned_units(table);
                let savings = ctx.pricing.serverless_table_monthly_cost(rcu, wcu, 0.0);
                let age = ctx.age_days(table);
                let reason = format!(
                    "secondary index {index} was never queried in {lookback} days yet mirrors every write to {} — dropping it saves about ${savings:.2}/month",
                    table.id
                );
                findings.push(
                    Finding::new(
                        table,
                        self.orphan_type(),
                        savings,
                        CostKind::Savings,
                        ctx.confidence_for_age(age),
                        age,
                        reason,
                    )
                    .signal("index_name", index)
                    .signal("lookback_days", lookback),
                );
            }
        }
        Ok(findings)
    }
}

struct NeverUsedProvisioned;

#[async_trait]
impl Scenario for NeverUsedProvisioned {
    fn orphan_type(&self) -> &'static str {
        "never_used_provisioned"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessTable
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_used_provisioned")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("never_used_min_age_days", 30);
        let mut findings = Vec::new();
        for table in ctx.resources {
            if !is_provisioned(table) {
                continue;
            }
            let age = ctx.age_days(table);
            if age < min_age {
                continue;
            }
            let lookback = age.clamp(min_age, 90);
            let consumed = consumed_units(ctx, table, lookback).await?;
            // Absence-as-absence: no consumption metrics at all means the
            // capacity has billed since creation without a single request.
            if consumed.map(|(r, w)| r + w > 0.0).unwrap_or(false) {
                continue;
            }
            let (rcu, wcu) = provisioned_units(table);
            let cost = ctx.pricing.serverless_table_monthly_cost(
                rcu,
                wcu,
                table.size_gb.unwrap_or(0.0),
            );
            let reason = format!(
                "provisioned table ({rcu} RCU / {wcu} WCU) created {age} days ago has never served a request — ${cost:.2}/month of reserved capacity"
            );
            findings.push(
                Finding::new(
                    table,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("observed_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct NeverUsedOnDemand;

#[async_trait]
impl Scenario for NeverUsedOnDemand {
    fn orphan_type(&self) -> &'static str {
        "never_used_on_demand"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessTable
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_used_on_demand")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("on_demand_lookback_days", 60);
        let mut findings = Vec::new();
        for table in ctx.resources {
            if is_provisioned(table) {
                continue;
            }
            let age = ctx.age_days(table);
            if age < lookback {
                continue;
            }
            let consumed = consumed_units(ctx, table, lookback).await?;
            if consumed.map(|(r, w)| r + w > 0.0).unwrap_or(false) {
                continue;
            }
            let cost = ctx
                .pricing
                .serverless_table_monthly_cost(0, 0, table.size_gb.unwrap_or(0.0));
            let reason = format!(
                "on-demand table saw no read or write in {lookback} days; only its {:.2} GB of storage keeps billing (${cost:.2}/month)",
                table.size_gb.unwrap_or(0.0)
            );
            findings.push(
                Finding::new(
                    table,
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

struct EmptyTable;

#[async_trait]
impl Scenario for EmptyTable {
    fn orphan_type(&self) -> &'static str {
        "empty_table"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessTable
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_empty_table")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("empty_table_min_age_days", 90);
        let mut findings = Vec::new();
        for table in ctx.resources {
            if table.attr_u64("item_count").unwrap_or(1) != 0 {
                continue;
            }
            let age = ctx.age_days(table);
            if age < min_age {
                continue;
            }
            let (rcu, wcu) = provisioned_units(table);
            let cost = ctx.pricing.serverless_table_monthly_cost(rcu, wcu, 0.0);
            let reason = format!(
                "table has held zero items for its {age}-day lifetime; its provisioned capacity alone bills ${cost:.2}/month"
            );
            findings.push(
                Finding::new(
                    table,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("item_count", 0),
            );
        }
        Ok(findings)
    }
}
