//! Stream scenarios: dead, write-only, oversized, over-retained, and
//! skewed streams.

use super::support::fmt_bytes;
use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState, ResourceType,
};
use crate::providers::{ProviderError, RelationKind};
use crate::telemetry::partition_skew;
use async_trait::async_trait;
use std::sync::Arc;

/// Extended-retention list price per shard-hour beyond the default day.
const EXTENDED_RETENTION_SHARD_HOURLY: f64 = 0.02;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Inactive),
        Arc::new(WrittenNotRead),
        Arc::new(Underutilized),
        Arc::new(ExcessiveRetention),
        Arc::new(OverprovisionedShards),
        Arc::new(HotPartition),
    ]
}

fn shard_count(stream: &Resource) -> u32 {
    stream.attr_u64("open_shard_count").unwrap_or(1).max(1) as u32
}

async fn stream_sum(
    ctx: &ScenarioContext<'_>,
    stream: &Resource,
    metric: &str,
    lookback_days: i64,
) -> Result<crate::models::TelemetrySample, ProviderError> {
    ctx.metric(
        MetricQuery::new("AWS/Kinesis", metric)
            .dimension("StreamName", &stream.id)
            .lookback_days(lookback_days)
            .stat(MetricStat::Sum),
    )
    .await
}

struct Inactive;

#[async_trait]
impl Scenario for Inactive {
    fn orphan_type(&self) -> &'static str {
        "stream_inactive"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_inactive")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("inactive_lookback_days", 7);
        let min_age = ctx.rules.i64_or("min_age_days", 3);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            if stream.state != ResourceState::Available {
                continue;
            }
            let age = ctx.age_days(stream);
            if age < min_age {
                continue;
            }
            let incoming = stream_sum(ctx, stream, "IncomingBytes", lookback).await?;
            let outgoing = stream_sum(ctx, stream, "GetRecords.Bytes", lookback).await?;
            if incoming.is_empty() && outgoing.is_empty() {
                continue;
            }
            if incoming.sum() > 0.0 || outgoing.sum() > 0.0 {
                continue;
            }
            let shards = shard_count(stream);
            let cost = ctx.pricing.stream_monthly_cost(shards);
            let reason = format!(
                "stream moved zero bytes in or out over {lookback} days across {shards} shard(s) (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("shard_count", shards)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct WrittenNotRead;

#[async_trait]
impl Scenario for WrittenNotRead {
    fn orphan_type(&self) -> &'static str {
        "written_not_read"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_written_not_read")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("written_not_read_lookback_days", 7);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            if stream.state != ResourceState::Available {
                continue;
            }
            let incoming = stream_sum(ctx, stream, "IncomingBytes", lookback).await?;
            let outgoing = stream_sum(ctx, stream, "GetRecords.Bytes", lookback).await?;
            if incoming.is_empty() {
                continue;
            }
            let written = incoming.sum();
            if written <= 0.0 || outgoing.sum() > 0.0 {
                continue;
            }
            let age = ctx.age_days(stream);
            let cost = ctx.pricing.stream_monthly_cost(shard_count(stream));
            let reason = format!(
                "producers wrote {} into this stream over {lookback} days but no consumer ever read a byte — data expires unread (${cost:.2}/month)",
                fmt_bytes(written)
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("bytes_written", written),
            );
        }
        Ok(findings)
    }
}

struct Underutilized;

#[async_trait]
impl Scenario for Underutilized {
    fn orphan_type(&self) -> &'static str {
        "stream_underutilized"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_underutilized")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("underutilized_lookback_days", 7);
        let threshold = ctx.rules.f64_or("utilization_threshold_percent", 1.0);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            if stream.state != ResourceState::Available {
                continue;
            }
            let incoming = stream_sum(ctx, stream, "IncomingBytes", lookback).await?;
            if incoming.is_empty() {
                continue;
            }
            let shards = shard_count(stream);
            // Each shard ingests up to 1 MB/s.
            let capacity_bytes = f64::from(shards) * 1024.0 * 1024.0 * (lookback * 86_400) as f64;
            let utilization = incoming.sum() / capacity_bytes * 100.0;
            if utilization <= 0.0 || utilization >= threshold {
                continue;
            }
            let age = ctx.age_days(stream);
            let cost = ctx.pricing.stream_monthly_cost(shards);
            let reason = format!(
                "stream uses {utilization:.2}% of its {shards}-shard write capacity over {lookback} days (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("utilization_percent", utilization)
                .signal("shard_count", shards),
            );
        }
        Ok(findings)
    }
}

struct ExcessiveRetention;

#[async_trait]
impl Scenario for ExcessiveRetention {
    fn orphan_type(&self) -> &'static str {
        "excessive_retention"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_excessive_retention")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let retention_threshold = ctx.rules.i64_or("retention_hours_threshold", 48);
        let max_iterator_age = ctx.rules.f64_or("max_iterator_age_ms", 60_000.0);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            let retention_hours = stream.attr_u64("retention_hours").unwrap_or(24) as i64;
            if retention_hours <= retention_threshold {
                continue;
            }
            let iterator_age = ctx
                .metric(
                    MetricQuery::new("AWS/Kinesis", "GetRecords.IteratorAgeMilliseconds")
                        .dimension("StreamName", &stream.id)
                        .lookback_days(7)
                        .stat(MetricStat::Maximum),
                )
                .await?;
            let Some(worst_lag) = iterator_age.max() else { continue };
            // Consumers reading in near-real-time never reach the tail of a
            // multi-day retention window.
            if worst_lag > max_iterator_age {
                continue;
            }
            let shards = shard_count(stream);
            let extended_hours = (retention_hours - 24).max(0) as f64;
            let savings = f64::from(shards)
                * EXTENDED_RETENTION_SHARD_HOURLY
                * (extended_hours / retention_hours as f64)
                * 720.0;
            let age = ctx.age_days(stream);
            let reason = format!(
                "stream retains {retention_hours}h of data but its consumers lag at most {worst_lag:.0} ms; default retention would save about ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("retention_hours", retention_hours)
                .signal("max_iterator_age_ms", worst_lag),
            );
        }
        Ok(findings)
    }
}

struct OverprovisionedShards;

#[async_trait]
impl Scenario for OverprovisionedShards {
    fn orphan_type(&self) -> &'static str {
        "overprovisioned_shards"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_overprovisioned_shards")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let ratio = ctx.rules.f64_or("overprovisioning_ratio", 10.0);
        let lookback = ctx.rules.i64_or("underutilized_lookback_days", 7);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            let shards = shard_count(stream);
            if shards < 2 {
                continue;
            }
            let incoming = stream_sum(ctx, stream, "IncomingBytes", lookback).await?;
            if incoming.is_empty() {
                continue;
            }
            let observed_mbps = incoming.sum() / (lookback * 86_400) as f64 / (1024.0 * 1024.0);
            let needed = observed_mbps.ceil().max(1.0) as u32;
            if f64::from(shards) < f64::from(needed) * ratio {
                continue;
            }
            let current = ctx.pricing.stream_monthly_cost(shards);
            let reduced = ctx.pricing.stream_monthly_cost(needed);
            let savings = current - reduced;
            let age = ctx.age_days(stream);
            let reason = format!(
                "{shards} shards provisioned for {observed_mbps:.3} MB/s of ingest; {needed} shard(s) suffice, saving ${savings:.2}/month"
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("shard_count", shards)
                .signal("recommended_shards", needed)
                .signal("observed_mbps", observed_mbps),
            );
        }
        Ok(findings)
    }
}

struct HotPartition;

#[async_trait]
impl Scenario for HotPartition {
    fn orphan_type(&self) -> &'static str {
        "hot_partition"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Stream
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_hot_partition")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let share_threshold = ctx.rules.f64_or("hot_partition_share_percent", 70.0);
        let idle_threshold = ctx.rules.f64_or("idle_shard_bytes_threshold", 1_000_000.0);
        let sample_cap = ctx.rules.usize_or("max_shards_sampled", 20);
        let lookback = ctx.rules.i64_or("underutilized_lookback_days", 7);
        let mut findings = Vec::new();
        for stream in ctx.resources {
            if shard_count(stream) < 2 {
                continue;
            }
            let shards = ctx.related(RelationKind::Shards, &stream.id).await?;
            if shards.len() < 2 {
                continue;
            }
            if shards.len() > sample_cap {
                tracing::debug!(
                    stream = %stream.id,
                    shards = shards.len(),
                    sampled = sample_cap,
                    "sampling subset of shards for skew analysis"
                );
            }
            let mut per_shard = Vec::new();
            for shard in shards.iter().take(sample_cap) {
                let bytes = ctx
                    .metric(
                        MetricQuery::new("AWS/Kinesis", "IncomingBytes")
                            .dimension("StreamName", &stream.id)
                            .dimension("ShardId", &shard.id)
                            .lookback_days(lookback)
                            .stat(MetricStat::Sum),
                    )
                    .await?;
                if !bytes.is_empty() {
                    per_shard.push((shard.id.clone(), bytes.sum()));
                }
            }
            let skew = partition_skew(&per_shard, idle_threshold);
            if !skew.hint.is_measured()
                || skew.top_share_percent < share_threshold
                || skew.idle_partitions == 0
            {
                continue;
            }
            let savings = ctx.pricing.stream_monthly_cost(skew.idle_partitions as u32);
            let age = ctx.age_days(stream);
            let reason = format!(
                "shard {} carries {:.1}% of ingest while {} of {} sampled shards sit idle — repartitioning frees about ${savings:.2}/month",
                skew.top_partition.as_deref().unwrap_or("?"),
                skew.top_share_percent,
                skew.idle_partitions,
                skew.total_partitions
            );
            findings.push(
                Finding::new(
                    stream,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("top_shard_share_percent", skew.top_share_percent)
                .signal("idle_shards", skew.idle_partitions),
            );
        }
        Ok(findings)
    }
}
