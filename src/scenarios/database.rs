//! Managed database scenarios: relational instances plus the graph and
//! document cluster variants.

use super::support::stopped_duration_days;
use super::{Scenario, ScenarioContext};
use crate::models::{
    CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceState, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(StoppedLongTerm),
        Arc::new(IdleConnections),
        Arc::new(ZeroIo),
        Arc::new(NeverConnected),
        Arc::new(NoBackups),
        Arc::new(OutdatedEngine),
        Arc::new(GraphIdle),
        Arc::new(DocumentIdle),
    ]
}

fn database_cost(ctx: &ScenarioContext<'_>, db: &Resource) -> f64 {
    ctx.pricing.database_monthly_cost(
        db.sku.as_deref().unwrap_or("db.m5.large"),
        db.attr_bool("multi_az").unwrap_or(false),
        db.size_gb.unwrap_or(0.0),
    )
}

async fn connections_max(
    ctx: &ScenarioContext<'_>,
    namespace: &str,
    dimension: (&str, &str),
    lookback_days: i64,
) -> Result<Option<f64>, ProviderError> {
    let sample = ctx
        .metric(
            MetricQuery::new(namespace, "DatabaseConnections")
                .dimension(dimension.0, dimension.1)
                .lookback_days(lookback_days)
                .stat(MetricStat::Maximum),
        )
        .await?;
    Ok(if sample.is_empty() { None } else { sample.max() })
}

struct StoppedLongTerm;

#[async_trait]
impl Scenario for StoppedLongTerm {
    fn orphan_type(&self) -> &'static str {
        "stopped_long_term"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_stopped_long_term")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_stopped = ctx.rules.i64_or("min_stopped_days", 7);
        let mut findings = Vec::new();
        for db in ctx.resources {
            if db.state != ResourceState::Stopped {
                continue;
            }
            let (stopped_days, source) = stopped_duration_days(db, ctx.now);
            if stopped_days < min_stopped {
                continue;
            }
            // Stopped databases still bill for allocated storage, and the
            // platform restarts them automatically after a week.
            let storage_cost = db.size_gb.unwrap_or(0.0) * 0.115;
            let reason = format!(
                "database instance stopped for {stopped_days} days; storage bills ${storage_cost:.2}/month and the platform will auto-restart it weekly"
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    storage_cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(stopped_days),
                    stopped_days,
                    reason,
                )
                .signal("stopped_since_source", source),
            );
        }
        Ok(findings)
    }
}

struct IdleConnections;

#[async_trait]
impl Scenario for IdleConnections {
    fn orphan_type(&self) -> &'static str {
        "idle_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("connections_lookback_days", 7);
        let min_idle = ctx.rules.i64_or("min_idle_days", 7);
        let mut findings = Vec::new();
        for db in ctx.resources {
            if db.state != ResourceState::Available {
                continue;
            }
            let age = ctx.age_days(db);
            if age < min_idle {
                continue;
            }
            let Some(peak) =
                connections_max(ctx, "AWS/RDS", ("DBInstanceIdentifier", &db.id), lookback).await?
            else {
                continue;
            };
            if peak > 0.0 {
                continue;
            }
            let cost = database_cost(ctx, db);
            let reason = format!(
                "running {} instance held zero client connections for {lookback} days while billing ${cost:.2}/month",
                db.attr("engine").unwrap_or("database")
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("peak_connections", peak)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct ZeroIo;

#[async_trait]
impl Scenario for ZeroIo {
    fn orphan_type(&self) -> &'static str {
        "zero_io"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_zero_io")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("min_zero_io_days", 7);
        let mut findings = Vec::new();
        for db in ctx.resources {
            if db.state != ResourceState::Available {
                continue;
            }
            let read = ctx
                .metric(
                    MetricQuery::new("AWS/RDS", "ReadIOPS")
                        .dimension("DBInstanceIdentifier", &db.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            let write = ctx
                .metric(
                    MetricQuery::new("AWS/RDS", "WriteIOPS")
                        .dimension("DBInstanceIdentifier", &db.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            if read.is_empty() && write.is_empty() {
                continue;
            }
            let total_iops = read.mean().unwrap_or(0.0) + write.mean().unwrap_or(0.0);
            if total_iops >= 0.01 {
                continue;
            }
            let age = ctx.age_days(db);
            let cost = database_cost(ctx, db);
            let reason = format!(
                "database performed no read or write I/O for {lookback} days ({total_iops:.3} IOPS average) — running but unused (${cost:.2}/month)"
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("average_iops", total_iops),
            );
        }
        Ok(findings)
    }
}

struct NeverConnected;

#[async_trait]
impl Scenario for NeverConnected {
    fn orphan_type(&self) -> &'static str {
        "never_connected"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_connected")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("never_connected_min_age_days", 7);
        let mut findings = Vec::new();
        for db in ctx.resources {
            if db.state != ResourceState::Available {
                continue;
            }
            let age = ctx.age_days(db);
            if age < min_age {
                continue;
            }
            let lookback = age.clamp(min_age, 90);
            let peak =
                connections_max(ctx, "AWS/RDS", ("DBInstanceIdentifier", &db.id), lookback).await?;
            // Absence-as-absence: a zero reading (or none at all) over the
            // whole observable window means nothing ever connected.
            if peak.unwrap_or(0.0) > 0.0 {
                continue;
            }
            let cost = database_cost(ctx, db);
            let reason = format!(
                "no client has connected to this database in the {lookback} days since observation began (created {age} days ago) — ${cost:.2}/month"
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("observed_days", lookback)
                .signal("peak_connections", peak.unwrap_or(0.0)),
            );
        }
        Ok(findings)
    }
}

struct NoBackups;

#[async_trait]
impl Scenario for NoBackups {
    fn orphan_type(&self) -> &'static str {
        "no_backups"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_backups")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("no_backups_min_age_days", 30);
        let mut findings = Vec::new();
        for db in ctx.resources {
            if db.attr_u64("backup_retention_days").unwrap_or(1) > 0 {
                continue;
            }
            let age = ctx.age_days(db);
            if age < min_age {
                continue;
            }
            let reason = format!(
                "automated backups are disabled on this {} instance ({age} days old); likely an abandoned or throwaway database worth reviewing",
                db.attr("engine").unwrap_or("database")
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    0.0,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("backup_retention_days", 0),
            );
        }
        Ok(findings)
    }
}

struct OutdatedEngine;

#[async_trait]
impl Scenario for OutdatedEngine {
    fn orphan_type(&self) -> &'static str {
        "outdated_engine"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Database
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_outdated_engine")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let eol = ctx.rules.str_list("eol_engine_versions");
        let mut findings = Vec::new();
        for db in ctx.resources {
            let (Some(engine), Some(version)) = (db.attr("engine"), db.attr("engine_version"))
            else {
                continue;
            };
            let matched = eol.iter().find(|entry| {
                entry
                    .split_once(' ')
                    .map(|(e, v)| e == engine && version.starts_with(v))
                    .unwrap_or(false)
            });
            let Some(matched) = matched else { continue };
            let age = ctx.age_days(db);
            let reason = format!(
                "engine {engine} {version} is past end of support ({matched}); extended-support surcharges and unpatched CVEs follow"
            );
            findings.push(
                Finding::new(
                    db,
                    self.orphan_type(),
                    0.0,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("engine", engine)
                .signal("engine_version", version),
            );
        }
        Ok(findings)
    }
}

struct GraphIdle;

#[async_trait]
impl Scenario for GraphIdle {
    fn orphan_type(&self) -> &'static str {
        "graph_idle_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::GraphDatabase
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("connections_lookback_days", 7);
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
            let requests = ctx
                .metric(
                    MetricQuery::new("AWS/Neptune", "TotalRequestsPerSec")
                        .dimension("DBClusterIdentifier", &cluster.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            if requests.is_empty() || requests.mean().unwrap_or(0.0) > 0.0 {
                continue;
            }
            let members = cluster.attr_u64("member_count").unwrap_or(1).max(1) as u32;
            let cost = ctx.pricing.database_monthly_cost("db.r5.large", false, 0.0)
                * f64::from(members);
            let reason = format!(
                "graph cluster served zero requests over {lookback} days across {members} member instance(s) (${cost:.2}/month)"
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
                .signal("member_count", members)
                .signal("lookback_days", lookback),
            );
        }
        Ok(findings)
    }
}

struct DocumentIdle;

#[async_trait]
impl Scenario for DocumentIdle {
    fn orphan_type(&self) -> &'static str {
        "document_idle_connections"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::DocumentDatabase
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_idle_connections")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("connections_lookback_days", 7);
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
            let Some(peak) =
                connections_max(ctx, "AWS/DocDB", ("DBClusterIdentifier", &cluster.id), lookback)
                    .await?
            else {
                continue;
            };
            if peak > 0.0 {
                continue;
            }
            let members = cluster.attr_u64("member_count").unwrap_or(1).max(1) as u32;
            let cost = ctx.pricing.database_monthly_cost("db.r5.large", false, 0.0)
                * f64::from(members);
            let reason = format!(
                "document cluster held zero connections over {lookback} days across {members} member instance(s) (${cost:.2}/month)"
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
                .signal("member_count", members)
                .signal("peak_connections", peak),
            );
        }
        Ok(findings)
    }
}
