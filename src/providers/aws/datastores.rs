//! Managed datastore inventory: relational/graph/document databases, caches,
//! warehouses, search domains, streams, and file systems.

use super::{RegionClients, classify, from_smithy_time};
use crate::models::{Resource, ResourceState, ResourceType};
use crate::providers::{ProviderError, Related};
use std::collections::BTreeMap;

fn rds_state(status: Option<&str>) -> ResourceState {
    match status {
        Some("available" | "storage-optimization") => ResourceState::Available,
        Some("stopped") => ResourceState::Stopped,
        Some("creating" | "starting" | "modifying" | "backing-up") => ResourceState::Pending,
        Some("failed" | "incompatible-parameters" | "incompatible-restore") => ResourceState::Error,
        Some("deleting") => ResourceState::Unknown,
        _ => ResourceState::Unknown,
    }
}

fn rds_tags(tags: &[aws_sdk_rds::types::Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|t| match (t.key(), t.value()) {
            (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}

pub(crate) async fn list_databases(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.rds.describe_db_instances().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let db = item.map_err(|e| classify("rds:DescribeDBInstances", e))?;
        let Some(id) = db.db_instance_identifier() else { continue };
        // Graph and document engines surface through their own adapters.
        if matches!(db.engine(), Some(e) if e.starts_with("neptune") || e.starts_with("docdb")) {
            continue;
        }
        let mut r = Resource::new(ResourceType::Database, id, region);
        r.name = Some(id.to_string());
        r.state = rds_state(db.db_instance_status());
        r.created_at = db.instance_create_time().and_then(from_smithy_time);
        r.sku = db.db_instance_class().map(str::to_string);
        r.size_gb = db.allocated_storage().map(f64::from);
        r.tags = rds_tags(db.tag_list());
        if let Some(engine) = db.engine() {
            r.attributes.insert("engine".to_string(), engine.to_string());
        }
        if let Some(version) = db.engine_version() {
            r.attributes.insert("engine_version".to_string(), version.to_string());
        }
        r.attributes
            .insert("multi_az".to_string(), db.multi_az().unwrap_or(false).to_string());
        r.attributes.insert(
            "backup_retention_days".to_string(),
            db.backup_retention_period().unwrap_or(0).to_string(),
        );
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_graph_databases(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .neptune
        .describe_db_clusters()
        .send()
        .await
        .map_err(|e| classify("neptune:DescribeDBClusters", e))?;
    let mut out = Vec::new();
    for cluster in resp.db_clusters() {
        let Some(id) = cluster.db_cluster_identifier() else { continue };
        let mut r = Resource::new(ResourceType::GraphDatabase, id, region);
        r.name = Some(id.to_string());
        r.state = rds_state(cluster.status());
        r.created_at = cluster.cluster_create_time().and_then(from_smithy_time);
        r.attributes.insert(
            "member_count".to_string(),
            cluster.db_cluster_members().len().to_string(),
        );
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_document_databases(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .docdb
        .describe_db_clusters()
        .send()
        .await
        .map_err(|e| classify("docdb:DescribeDBClusters", e))?;
    let mut out = Vec::new();
    for cluster in resp.db_clusters() {
        let Some(id) = cluster.db_cluster_identifier() else { continue };
        let mut r = Resource::new(ResourceType::DocumentDatabase, id, region);
        r.name = Some(id.to_string());
        r.state = rds_state(cluster.status());
        r.created_at = cluster.cluster_create_time().and_then(from_smithy_time);
        r.attributes.insert(
            "member_count".to_string(),
            cluster.db_cluster_members().len().to_string(),
        );
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_cache_clusters(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients
        .elasticache
        .describe_cache_clusters()
        .show_cache_node_info(true)
        .into_paginator()
        .items()
        .send();
    while let Some(item) = pages.next().await {
        let cluster = item.map_err(|e| classify("elasticache:DescribeCacheClusters", e))?;
        let Some(id) = cluster.cache_cluster_id() else { continue };
        let mut r = Resource::new(ResourceType::CacheCluster, id, region);
        r.name = Some(id.to_string());
        r.state = match cluster.cache_cluster_status() {
            Some("available") => ResourceState::Available,
            Some("creating" | "modifying" | "snapshotting") => ResourceState::Pending,
            Some("deleted" | "deleting") => continue,
            _ => ResourceState::Unknown,
        };
        r.created_at = cluster.cache_cluster_create_time().and_then(from_smithy_time);
        r.sku = cluster.cache_node_type().map(str::to_string);
        if let Some(engine) = cluster.engine() {
            r.attributes.insert("engine".to_string(), engine.to_string());
        }
        r.attributes
            .insert("node_count".to_string(), cluster.num_cache_nodes().unwrap_or(1).to_string());
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_warehouse_clusters(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.redshift.describe_clusters().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let cluster = item.map_err(|e| classify("redshift:DescribeClusters", e))?;
        let Some(id) = cluster.cluster_identifier() else { continue };
        let mut r = Resource::new(ResourceType::WarehouseCluster, id, region);
        r.name = Some(id.to_string());
        r.state = match cluster.cluster_status() {
            Some("available") => ResourceState::Available,
            Some("paused") => ResourceState::Stopped,
            Some("creating" | "modifying" | "resuming") => ResourceState::Pending,
            Some("deleting") => continue,
            _ => ResourceState::Unknown,
        };
        r.created_at = cluster.cluster_create_time().and_then(from_smithy_time);
        r.sku = cluster.node_type().map(str::to_string);
        r.attributes
            .insert("node_count".to_string(), cluster.number_of_nodes().unwrap_or(1).to_string());
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_search_domains(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let names = clients
        .opensearch
        .list_domain_names()
        .send()
        .await
        .map_err(|e| classify("es:ListDomainNames", e))?;
    let mut out = Vec::new();
    for info in names.domain_names() {
        let Some(name) = info.domain_name() else { continue };
        let described = clients
            .opensearch
            .describe_domain()
            .domain_name(name)
            .send()
            .await
            .map_err(|e| classify("es:DescribeDomain", e))?;
        let Some(status) = described.domain_status() else { continue };
        let mut r = Resource::new(ResourceType::SearchDomain, name, region);
        r.name = Some(name.to_string());
        // Domain metadata exposes no creation time.
        r.state = if status.deleted() == Some(true) {
            continue;
        } else if status.processing() == Some(true) {
            ResourceState::Pending
        } else {
            ResourceState::Available
        };
        if let Some(config) = status.cluster_config() {
            r.sku = config.instance_type().map(|t| t.as_str().to_string());
            r.attributes
                .insert("instance_count".to_string(), config.instance_count().unwrap_or(1).to_string());
        }
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_streams(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut names = Vec::new();
    let mut pages = clients.kinesis.list_streams().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| classify("kinesis:ListStreams", e))?;
        names.extend(page.stream_names().iter().map(|n| n.to_string()));
    }

    let mut out = Vec::new();
    for name in names {
        let summary = clients
            .kinesis
            .describe_stream_summary()
            .stream_name(&name)
            .send()
            .await
            .map_err(|e| classify("kinesis:DescribeStreamSummary", e))?;
        let Some(description) = summary.stream_description_summary() else { continue };
        let mut r = Resource::new(ResourceType::Stream, &name, region);
        r.name = Some(name.clone());
        r.state = match description.stream_status().as_str() {
            "ACTIVE" => ResourceState::Available,
            "CREATING" | "UPDATING" => ResourceState::Pending,
            "DELETING" => continue,
            _ => ResourceState::Unknown,
        };
        r.created_at = from_smithy_time(description.stream_creation_timestamp());
        r.attributes
            .insert("open_shard_count".to_string(), description.open_shard_count().to_string());
        r.attributes.insert(
            "retention_hours".to_string(),
            description.retention_period_hours().to_string(),
        );
        r.attributes.insert(
            "consumer_count".to_string(),
            description.consumer_count().unwrap_or(0).to_string(),
        );
        r.attributes.insert("arn".to_string(), description.stream_arn().to_string());
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_file_systems(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.fsx.describe_file_systems().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let fs = item.map_err(|e| classify("fsx:DescribeFileSystems", e))?;
        let Some(id) = fs.file_system_id() else { continue };
        let mut r = Resource::new(ResourceType::FileSystem, id, region);
        r.state = match fs.lifecycle().map(|l| l.as_str()) {
            Some("AVAILABLE") => ResourceState::Available,
            Some("CREATING" | "UPDATING") => ResourceState::Pending,
            Some("FAILED" | "MISCONFIGURED") => ResourceState::Error,
            Some("DELETING") => continue,
            _ => ResourceState::Unknown,
        };
        r.created_at = fs.creation_time().and_then(from_smithy_time);
        r.size_gb = fs.storage_capacity().map(f64::from);
        r.tags = fs
            .tags()
            .iter()
            .filter_map(|t| match (t.key(), t.value()) {
                (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                _ => None,
            })
            .collect();
        r.name = super::name_from_tags(&r.tags);
        if let Some(kind) = fs.file_system_type() {
            r.attributes.insert("file_system_type".to_string(), kind.as_str().to_string());
            r.sku = Some(kind.as_str().to_string());
        }
        if let Some(storage) = fs.storage_type() {
            r.attributes.insert("storage_type".to_string(), storage.as_str().to_string());
        }
        let (throughput, deployment) = if let Some(config) = fs.windows_configuration() {
            (config.throughput_capacity(), config.deployment_type().map(|d| d.as_str()))
        } else if let Some(config) = fs.ontap_configuration() {
            (config.throughput_capacity(), config.deployment_type().map(|d| d.as_str()))
        } else {
            (None, None)
        };
        r.provisioned_throughput_mbps = throughput.map(f64::from);
        if let Some(deployment) = deployment {
            r.attributes.insert("deployment_type".to_string(), deployment.to_string());
        }
        out.push(r);
    }
    Ok(out)
}

/// Open shards of a stream, for hot-partition sampling.
pub(crate) async fn shards_for_stream(
    clients: &RegionClients,
    stream_name: &str,
) -> Result<Vec<Related>, ProviderError> {
    let resp = clients
        .kinesis
        .list_shards()
        .stream_name(stream_name)
        .send()
        .await
        .map_err(|e| classify("kinesis:ListShards", e))?;
    Ok(resp
        .shards()
        .iter()
        .map(|shard| Related { id: shard.shard_id().to_string(), ..Default::default() })
        .collect())
}
