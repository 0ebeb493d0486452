//! Built-in default detection rules, one block per resource type.
//!
//! This table is part of the engine's external interface: every parameter a
//! caller can override appears here with its default. Ages and lookbacks are
//! days unless the key says otherwise; thresholds ending in `_percent` are
//! 0–100; `detect_*` keys switch individual scenarios without disabling the
//! resource type.

use crate::models::ResourceType;
use crate::rules::RuleMap;
use serde_json::json;
use std::collections::BTreeMap;

fn block(value: serde_json::Value) -> RuleMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!("default rule blocks are JSON objects"),
    }
}

pub(crate) fn default_table() -> BTreeMap<ResourceType, RuleMap> {
    let mut table = BTreeMap::new();

    table.insert(
        ResourceType::Volume,
        block(json!({
            "enabled": true,
            "min_age_days": 7,                          // ignore volumes created in the last week
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 7,
            // unattached / attached-idle
            "detect_unattached": true,
            "detect_attached_idle": true,
            "min_idle_days_attached": 30,
            "idle_lookback_days": 60,
            "max_ops_threshold": 0.1,                   // ops/sec below this = idle
            // attached to a stopped instance
            "detect_attached_stopped_instance": true,
            "min_stopped_days": 30,
            // previous-generation SKU migration
            "detect_sku_migration": true,
            "min_size_gb": 100,                         // small volumes = marginal savings
            // highest-durability SKU without a compliance marker
            "detect_unnecessary_max_durability": true,
            "compliance_tags": ["compliance", "hipaa", "pci-dss", "sox", "gdpr", "iso27001",
                                "critical", "production-critical", "high-availability"],
            // provisioned vs observed
            "detect_overprovisioned_iops": true,
            "iops_overprovisioning_factor": 2.0,
            "detect_overprovisioned_throughput": true,
            "baseline_throughput_mbps": 125,
            "high_throughput_workload_tags": ["database", "analytics", "bigdata", "ml", "etl",
                                              "data-warehouse"],
            "detect_low_iops_utilization": true,
            "max_iops_utilization_percent": 30,
            "safety_buffer_factor": 1.5,
            "min_observation_days": 30,
            "detect_low_throughput_utilization": true,
            "max_throughput_utilization_percent": 30,
            // cheaper-SKU downgrade
            "detect_type_downgrade": true,
            "min_savings_percent": 20,
            "safety_margin_iops": 1.5,
        })),
    );

    table.insert(
        ResourceType::PublicIp,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 90,
            "confidence_high_days": 7,                  // an idle address is waste quickly
            "confidence_medium_days": 3,
            "detect_unassociated": true,
            "detect_on_stopped_instance": true,
            "min_stopped_days": 30,
            "detect_multiple_per_instance": true,
            "max_ips_per_instance": 1,
            "allow_multiple_tags": ["multi-nic", "ha", "high-availability", "active-active",
                                    "failover", "floating-ip"],
            "detect_on_detached_interface": true,
            "detached_interface_min_days": 7,
            "detect_never_associated": true,
            "min_never_used_days": 7,
            "detect_on_unused_nat_gateway": true,
            "nat_gateway_min_idle_days": 30,
            "nat_gateway_traffic_threshold_gb": 0.1,
            // traffic bands: idle < 1 MB <= low traffic < 1 GB; above, neither fires
            "detect_idle_traffic": true,
            "idle_network_threshold_bytes": 1_000_000,
            "min_observation_days": 30,
            "detect_low_traffic": true,
            "low_traffic_threshold_gb": 1.0,
            "detect_nat_zero_connections": true,
            "nat_gateway_zero_connections_days": 30,
            "detect_on_failed_instance": true,
            "min_failed_days": 7,
        })),
    );

    table.insert(
        ResourceType::Snapshot,
        block(json!({
            "enabled": true,
            "min_age_days": 90,
            "confidence_critical_days": 730,
            "confidence_high_days": 180,
            "confidence_medium_days": 90,
            "detect_source_deleted": true,
            "detect_redundant": true,
            "max_snapshots_per_source": 7,              // keep only the newest N per source
            "detect_old_unused": true,
            "old_unused_age_days": 365,
            "compliance_tags": ["Backup", "Compliance", "Governance", "Retention", "Legal"],
            "detect_deleted_instance_reference": true,
            "detect_incomplete_failed": true,
            "max_pending_days": 7,
            "detect_untagged": true,
            "min_untagged_age_days": 30,
            "detect_excessive_retention_nonprod": true,
            "nonprod_max_days": 90,
            "nonprod_env_tags": ["Environment", "Env", "Stage"],
            "nonprod_env_values": ["dev", "development", "test", "testing", "stage", "staging",
                                   "qa"],
            "detect_duplicates": true,
            "duplicate_window_hours": 1,
            "detect_unused_image": true,
            "min_image_unused_days": 180,
        })),
    );

    table.insert(
        ResourceType::Instance,
        block(json!({
            "enabled": true,
            "min_age_days": 7,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 7,
            "detect_stopped": true,
            "min_stopped_days": 30,
            "detect_idle_running": true,
            "cpu_threshold_percent": 5.0,
            "network_threshold_bytes": 1_000_000,
            "min_idle_days": 7,
            "idle_lookback_days": 30,
            "detect_oversized": true,
            "oversized_cpu_threshold": 30.0,
            "oversized_lookback_days": 30,
            "oversized_min_size": "xlarge",             // only check xlarge and above
            "detect_old_generation": true,
            "old_generations": ["t2", "m4", "c4", "r4", "i3", "x1", "p2", "g3"],
            "generation_upgrades": {"t2": "t3", "m4": "m5", "c4": "c5", "r4": "r5",
                                    "i3": "i3en", "x1": "x2idn", "p2": "p3", "g3": "g4dn"},
            "detect_burstable_credit_waste": true,
            "burstable_credit_threshold": 0.9,          // balance above 90% of max = unused
            "burstable_lookback_days": 30,
            "detect_dev_test_24_7": true,
            "nonprod_env_tags": ["Environment", "Env", "Stage"],
            "nonprod_env_values": ["dev", "development", "test", "testing", "stage", "staging",
                                   "qa", "sandbox"],
            "nonprod_min_age_days": 7,
            "detect_untagged": true,
            "untagged_min_age_days": 30,
            "detect_right_sizing": true,
            "right_sizing_cpu_threshold": 40.0,
            "right_sizing_max_cpu_threshold": 75.0,     // peak must stay below this to downsize
            "right_sizing_lookback_days": 30,
            "detect_spot_eligible": true,
            "spot_cpu_variance_threshold": 20.0,
            "spot_min_uptime_days": 7,
            "spot_excluded_types": ["database", "cache", "queue"],
            "detect_scheduled_unused": true,
            "business_hours_start": 9,
            "business_hours_end": 18,
            "business_days": [0, 1, 2, 3, 4],           // Monday-Friday
            "scheduled_cpu_threshold": 10.0,
            "scheduled_lookback_days": 14,
        })),
    );

    table.insert(
        ResourceType::NatGateway,
        block(json!({
            "enabled": true,
            "min_age_days": 7,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 7,
            "detect_no_routes": true,
            "detect_zero_traffic": true,
            "max_bytes_30d": 1_000_000,
            "traffic_lookback_days": 30,
            "detect_routes_without_subnet": true,
            "detect_no_internet_gateway": true,
            "detect_public_subnet": true,
            "detect_redundant_same_az": true,
            "detect_low_traffic": true,
            "low_traffic_threshold_gb": 10.0,
            "detect_vpc_endpoint_candidate": true,
            "vpc_endpoint_traffic_threshold_gb": 50.0,
            "detect_dev_test_business_hours": true,
            "business_hours_start": 8,
            "business_hours_end": 18,
            "business_days": [0, 1, 2, 3, 4],
            "business_hours_traffic_threshold": 90.0,
            "dev_test_pattern_lookback_days": 7,
            "nonprod_env_tags": ["Environment", "Env", "Stage"],
            "nonprod_env_values": ["dev", "development", "test", "testing", "staging", "qa"],
            "detect_obsolete_after_migration": true,
            "traffic_drop_threshold_percent": 90.0,
            "migration_baseline_days": 90,              // compare day -90..-60 vs day -7..0
            "migration_min_age_days": 90,
        })),
    );

    table.insert(
        ResourceType::LoadBalancer,
        block(json!({
            "enabled": true,
            "min_age_days": 7,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 7,
            "detect_no_targets": true,
            "detect_all_targets_unhealthy": true,
            "unhealthy_min_days": 14,
            "detect_no_listeners": true,
            "detect_zero_requests": true,
            "min_requests_30d": 100,
            "requests_lookback_days": 30,
            "detect_legacy_sku": true,
            "detect_cross_zone_disabled": true,
            "detect_idle_business_hours": true,
            "business_hours_start": 9,
            "business_hours_end": 18,
            "business_days": [0, 1, 2, 3, 4],
            "business_hours_traffic_threshold": 90.0,
            "idle_pattern_lookback_days": 14,
            "detect_never_used": true,
            "never_used_min_age_days": 30,
        })),
    );

    table.insert(
        ResourceType::Database,
        block(json!({
            "enabled": true,
            "min_age_days": 7,
            "confidence_critical_days": 30,
            "confidence_high_days": 14,
            "confidence_medium_days": 7,
            "detect_stopped_long_term": true,
            "min_stopped_days": 7,                      // auto-restart makes stopped waste fast
            "detect_idle_connections": true,
            "min_idle_days": 7,
            "connections_lookback_days": 7,
            "detect_zero_io": true,
            "min_zero_io_days": 7,
            "detect_never_connected": true,
            "never_connected_min_age_days": 7,
            "detect_no_backups": true,
            "no_backups_min_age_days": 30,
            "detect_outdated_engine": true,
            "eol_engine_versions": ["mysql 5.6", "mysql 5.7", "postgres 10", "postgres 11",
                                    "aurora-mysql 5.7", "mariadb 10.3"],
        })),
    );

    table.insert(
        ResourceType::GraphDatabase,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_idle_connections": true,
            "connections_lookback_days": 7,
        })),
    );

    table.insert(
        ResourceType::DocumentDatabase,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_idle_connections": true,
            "connections_lookback_days": 7,
        })),
    );

    table.insert(
        ResourceType::CacheCluster,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_zero_cache_hits": true,
            "zero_hits_lookback_days": 7,
            "detect_low_hit_rate": true,
            "hit_rate_threshold": 50.0,                 // below = inefficient cache
            "critical_hit_rate": 10.0,                  // below = useless cache
            "hit_rate_lookback_days": 7,
            "detect_no_connections": true,
            "no_connections_lookback_days": 7,
            "detect_overprovisioned_memory": true,
            "memory_usage_threshold": 20.0,
            "memory_lookback_days": 7,
        })),
    );

    table.insert(
        ResourceType::WarehouseCluster,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_no_connections": true,
            "no_connections_lookback_days": 7,
            "detect_low_utilization": true,
            "cpu_threshold_percent": 5.0,
            "utilization_lookback_days": 7,
        })),
    );

    table.insert(
        ResourceType::SearchDomain,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_no_search_requests": true,
            "search_lookback_days": 7,
            "detect_low_utilization": true,
            "cpu_threshold_percent": 10.0,
            "utilization_lookback_days": 7,
        })),
    );

    table.insert(
        ResourceType::Stream,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_inactive": true,
            "inactive_lookback_days": 7,
            "detect_written_not_read": true,
            "written_not_read_lookback_days": 7,
            "detect_underutilized": true,
            "utilization_threshold_percent": 1.0,
            "underutilized_lookback_days": 7,
            "detect_excessive_retention": true,
            "retention_hours_threshold": 48,
            "max_iterator_age_ms": 60_000,              // readers this fresh don't need long retention
            "detect_overprovisioned_shards": true,
            "overprovisioning_ratio": 10.0,
            "detect_hot_partition": true,
            "hot_partition_share_percent": 70.0,
            "idle_shard_bytes_threshold": 1_000_000,
            "max_shards_sampled": 20,
        })),
    );

    table.insert(
        ResourceType::Bucket,
        block(json!({
            "enabled": true,
            "min_age_days": 90,
            "confidence_critical_days": 365,
            "confidence_high_days": 180,
            "confidence_medium_days": 90,
            "detect_empty": true,
            "detect_all_objects_old": true,
            "object_age_threshold_days": 365,
            "detect_incomplete_multipart_uploads": true,
            "multipart_age_days": 30,
            "detect_no_lifecycle_policy": true,
            "lifecycle_age_threshold_days": 180,
        })),
    );

    table.insert(
        ResourceType::Function,
        block(json!({
            "enabled": true,
            "min_age_days": 30,
            "confidence_critical_days": 180,
            "confidence_high_days": 60,
            "confidence_medium_days": 30,
            "detect_unused_provisioned_concurrency": true,
            "provisioned_utilization_threshold": 1.0,   // percent
            "provisioned_lookback_days": 30,
            "detect_never_invoked": true,
            "never_invoked_min_age_days": 30,
            "detect_zero_invocations": true,
            "zero_invocations_lookback_days": 90,
            "detect_all_invocations_failing": true,
            "failure_rate_threshold": 95.0,
            "min_invocations_for_failure_check": 10,
            "failure_lookback_days": 30,
        })),
    );

    table.insert(
        ResourceType::ServerlessTable,
        block(json!({
            "enabled": true,
            "min_age_days": 7,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 7,
            "detect_overprovisioned_capacity": true,
            "provisioned_utilization_threshold": 10.0,
            "provisioned_lookback_days": 7,
            "detect_unused_secondary_index": true,
            "index_lookback_days": 14,
            "detect_never_used_provisioned": true,
            "never_used_min_age_days": 30,
            "detect_never_used_on_demand": true,
            "on_demand_lookback_days": 60,
            "detect_empty_table": true,
            "empty_table_min_age_days": 90,
        })),
    );

    table.insert(
        ResourceType::FileSystem,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 3,
            "detect_inactive": true,
            "inactive_lookback_days": 30,
            "detect_overprovisioned_storage": true,
            "storage_usage_threshold_percent": 10.0,
            "storage_lookback_days": 7,
            "detect_overprovisioned_throughput": true,
            "throughput_utilization_threshold_percent": 10.0,
            "throughput_lookback_days": 7,
            "detect_multi_az_nonprod": true,
            "nonprod_env_tags": ["Environment", "Env", "Stage"],
            "nonprod_env_values": ["dev", "test", "development", "testing"],
        })),
    );

    table.insert(
        ResourceType::VpnConnection,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 3,
            "detect_no_traffic": true,
            "traffic_lookback_days": 30,
        })),
    );

    table.insert(
        ResourceType::TransitAttachment,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 90,
            "confidence_high_days": 30,
            "confidence_medium_days": 3,
            "detect_no_traffic": true,
            "traffic_lookback_days": 30,
        })),
    );

    table.insert(
        ResourceType::VpcEndpoint,
        block(json!({
            "enabled": true,
            "min_age_days": 3,
            "confidence_critical_days": 30,
            "confidence_high_days": 7,
            "confidence_medium_days": 3,
            "detect_no_network_interfaces": true,
        })),
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_resource_type_has_defaults() {
        let table = default_table();
        for rt in ResourceType::ALL {
            let block = table.get(&rt).unwrap_or_else(|| panic!("no defaults for {rt}"));
            assert_eq!(block.get("enabled"), Some(&serde_json::Value::Bool(true)));
            assert!(block.contains_key("confidence_critical_days"), "{rt} lacks ladder");
        }
    }
}
