//! Static pricing catalog and cost derivation helpers.
//!
//! Deterministic, rough-order monthly figures at list price; no live pricing
//! API. Optimization scenarios price the delta between the current and the
//! recommended configuration, not the resource's absolute cost.

pub mod tables;

pub use tables::{CATALOG_VERSION, HOURS_PER_MONTH, MULTI_AZ_MULTIPLIER};

/// Per-component split of a computed monthly cost, so a scenario can explain
/// which component dominates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub storage: f64,
    pub iops: f64,
    pub throughput: f64,
    pub compute: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.storage + self.iops + self.throughput + self.compute
    }
}

/// Stateless façade over the static tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingCatalog;

impl PricingCatalog {
    pub fn new() -> Self {
        Self
    }

    // -- Block storage -----------------------------------------------------

    /// Monthly cost of a volume: storage plus billable provisioned IOPS and
    /// throughput above the SKU's free allowance.
    pub fn volume_monthly_cost(
        &self,
        sku: &str,
        size_gb: f64,
        provisioned_iops: Option<f64>,
        provisioned_throughput_mbps: Option<f64>,
    ) -> f64 {
        self.volume_breakdown(sku, size_gb, provisioned_iops, provisioned_throughput_mbps)
            .total()
    }

    pub fn volume_breakdown(
        &self,
        sku: &str,
        size_gb: f64,
        provisioned_iops: Option<f64>,
        provisioned_throughput_mbps: Option<f64>,
    ) -> CostBreakdown {
        let storage = size_gb.max(0.0) * tables::volume_gb_month(sku);
        let iops = provisioned_iops
            .map(|p| (p - tables::volume_free_iops(sku)).max(0.0) * tables::volume_iops_month(sku))
            .unwrap_or(0.0);
        let throughput = provisioned_throughput_mbps
            .map(|p| {
                (p - tables::volume_free_throughput_mbps(sku)).max(0.0)
                    * tables::volume_throughput_mbps_month(sku)
            })
            .unwrap_or(0.0);
        CostBreakdown { storage, iops, throughput, compute: 0.0 }
    }

    pub fn snapshot_monthly_cost(&self, size_gb: f64) -> f64 {
        size_gb.max(0.0) * tables::SNAPSHOT_GB_MONTH
    }

    // -- Network -----------------------------------------------------------

    pub fn public_ip_monthly_cost(&self) -> f64 {
        tables::PUBLIC_IP_HOURLY * HOURS_PER_MONTH
    }

    pub fn nat_gateway_monthly_cost(&self) -> f64 {
        tables::NAT_GATEWAY_HOURLY * HOURS_PER_MONTH
    }

    pub fn vpn_connection_monthly_cost(&self) -> f64 {
        tables::VPN_CONNECTION_HOURLY * HOURS_PER_MONTH
    }

    pub fn transit_attachment_monthly_cost(&self) -> f64 {
        tables::TRANSIT_ATTACHMENT_HOURLY * HOURS_PER_MONTH
    }

    pub fn vpc_endpoint_monthly_cost(&self) -> f64 {
        tables::VPC_ENDPOINT_HOURLY * HOURS_PER_MONTH
    }

    pub fn load_balancer_monthly_cost(&self, sku: &str) -> f64 {
        tables::load_balancer_hourly(sku) * HOURS_PER_MONTH
    }

    // -- Compute -----------------------------------------------------------

    /// On-demand monthly cost of a running instance shape.
    pub fn instance_monthly_cost(&self, shape: &str) -> f64 {
        tables::instance_hourly(shape) * HOURS_PER_MONTH
    }

    // -- Databases and datastores -------------------------------------------

    /// Monthly cost of a database instance: compute at the class rate
    /// (doubled for multi-AZ) plus attached storage.
    pub fn database_monthly_cost(&self, class: &str, multi_az: bool, storage_gb: f64) -> f64 {
        let mut compute = tables::database_hourly(class) * HOURS_PER_MONTH;
        if multi_az {
            compute *= MULTI_AZ_MULTIPLIER;
        }
        compute + storage_gb.max(0.0) * tables::DATABASE_STORAGE_GB_MONTH
    }

    pub fn cache_cluster_monthly_cost(&self, node_type: &str, nodes: u32) -> f64 {
        tables::cache_node_hourly(node_type) * HOURS_PER_MONTH * f64::from(nodes.max(1))
    }

    pub fn warehouse_cluster_monthly_cost(&self, node_type: &str, nodes: u32) -> f64 {
        tables::warehouse_node_hourly(node_type) * HOURS_PER_MONTH * f64::from(nodes.max(1))
    }

    pub fn search_domain_monthly_cost(&self, instance_type: &str, count: u32) -> f64 {
        tables::search_node_hourly(instance_type) * HOURS_PER_MONTH * f64::from(count.max(1))
    }

    // -- Streams, serverless, object storage, file systems -------------------

    pub fn stream_monthly_cost(&self, shards: u32) -> f64 {
        tables::STREAM_SHARD_HOURLY * HOURS_PER_MONTH * f64::from(shards.max(1))
    }

    pub fn bucket_storage_monthly_cost(&self, size_gb: f64) -> f64 {
        size_gb.max(0.0) * tables::BUCKET_STORAGE_GB_MONTH
    }

    /// Monthly cost of keeping `concurrency` provisioned-concurrency
    /// instances of `memory_mb` warm around the clock.
    pub fn function_provisioned_concurrency_monthly_cost(
        &self,
        concurrency: u32,
        memory_mb: u32,
    ) -> f64 {
        let gb = f64::from(memory_mb.max(128)) / 1024.0;
        f64::from(concurrency) * gb * tables::FUNCTION_PROVISIONED_GB_SECOND * 3600.0
            * HOURS_PER_MONTH
    }

    /// Monthly cost of provisioned table capacity plus storage.
    pub fn serverless_table_monthly_cost(
        &self,
        read_units: u64,
        write_units: u64,
        storage_gb: f64,
    ) -> f64 {
        (read_units as f64 * tables::TABLE_READ_UNIT_HOURLY
            + write_units as f64 * tables::TABLE_WRITE_UNIT_HOURLY)
            * HOURS_PER_MONTH
            + storage_gb.max(0.0) * tables::TABLE_STORAGE_GB_MONTH
    }

    pub fn file_system_monthly_cost(
        &self,
        fs_type: &str,
        storage_type: &str,
        storage_gb: f64,
        throughput_mbps: Option<f64>,
        multi_az: bool,
    ) -> f64 {
        let mut cost = storage_gb.max(0.0) * tables::file_system_gb_month(fs_type, storage_type)
            + throughput_mbps.unwrap_or(0.0) * tables::FILE_SYSTEM_THROUGHPUT_MBPS_MONTH;
        if multi_az {
            cost *= MULTI_AZ_MULTIPLIER;
        }
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unattached_gp3_volume_cost() {
        let pricing = PricingCatalog::new();
        // 500 GB gp3 with baseline IOPS/throughput: storage only.
        let cost = pricing.volume_monthly_cost("gp3", 500.0, Some(3000.0), Some(125.0));
        assert!((cost - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_breakdown_reports_billable_iops() {
        let pricing = PricingCatalog::new();
        let b = pricing.volume_breakdown("gp3", 100.0, Some(4000.0), Some(125.0));
        assert!((b.storage - 8.0).abs() < 1e-9);
        assert!((b.iops - 5.0).abs() < 1e-9);
        assert_eq!(b.throughput, 0.0);
    }

    #[test]
    fn test_multi_az_database_doubles_compute_only() {
        let pricing = PricingCatalog::new();
        let single = pricing.database_monthly_cost("db.m5.large", false, 100.0);
        let multi = pricing.database_monthly_cost("db.m5.large", true, 100.0);
        let storage = 100.0 * tables::DATABASE_STORAGE_GB_MONTH;
        assert!(((multi - storage) - (single - storage) * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_provisioned_concurrency_cost_scales_with_memory() {
        let pricing = PricingCatalog::new();
        let one_gb = pricing.function_provisioned_concurrency_monthly_cost(1, 1024);
        let two_gb = pricing.function_provisioned_concurrency_monthly_cost(1, 2048);
        assert!((two_gb - one_gb * 2.0).abs() < 1e-6);
        // One warm GB costs roughly $10.80/month at list price.
        assert!((one_gb - 10.8).abs() < 0.1);
    }
}
