//! Static list-price tables.
//!
//! Rough-order monthly estimation only: figures are list prices for a
//! representative region, reviewed against the published price pages on the
//! catalog date. Never consulted live. Tests assert against these constants
//! rather than re-embedding numbers.

/// Date the table was last reviewed against published list prices.
pub const CATALOG_VERSION: &str = "2025-07-01";

/// Billing hours per month used for hourly-to-monthly extrapolation.
pub const HOURS_PER_MONTH: f64 = 720.0;

// ---------------------------------------------------------------------------
// Block storage
// ---------------------------------------------------------------------------

/// $/GB-month for a volume SKU.
pub fn volume_gb_month(sku: &str) -> f64 {
    match sku {
        "gp2" => 0.10,
        "gp3" => 0.08,
        "io1" | "io2" => 0.125,
        "st1" => 0.045,
        "sc1" => 0.015,
        "standard" => 0.05,
        _ => 0.10,
    }
}

/// IOPS included free with the SKU; provisioned IOPS above this are billed.
pub fn volume_free_iops(sku: &str) -> f64 {
    match sku {
        "gp3" => 3000.0,
        _ => 0.0,
    }
}

/// $/provisioned-IOPS-month above the free allowance.
pub fn volume_iops_month(sku: &str) -> f64 {
    match sku {
        "gp3" => 0.005,
        "io1" | "io2" => 0.065,
        _ => 0.0,
    }
}

/// MB/s of throughput included free with the SKU.
pub fn volume_free_throughput_mbps(sku: &str) -> f64 {
    match sku {
        "gp3" => 125.0,
        _ => 0.0,
    }
}

/// $/MBps-month above the free throughput allowance.
pub fn volume_throughput_mbps_month(sku: &str) -> f64 {
    match sku {
        "gp3" => 0.04,
        _ => 0.0,
    }
}

/// $/GB-month for block-storage snapshots.
pub const SNAPSHOT_GB_MONTH: f64 = 0.05;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

pub const PUBLIC_IP_HOURLY: f64 = 0.005;
pub const NAT_GATEWAY_HOURLY: f64 = 0.045;
pub const VPN_CONNECTION_HOURLY: f64 = 0.05;
pub const TRANSIT_ATTACHMENT_HOURLY: f64 = 0.05;
pub const VPC_ENDPOINT_HOURLY: f64 = 0.01;

/// $/hour for a load balancer SKU.
pub fn load_balancer_hourly(sku: &str) -> f64 {
    match sku {
        "application" => 0.0225,
        "network" => 0.0225,
        "gateway" => 0.0125,
        "classic" => 0.025,
        _ => 0.0225,
    }
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

/// $/hour on-demand for common instance shapes; unknown shapes fall back to
/// a size-multiplier heuristic.
pub fn instance_hourly(shape: &str) -> f64 {
    match shape {
        "t2.micro" => 0.0116,
        "t2.small" => 0.023,
        "t2.medium" => 0.0464,
        "t2.large" => 0.0928,
        "t3.micro" => 0.0104,
        "t3.small" => 0.0208,
        "t3.medium" => 0.0416,
        "t3.large" => 0.0832,
        "t3.xlarge" => 0.1664,
        "t4g.medium" => 0.0336,
        "m4.large" => 0.10,
        "m4.xlarge" => 0.20,
        "m5.large" => 0.096,
        "m5.xlarge" => 0.192,
        "m5.2xlarge" => 0.384,
        "m5.4xlarge" => 0.768,
        "m6i.large" => 0.096,
        "m6i.xlarge" => 0.192,
        "c4.large" => 0.10,
        "c4.xlarge" => 0.199,
        "c5.large" => 0.085,
        "c5.xlarge" => 0.17,
        "c5.2xlarge" => 0.34,
        "r4.large" => 0.133,
        "r4.xlarge" => 0.266,
        "r5.large" => 0.126,
        "r5.xlarge" => 0.252,
        "r5.2xlarge" => 0.504,
        _ => fallback_hourly(shape, 0.10),
    }
}

/// $/hour for common database instance classes.
pub fn database_hourly(class: &str) -> f64 {
    match class {
        "db.t3.micro" => 0.017,
        "db.t3.small" => 0.034,
        "db.t3.medium" => 0.068,
        "db.t3.large" => 0.136,
        "db.m5.large" => 0.171,
        "db.m5.xlarge" => 0.342,
        "db.m5.2xlarge" => 0.684,
        "db.r5.large" => 0.24,
        "db.r5.xlarge" => 0.48,
        _ => fallback_hourly(class.trim_start_matches("db."), 0.171),
    }
}

/// $/GB-month for database attached storage.
pub const DATABASE_STORAGE_GB_MONTH: f64 = 0.115;

/// $/hour for cache node types.
pub fn cache_node_hourly(node_type: &str) -> f64 {
    match node_type {
        "cache.t3.micro" => 0.017,
        "cache.t3.small" => 0.034,
        "cache.t3.medium" => 0.068,
        "cache.m5.large" => 0.156,
        "cache.m5.xlarge" => 0.311,
        "cache.r5.large" => 0.216,
        "cache.r5.xlarge" => 0.431,
        _ => fallback_hourly(node_type.trim_start_matches("cache."), 0.156),
    }
}

/// $/hour for warehouse node types.
pub fn warehouse_node_hourly(node_type: &str) -> f64 {
    match node_type {
        "dc2.large" => 0.25,
        "dc2.8xlarge" => 4.80,
        "ra3.xlplus" => 1.086,
        "ra3.4xlarge" => 3.26,
        "ra3.16xlarge" => 13.04,
        _ => 0.25,
    }
}

/// $/hour for search-domain data node types.
pub fn search_node_hourly(instance_type: &str) -> f64 {
    match instance_type {
        "t3.small.search" => 0.036,
        "t3.medium.search" => 0.073,
        "m5.large.search" => 0.142,
        "m5.xlarge.search" => 0.283,
        "r5.large.search" => 0.186,
        _ => 0.142,
    }
}

// ---------------------------------------------------------------------------
// Streams, serverless, object storage, file systems
// ---------------------------------------------------------------------------

pub const STREAM_SHARD_HOURLY: f64 = 0.015;

pub const BUCKET_STORAGE_GB_MONTH: f64 = 0.023;

/// $/GB-second for function provisioned concurrency.
pub const FUNCTION_PROVISIONED_GB_SECOND: f64 = 0.000_004_166_7;

/// $/hour per provisioned read / write capacity unit.
pub const TABLE_READ_UNIT_HOURLY: f64 = 0.000_13;
pub const TABLE_WRITE_UNIT_HOURLY: f64 = 0.000_65;
pub const TABLE_STORAGE_GB_MONTH: f64 = 0.25;

/// $/GB-month for file-system storage by (type, storage class).
pub fn file_system_gb_month(fs_type: &str, storage_type: &str) -> f64 {
    match (fs_type, storage_type) {
        ("WINDOWS", "HDD") => 0.013,
        ("WINDOWS", _) => 0.13,
        ("LUSTRE", _) => 0.145,
        ("ONTAP", _) => 0.144,
        ("OPENZFS", _) => 0.09,
        _ => 0.13,
    }
}

/// $/MBps-month of provisioned file-system throughput.
pub const FILE_SYSTEM_THROUGHPUT_MBPS_MONTH: f64 = 2.20;

/// Multiplier for multi-AZ / zone-redundant shapes.
pub const MULTI_AZ_MULTIPLIER: f64 = 2.0;

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Size-multiplier heuristic for shapes missing from the tables:
/// `base` is the price of the family's `large` size.
fn fallback_hourly(shape: &str, base: f64) -> f64 {
    let size = shape.rsplit('.').next().unwrap_or("");
    let multiplier = match size {
        "nano" => 0.0625,
        "micro" => 0.125,
        "small" => 0.25,
        "medium" => 0.5,
        "large" => 1.0,
        "xlarge" => 2.0,
        "2xlarge" => 4.0,
        "4xlarge" => 8.0,
        "8xlarge" => 16.0,
        "12xlarge" => 24.0,
        "16xlarge" => 32.0,
        "24xlarge" => 48.0,
        "metal" => 24.0,
        _ => 1.0,
    };
    base * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gp3_volume_rate() {
        assert_eq!(volume_gb_month("gp3"), 0.08);
    }

    #[test]
    fn test_nat_gateway_monthly_from_hourly() {
        assert!((NAT_GATEWAY_HOURLY * HOURS_PER_MONTH - 32.40).abs() < 1e-9);
    }

    #[test]
    fn test_public_ip_monthly_from_hourly() {
        assert!((PUBLIC_IP_HOURLY * HOURS_PER_MONTH - 3.60).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_scales_with_size() {
        let large = instance_hourly("z9.large");
        let xl = instance_hourly("z9.xlarge");
        assert!((xl - large * 2.0).abs() < 1e-9);
    }
}
