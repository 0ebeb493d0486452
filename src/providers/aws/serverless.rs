//! Serverless inventory: functions and serverless tables.

use super::{RegionClients, classify, from_smithy_time};
use crate::models::{Resource, ResourceState, ResourceType};
use crate::providers::ProviderError;
use chrono::DateTime;

/// Function listings carry the last-modified time as an ISO-8601 string
/// with a numeric offset ("2024-03-01T10:00:00.000+0000").
fn parse_lambda_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|t| t.with_timezone(&chrono::Utc))
}

pub(crate) async fn list_functions(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut out = Vec::new();
    let mut pages = clients.lambda.list_functions().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let function = item.map_err(|e| classify("lambda:ListFunctions", e))?;
        let Some(name) = function.function_name() else { continue };
        let mut r = Resource::new(ResourceType::Function, name, region);
        r.name = Some(name.to_string());
        r.state = ResourceState::Available;
        // No creation time in the listing; last-modified is the closest proxy.
        r.created_at = function.last_modified().and_then(parse_lambda_timestamp);
        if let Some(memory) = function.memory_size() {
            r.attributes.insert("memory_mb".to_string(), memory.to_string());
        }
        if let Some(runtime) = function.runtime() {
            r.attributes.insert("runtime".to_string(), runtime.as_str().to_string());
        }

        let provisioned = clients
            .lambda
            .list_provisioned_concurrency_configs()
            .function_name(name)
            .send()
            .await
            .map_err(|e| classify("lambda:ListProvisionedConcurrencyConfigs", e))?;
        let requested: i64 = provisioned
            .provisioned_concurrency_configs()
            .iter()
            .filter_map(|c| c.requested_provisioned_concurrent_executions())
            .map(i64::from)
            .sum();
        if requested > 0 {
            r.attributes
                .insert("provisioned_concurrency".to_string(), requested.to_string());
        }
        out.push(r);
    }
    Ok(out)
}

pub(crate) async fn list_tables(
    clients: &RegionClients,
    region: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let mut names = Vec::new();
    let mut pages = clients.dynamodb.list_tables().into_paginator().items().send();
    while let Some(item) = pages.next().await {
        let name = item.map_err(|e| classify("dynamodb:ListTables", e))?;
        names.push(name);
    }

    let mut out = Vec::new();
    for name in names {
        let described = clients
            .dynamodb
            .describe_table()
            .table_name(&name)
            .send()
            .await
            .map_err(|e| classify("dynamodb:DescribeTable", e))?;
        let Some(table) = described.table() else { continue };
        let mut r = Resource::new(ResourceType::ServerlessTable, &name, region);
        r.name = Some(name.clone());
        r.state = match table.table_status().map(|s| s.as_str()) {
            Some("ACTIVE") => ResourceState::Available,
            Some("CREATING" | "UPDATING") => ResourceState::Pending,
            Some("DELETING") => continue,
            _ => ResourceState::Unknown,
        };
        r.created_at = table.creation_date_time().and_then(from_smithy_time);
        r.size_gb = table
            .table_size_bytes()
            .map(|b| b as f64 / (1024.0 * 1024.0 * 1024.0));
        if let Some(items) = table.item_count() {
            r.attributes.insert("item_count".to_string(), items.to_string());
        }
        let billing_mode = table
            .billing_mode_summary()
            .and_then(|s| s.billing_mode())
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "PROVISIONED".to_string());
        r.attributes.insert("billing_mode".to_string(), billing_mode);
        if let Some(throughput) = table.provisioned_throughput() {
            r.attributes.insert(
                "read_capacity_units".to_string(),
                throughput.read_capacity_units().unwrap_or(0).to_string(),
            );
            r.attributes.insert(
                "write_capacity_units".to_string(),
                throughput.write_capacity_units().unwrap_or(0).to_string(),
            );
        }
        let gsi_names: Vec<&str> = table
            .global_secondary_indexes()
            .iter()
            .filter_map(|gsi| gsi.index_name())
            .collect();
        if !gsi_names.is_empty() {
            r.attributes.insert("index_names".to_string(), gsi_names.join(","));
        }
        out.push(r);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lambda_timestamp() {
        let parsed = parse_lambda_timestamp("2024-03-01T10:00:00.000+0000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }
}
