//! Scan engine: public entry point, orchestration, deduplication, and the
//! confidence calculator.

pub mod confidence;
pub mod dedup;
pub(crate) mod orchestrator;

use crate::models::{RegionError, ScanReport};
use crate::pricing::PricingCatalog;
use crate::providers::{CloudProvider, ProviderError};
use crate::rules::{RuleOverrides, RuleRegistry};
use crate::scenarios::{Scenario, catalog};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Concurrency and deadline knobs for one scanner instance.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Region-scan units running in parallel.
    pub max_concurrent_regions: usize,
    /// Adapter calls in flight within one region-scan.
    pub max_concurrent_api_calls: usize,
    /// Deadline per region-scan.
    pub region_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_regions: 8,
            max_concurrent_api_calls: 16,
            region_timeout: Duration::from_secs(300),
        }
    }
}

/// Failures that abort a scan outright. Everything else degrades into
/// per-region errors or skipped scenarios on the report.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("credential validation failed: {0}")]
    Credentials(#[source] ProviderError),
    #[error("region discovery failed: {0}")]
    RegionDiscovery(#[source] ProviderError),
}

/// The public scan API: validate credentials, resolve regions, fan out
/// region-scans under a bounded pool, aggregate, deduplicate.
pub struct Scanner {
    provider: Arc<dyn CloudProvider>,
    registry: RuleRegistry,
    pricing: PricingCatalog,
    config: ScanConfig,
    scenarios: Arc<Vec<Arc<dyn Scenario>>>,
}

impl Scanner {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        registry: RuleRegistry,
        pricing: PricingCatalog,
        config: ScanConfig,
    ) -> Self {
        Self { provider, registry, pricing, config, scenarios: Arc::new(catalog()) }
    }

    /// Scan the account. An empty `regions` slice means "every region the
    /// account can address". Partial results are always returned; only a
    /// credential failure returns an error.
    pub async fn scan(
        &self,
        regions: &[String],
        overrides: &RuleOverrides,
    ) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let clock = std::time::Instant::now();

        let account = self
            .provider
            .validate_credentials()
            .await
            .map_err(ScanError::Credentials)?;
        tracing::info!(account_id = %account.account_id, "credentials validated");

        let regions: Vec<String> = if regions.is_empty() {
            self.provider
                .list_regions()
                .await
                .map_err(ScanError::RegionDiscovery)?
        } else {
            regions.to_vec()
        };
        tracing::info!(regions = regions.len(), "dispatching region scans");

        let rules = Arc::new(self.registry.resolve(overrides));
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_regions.max(1)));
        let mut join_set = JoinSet::new();
        for (index, region) in regions.iter().enumerate() {
            let provider = self.provider.clone();
            let region = region.clone();
            let rules = rules.clone();
            let pricing = self.pricing;
            let scenarios = self.scenarios.clone();
            let permits = permits.clone();
            let region_timeout = self.config.region_timeout;
            let max_api_calls = self.config.max_concurrent_api_calls;
            // Account-scoped resource types ride along with the first region.
            let scan_global = index == 0;
            join_set.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                orchestrator::scan_region(
                    provider,
                    region,
                    scan_global,
                    rules,
                    pricing,
                    scenarios,
                    region_timeout,
                    max_api_calls,
                    Utc::now(),
                )
                .await
            });
        }

        let mut findings = Vec::new();
        let mut region_errors = Vec::new();
        let mut skipped = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    let partial = !outcome.findings.is_empty();
                    for error in outcome.errors {
                        region_errors.push(RegionError {
                            region: outcome.region.clone(),
                            error,
                            partial,
                        });
                    }
                    skipped.extend(outcome.skipped);
                    findings.extend(outcome.findings);
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "region scan task failed");
                    region_errors.push(RegionError {
                        region: "unknown".to_string(),
                        error: join_error.to_string(),
                        partial: false,
                    });
                }
            }
        }

        let findings = dedup::deduplicate(findings);
        let report = ScanReport {
            scan_id: uuid::Uuid::new_v4().to_string(),
            account,
            started_at,
            duration_secs: clock.elapsed().as_secs_f64(),
            scanned_regions: regions,
            findings,
            region_errors,
            skipped_scenarios: skipped,
        };
        tracing::info!(
            findings = report.findings.len(),
            monthly_waste = format!("{:.2}", report.total_monthly_waste()),
            duration_secs = format!("{:.1}", report.duration_secs),
            "scan complete"
        );
        Ok(report)
    }
}
