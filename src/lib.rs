//! Cloudsweep Library
//!
//! Detection engine for wasteful and orphaned cloud resources: a catalog of
//! per-resource-type waste scenarios, the concurrent orchestration that runs
//! them across regions, shared pricing/telemetry helpers, the rule registry
//! that parameterizes them, and the deduplication pass over the findings.

#![recursion_limit = "256"]

pub mod config;
pub mod engine;
pub mod models;
pub mod pricing;
pub mod providers;
pub mod rules;
pub mod scenarios;
pub mod telemetry;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use engine::{ScanConfig, ScanError, Scanner};
pub use models::{
    Confidence, CostKind, Finding, Resource, ResourceState, ResourceType, ScanReport,
};
pub use pricing::PricingCatalog;
pub use providers::{AdapterConfig, AwsProvider, CloudProvider, ProviderError};
pub use rules::{RuleOverrides, RuleRegistry, RuleSet};
