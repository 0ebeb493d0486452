//! Serverless function scenarios: paid-for concurrency nobody uses, and
//! functions that are never called or always fail.

use super::{Scenario, ScenarioContext};
use crate::models::{
    Confidence, CostKind, Finding, MetricQuery, MetricStat, Resource, ResourceType,
};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(UnusedProvisionedConcurrency),
        Arc::new(NeverInvoked),
        Arc::new(ZeroInvocations),
        Arc::new(AllInvocationsFailing),
    ]
}

async fn invocation_total(
    ctx: &ScenarioContext<'_>,
    function: &Resource,
    lookback_days: i64,
) -> Result<crate::models::TelemetrySample, ProviderError> {
    ctx.metric(
        MetricQuery::new("AWS/Lambda", "Invocations")
            .dimension("FunctionName", &function.id)
            .lookback_days(lookback_days)
            .stat(MetricStat::Sum),
    )
    .await
}

struct UnusedProvisionedConcurrency;

#[async_trait]
impl Scenario for UnusedProvisionedConcurrency {
    fn orphan_type(&self) -> &'static str {
        "unused_provisioned_concurrency"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Function
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_unused_provisioned_concurrency")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.f64_or("provisioned_utilization_threshold", 1.0);
        let lookback = ctx.rules.i64_or("provisioned_lookback_days", 30);
        let mut findings = Vec::new();
        for function in ctx.resources {
            let concurrency = function.attr_u64("provisioned_concurrency").unwrap_or(0) as u32;
            if concurrency == 0 {
                continue;
            }
            let utilization = ctx
                .metric(
                    MetricQuery::new("AWS/Lambda", "ProvisionedConcurrencyUtilization")
                        .dimension("FunctionName", &function.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Average),
                )
                .await?;
            // Provisioned concurrency bills whether or not it is exercised;
            // no utilization data means nothing ever warmed it up.
            let used_percent = utilization.mean().unwrap_or(0.0) * 100.0;
            if used_percent >= threshold {
                continue;
            }
            let memory = function.attr_u64("memory_mb").unwrap_or(128) as u32;
            let cost =
                ctx.pricing.function_provisioned_concurrency_monthly_cost(concurrency, memory);
            let age = ctx.age_days(function);
            let reason = format!(
                "{concurrency} provisioned-concurrency instance(s) at {memory} MB sat at {used_percent:.2}% utilization over {lookback} days — ${cost:.2}/month of warm capacity for nothing"
            );
            findings.push(
                Finding::new(
                    function,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("provisioned_concurrency", concurrency)
                .signal("utilization_percent", used_percent),
            );
        }
        Ok(findings)
    }
}

struct NeverInvoked;

#[async_trait]
impl Scenario for NeverInvoked {
    fn orphan_type(&self) -> &'static str {
        "never_invoked"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Function
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_never_invoked")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("never_invoked_min_age_days", 30);
        let mut findings = Vec::new();
        for function in ctx.resources {
            let age = ctx.age_days(function);
            if age < min_age {
                continue;
            }
            let lookback = age.clamp(min_age, 90);
            let invocations = invocation_total(ctx, function, lookback).await?;
            // Absence-as-absence: zero datapoints over the whole observable
            // window means the function has never run.
            if invocations.sum() > 0.0 {
                continue;
            }
            let reason = format!(
                "function deployed {age} days ago has recorded zero invocations over the last {lookback} days of monitoring — dead code in production"
            );
            findings.push(
                Finding::new(
                    function,
                    self.orphan_type(),
                    0.0,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("observed_days", lookback)
                .signal("invocations", 0),
            );
        }
        Ok(findings)
    }
}

struct ZeroInvocations;

#[async_trait]
impl Scenario for ZeroInvocations {
    fn orphan_type(&self) -> &'static str {
        "zero_invocations"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Function
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_zero_invocations")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let lookback = ctx.rules.i64_or("zero_invocations_lookback_days", 90);
        let mut findings = Vec::new();
        for function in ctx.resources {
            let invocations = invocation_total(ctx, function, lookback).await?;
            // This variant wants positive evidence of silence.
            if invocations.is_empty() || invocations.sum() > 0.0 {
                continue;
            }
            let age = ctx.age_days(function);
            let reason = format!(
                "function was not invoked once in the last {lookback} days; whatever used to call it has moved on"
            );
            findings.push(
                Finding::new(
                    function,
                    self.orphan_type(),
                    0.0,
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

struct AllInvocationsFailing;

#[async_trait]
impl Scenario for AllInvocationsFailing {
    fn orphan_type(&self) -> &'static str {
        "all_invocations_failing"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Function
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_all_invocations_failing")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let rate_threshold = ctx.rules.f64_or("failure_rate_threshold", 95.0);
        let min_invocations = ctx.rules.f64_or("min_invocations_for_failure_check", 10.0);
        let lookback = ctx.rules.i64_or("failure_lookback_days", 30);
        let mut findings = Vec::new();
        for function in ctx.resources {
            let invocations = invocation_total(ctx, function, lookback).await?;
            let total = invocations.sum();
            if total < min_invocations {
                continue;
            }
            let errors = ctx
                .metric(
                    MetricQuery::new("AWS/Lambda", "Errors")
                        .dimension("FunctionName", &function.id)
                        .lookback_days(lookback)
                        .stat(MetricStat::Sum),
                )
                .await?;
            let failed = errors.sum();
            let rate = failed / total * 100.0;
            if rate < rate_threshold {
                continue;
            }
            let age = ctx.age_days(function);
            let reason = format!(
                "{failed:.0} of {total:.0} invocations failed over {lookback} days ({rate:.1}% error rate) — the function burns compute and delivers nothing"
            );
            findings.push(
                Finding::new(
                    function,
                    self.orphan_type(),
                    0.0,
                    CostKind::Absolute,
                    // Total failure is conclusive on its own; age is no gate.
                    ctx.confidence_for_age(age).at_least(Confidence::High),
                    age,
                    reason,
                )
                .signal("error_rate_percent", rate)
                .signal("invocations", total)
                .signal("errors", failed),
            );
        }
        Ok(findings)
    }
}
