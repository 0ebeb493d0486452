//! Object-store bucket scenarios. Buckets are account-scoped and ride along
//! with the first region scanned, under the `global` sentinel region.

use super::support::fmt_gb;
use super::{Scenario, ScenarioContext};
use crate::models::{CostKind, Finding, Resource, ResourceType};
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn scenarios() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(Empty),
        Arc::new(AllObjectsOld),
        Arc::new(IncompleteMultipartUploads),
        Arc::new(NoLifecyclePolicy),
    ]
}

fn storage_cost(ctx: &ScenarioContext<'_>, bucket: &Resource) -> f64 {
    ctx.pricing.bucket_storage_monthly_cost(bucket.size_gb.unwrap_or(0.0))
}

struct Empty;

#[async_trait]
impl Scenario for Empty {
    fn orphan_type(&self) -> &'static str {
        "bucket_empty"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_empty")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_age = ctx.rules.i64_or("min_age_days", 90);
        let mut findings = Vec::new();
        for bucket in ctx.resources {
            if bucket.attr_u64("object_count").unwrap_or(1) != 0 {
                continue;
            }
            if bucket.attr_bool("sample_truncated").unwrap_or(false) {
                continue;
            }
            let age = ctx.age_days(bucket);
            if age < min_age {
                continue;
            }
            let reason = format!(
                "bucket has held zero objects for its {age}-day lifetime; it costs nothing but clutters the account and invites accidental use"
            );
            findings.push(Finding::new(
                bucket,
                self.orphan_type(),
                0.0,
                CostKind::Absolute,
                ctx.confidence_for_age(age),
                age,
                reason,
            ));
        }
        Ok(findings)
    }
}

struct AllObjectsOld;

#[async_trait]
impl Scenario for AllObjectsOld {
    fn orphan_type(&self) -> &'static str {
        "all_objects_old"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_all_objects_old")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.i64_or("object_age_threshold_days", 365);
        let mut findings = Vec::new();
        for bucket in ctx.resources {
            let Some(newest) = bucket.attr_u64("newest_object_age_days") else { continue };
            if (newest as i64) < threshold {
                continue;
            }
            let age = ctx.age_days(bucket);
            let cost = storage_cost(ctx, bucket);
            let reason = format!(
                "every sampled object in this bucket is at least {newest} days old ({} of standard-class storage, ${cost:.2}/month) — nothing has been written in over a year",
                fmt_gb(bucket.size_gb.unwrap_or(0.0))
            );
            findings.push(
                Finding::new(
                    bucket,
                    self.orphan_type(),
                    cost,
                    CostKind::Absolute,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("newest_object_age_days", newest)
                .signal("size_gb", bucket.size_gb.unwrap_or(0.0)),
            );
        }
        Ok(findings)
    }
}

struct IncompleteMultipartUploads;

#[async_trait]
impl Scenario for IncompleteMultipartUploads {
    fn orphan_type(&self) -> &'static str {
        "incomplete_multipart_uploads"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_incomplete_multipart_uploads")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let min_upload_age = ctx.rules.i64_or("multipart_age_days", 30);
        let mut findings = Vec::new();
        for bucket in ctx.resources {
            let uploads = bucket.attr_u64("multipart_upload_count").unwrap_or(0);
            if uploads == 0 {
                continue;
            }
            let oldest = bucket.attr_u64("oldest_multipart_age_days").unwrap_or(0) as i64;
            if oldest < min_upload_age {
                continue;
            }
            let age = ctx.age_days(bucket);
            let reason = format!(
                "{uploads} incomplete multipart upload(s), the oldest abandoned {oldest} days ago; their invisible parts bill as storage until aborted"
            );
            findings.push(
                Finding::new(
                    bucket,
                    self.orphan_type(),
                    0.0,
                    CostKind::Absolute,
                    ctx.confidence_for_age(oldest),
                    age,
                    reason,
                )
                .signal("multipart_upload_count", uploads)
                .signal("oldest_multipart_age_days", oldest),
            );
        }
        Ok(findings)
    }
}

struct NoLifecyclePolicy;

#[async_trait]
impl Scenario for NoLifecyclePolicy {
    fn orphan_type(&self) -> &'static str {
        "no_lifecycle_policy"
    }
    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }
    fn flag(&self) -> Option<&'static str> {
        Some("detect_no_lifecycle_policy")
    }

    async fn detect(&self, ctx: &ScenarioContext<'_>) -> Result<Vec<Finding>, ProviderError> {
        let threshold = ctx.rules.i64_or("lifecycle_age_threshold_days", 180);
        let mut findings = Vec::new();
        for bucket in ctx.resources {
            if bucket.attr_bool("has_lifecycle_policy").unwrap_or(true) {
                continue;
            }
            let Some(oldest) = bucket.attr_u64("oldest_object_age_days") else { continue };
            if (oldest as i64) < threshold {
                continue;
            }
            let current = storage_cost(ctx, bucket);
            // Infrequent-access tiering runs at roughly 45% under standard.
            let savings = current * 0.45;
            let age = ctx.age_days(bucket);
            let reason = format!(
                "bucket has no lifecycle policy although its oldest objects are {oldest} days old; tiering {} past the access threshold would save about ${savings:.2} of ${current:.2}/month",
                fmt_gb(bucket.size_gb.unwrap_or(0.0))
            );
            findings.push(
                Finding::new(
                    bucket,
                    self.orphan_type(),
                    savings,
                    CostKind::Savings,
                    ctx.confidence_for_age(age),
                    age,
                    reason,
                )
                .signal("oldest_object_age_days", oldest)
                .signal("current_monthly_cost", current),
            );
        }
        Ok(findings)
    }
}
